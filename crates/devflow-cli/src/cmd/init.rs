use anyhow::Context;
use devflow_core::config::Config;
use devflow_core::{io, paths};
use std::path::Path;

const SETUP_SEQUENCE: &str = "\
# Create and activate the project environment, then install dependencies.
policy: stop-on-first-failure
steps:
  - create-venv
  - activate
  - install
";

pub fn run(root: &Path, force: bool) -> anyhow::Result<()> {
    println!("Initializing devflow in: {}", root.display());

    for dir in [paths::devflow_dir(root), paths::sequences_dir(root)] {
        io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let config_path = paths::config_path(root);
    if force || !config_path.exists() {
        Config::default()
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    let setup = paths::sequences_dir(root).join("setup.yaml");
    if io::write_if_missing(&setup, SETUP_SEQUENCE.as_bytes())? {
        println!("  created: {}/setup.yaml", paths::SEQUENCES_DIR);
    } else {
        println!("  exists:  {}/setup.yaml", paths::SEQUENCES_DIR);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use devflow_core::sequence_file::SequenceFile;

    #[test]
    fn setup_sequence_parses() {
        let file = SequenceFile::parse_yaml(super::SETUP_SEQUENCE).unwrap();
        assert_eq!(file.steps.len(), 3);
        assert!(file.policy.is_some());
    }
}
