pub mod actions;
pub mod config;
pub mod doctor;
pub mod init;
pub mod run;
pub mod sequence;
pub mod state;
