pub mod config;
pub mod init;
pub mod start;
pub mod status;
