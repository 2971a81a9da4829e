//! Command implementations

pub mod init;
pub mod install;
pub mod list;
pub mod self_update;
pub mod status;
pub mod uninstall;
pub mod update;
pub mod version;
