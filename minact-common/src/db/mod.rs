//! Database access layer

pub mod init;
pub mod models;

pub use init::{ensure_setting, init_database, init_memory_database, UNASSIGNED_USER_GUID};
