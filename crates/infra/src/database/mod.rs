//! Database implementations

pub mod manager;
pub mod sync_record_repository;

pub use manager::{DbManager, SqliteConnection, SqlitePool};
pub use sync_record_repository::SqliteSyncRecordRepository;
