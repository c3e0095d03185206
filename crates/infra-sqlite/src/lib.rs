// Studio Infrastructure - SQLite Adapter
// Implements: GallerySink, UsageRecorder

mod connection;
mod error;
mod gallery_repository;
mod migration;
mod usage_repository;

pub use connection::create_pool;
pub use gallery_repository::SqliteGallery;
pub use migration::run_migrations;
pub use usage_repository::SqliteUsageRecorder;
