pub mod app_config;
pub mod database;
pub mod memory;
pub mod notify;
pub mod pg;

pub use database::DbClient;
pub use memory::MemoryStore;
pub use notify::LogNotifier;
