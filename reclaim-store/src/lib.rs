pub mod app_config;
pub mod database;
pub mod user_repo;
pub mod pickup_repo;
pub mod cluster_repo;
pub mod invoice_repo;
pub mod order_repo;
pub mod memory;
pub mod redis_repo;

pub use database::DbClient;
pub use memory::MemoryStore;
pub use redis_repo::RedisClient;
