pub mod catalog;
pub mod postgres;
pub mod redis;
pub mod sessions;
pub mod store;
pub mod users;

pub use catalog::CatalogRepository;
pub use self::postgres::create_pool;
pub use self::redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
pub use sessions::{SessionRepository, SessionStore};
pub use store::{DocumentStore, MemoryStore, PgStore};
pub use users::UserRepository;
