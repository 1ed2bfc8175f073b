pub mod chunk_store;
pub mod database;

pub use chunk_store::ChunkStore;
pub use database::Database;
pub use database::DatabaseError;
