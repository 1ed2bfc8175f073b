pub mod api;
pub mod commands;
pub mod config;
pub mod database;
pub mod document;
pub mod llm;
pub mod providers;

// Re-export commonly used items
pub use config::AppConfig;
pub use document::DocumentIngestor;
pub use llm::{QueryProcessor, QueryResult};
