pub mod document;
pub mod query;

pub use document::{handle_documents, handle_ingest};
pub use query::handle_query;
