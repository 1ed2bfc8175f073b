pub mod gemini;
pub mod openai;
pub mod traits;
pub mod utils;

pub use traits::{EmbeddingProvider, GenerativeModel, ProviderError};
pub use utils::{build_providers, ProviderKind, Providers};
