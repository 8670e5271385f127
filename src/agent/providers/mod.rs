//! Concrete backends for [`LlmProvider`](crate::agent::provider::LlmProvider)
//! and [`SearchTool`](crate::agent::tool::SearchTool).

pub mod openai;
pub mod vector_store;

pub use openai::OpenAiProvider;
pub use vector_store::VectorStoreSearch;
