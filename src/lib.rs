pub mod api;
mod db;
pub mod error;
pub mod ingestion;
mod logging;
pub mod settings;
pub mod tree_resolver;

pub use error::{KnowledgeError, Result};
