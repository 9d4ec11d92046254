pub mod core;
pub mod gateway;
pub mod metadata;
pub mod reconciler;
#[cfg(test)]
pub(crate) mod testing;

pub use self::core::IngestionController;
pub use gateway::{HttpGateway, VectorStoreGateway};
pub use metadata::{extract_immatriculation, is_valid_immatriculation, KNOWN_CLIENTS};
pub use reconciler::FileListCache;
