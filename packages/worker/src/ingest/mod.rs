//! Spoonacular recipe ingestion.

pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod scheduler;
pub mod source;
pub mod store;
#[cfg(test)]
pub(crate) mod testing;

pub use error::IngestError;
pub use pipeline::{IngestOutcome, IngestPipeline};
pub use scheduler::{JobScheduler, MqScheduler};
pub use source::{RecipeSource, SourceError, SpoonacularClient};
pub use store::{RecipeStore, SeaOrmRecipeStore, StoreError, UpsertOutcome};
