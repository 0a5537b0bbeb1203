pub mod config;
pub mod handlers;
pub mod ingest;

pub use config::{WorkerAppConfig, WorkerConfig};
pub use handlers::ingest::{Disposition, handle_ingest_message};
pub use ingest::{IngestOutcome, IngestPipeline};
