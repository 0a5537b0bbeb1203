mod ingest_dlq;

pub use ingest_dlq::consume_ingest_dlq;
