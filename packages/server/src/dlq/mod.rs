mod service;

pub use service::{DlqService, DlqStats, ResolveResult, dlq_service};
