pub mod admin;
pub mod auth;
pub mod comment;
pub mod dlq;
pub mod ingest;
pub mod rating;
pub mod recipe;
