
mod admin;
mod comment;
mod dlq;
mod ingest;
mod recipe;
