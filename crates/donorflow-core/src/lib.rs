pub mod audit;
pub mod config;
pub mod constraints;
pub mod db;
pub mod edits;
pub mod error;
pub mod ingestion;
pub mod store;
pub mod types;
pub mod upload;
pub mod upsert;
pub mod validation;
