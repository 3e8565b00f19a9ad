pub mod config;
pub mod digest;
pub mod feed;
pub mod filter;
pub mod importer;
pub mod llm;
pub mod notify;
pub mod pipeline;
