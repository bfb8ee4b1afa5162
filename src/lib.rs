pub mod config;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod output;
pub mod parser;
pub mod report;
pub mod stats;
pub mod table;
pub mod zones;
