pub mod aggregator;
pub mod cache;
pub mod clients;
pub mod config;
pub mod error;
pub mod http;
pub mod prompts;
pub mod routing;
pub mod server;
