pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod directory;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod models;
pub mod output;
pub mod poller;
pub mod presentation;
pub mod server;
pub mod services;
