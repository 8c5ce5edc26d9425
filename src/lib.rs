pub mod cache_keys;
pub mod chart;
pub mod cli;
pub mod configuration;
pub mod controller;
pub mod error;
pub mod handler;
pub mod helpers;
pub mod model;
pub mod provider;
pub mod queries;
pub mod query;
pub mod server;
pub mod types;
