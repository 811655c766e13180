pub mod backoff;
pub mod config;
pub mod node;
pub mod registry;
pub mod service;
