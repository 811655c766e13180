pub mod error;
pub mod forwarder;
