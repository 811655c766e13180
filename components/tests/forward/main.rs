#[path = "../common/mod.rs"]
pub mod common;

mod forwarder;
