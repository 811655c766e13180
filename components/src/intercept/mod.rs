pub mod error;
pub mod listener;
pub mod registry;
pub mod subscription;
