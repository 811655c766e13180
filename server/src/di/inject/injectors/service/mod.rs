pub mod gateway;
pub mod listener;
pub mod sweeper;
pub mod tls;
