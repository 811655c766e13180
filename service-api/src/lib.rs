pub mod intercept;
pub mod node;
pub mod payment;
pub mod service;
