pub mod backoff;
pub mod forward;
pub mod intercept;
pub mod node;
