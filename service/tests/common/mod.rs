pub mod gateway;
pub mod invoice;
