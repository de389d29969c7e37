pub mod names;
pub mod timeout;
