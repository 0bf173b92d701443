pub mod config;
pub mod device;
pub mod error;
pub mod status;
