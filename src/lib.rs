pub mod config;
pub mod credentials;
pub mod duration;
pub mod store;
