pub mod config;
pub mod logging;

// Core modules
pub mod cache_path;
pub mod fetch;
pub mod icon;
pub mod memory_cache;
pub mod net;
pub mod request;
