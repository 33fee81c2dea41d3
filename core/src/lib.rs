pub mod api;
pub mod checkpoint;
pub mod config;
pub mod document;
pub mod error;
pub mod executor;
