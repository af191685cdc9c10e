pub mod adapters;
pub mod config;
pub mod daemon;
pub mod error;
