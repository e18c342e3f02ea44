pub mod app;
pub mod config;
pub mod cycle;
pub mod error;
