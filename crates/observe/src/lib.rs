//! This crate contains the logging setup of the deployment tooling: a
//! `tracing` subscriber with filter directives, stderr routing and a panic
//! hook that reports panics through the same subscriber.
pub mod config;
pub mod tracing;

pub use config::Config;
