//! # Core Runtime Module
//!
//! Provides the ambient runtime infrastructure the playback core depends on:
//! - Logging and tracing infrastructure
//! - Buffer and session configuration
//!
//! ## Overview
//!
//! This crate establishes the logging conventions and the configuration
//! surface shared by every worker thread. Buffer capacities are fixed at
//! construction time; nothing here is mutable once a session has started.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{BufferSettings, CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
