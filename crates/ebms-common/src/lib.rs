//! EBMS Analytics Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared logging configuration for the EBMS Analytics workspace.
//!
//! # Example
//!
//! ```no_run
//! use ebms_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     Ok(())
//! }
//! ```

pub mod logging;
