//! Byte-stream transports for graft sessions.
//!
//! A session runs over anything that is `Read + Write`. This crate supplies
//! the two transports the workspace uses:
//! - TCP endpoints with connect/accept and session migration onto a fresh
//!   connection ([`tcp`])
//! - A blocking in-process duplex pipe ([`memory`])

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "tcp")]
pub mod tcp;

pub use error::{Error, Result};
