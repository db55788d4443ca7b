//! Boodschap Core - Shared types library.
//!
//! This crate provides common types used across all boodschap components:
//! - `ah` - Albert Heijn mobile-API client
//! - `bridge` - cross-store matching and checkout comparison
//! - `cli` - the `boodschap` command-line binary
//!
//! # Architecture
//!
//! The core crate contains only types and parsing helpers - no I/O, no
//! HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money parsing, confidence bands, and
//!   grocery item intents

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
