//! Cross-store grocery bridge.
//!
//! Composes the built-in Albert Heijn client with the external Picnic
//! CLI (consumed strictly through its JSON output) to:
//!
//! - search both providers at once,
//! - match free-text grocery items to concrete products on both sides
//!   with a confidence band per provider,
//! - compare checkout totals and recommend the cheaper store.
//!
//! Matching is stateless apart from an optional file-backed cache of
//! resolved name → id pairs with a configurable TTL.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod compare;
pub mod config;
pub mod error;
pub mod matcher;
pub mod picnic;

pub use compare::{CompareOptions, CompareReport, PicnicUnit, Recommendation};
pub use config::{AppConfig, CliPaths, MatchSettings};
pub use error::BridgeError;
pub use matcher::{ItemMatch, MatchReport, Matcher, StoreMatch};
pub use picnic::{PicnicCli, PicnicProduct};
