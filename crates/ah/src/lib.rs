//! Albert Heijn mobile-API client.
//!
//! # Architecture
//!
//! - The mobile backend is undocumented; endpoints and payload shapes
//!   follow what the official app sends. REST endpoints cover search,
//!   bonus listing, shopping list, and the order cart; product detail
//!   goes through the GraphQL endpoint with a hand-written query (there
//!   is no published schema to generate code from).
//! - OAuth tokens are file-backed and refreshed transparently; a request
//!   is never sent with an expired token without first attempting a
//!   refresh.
//! - In-memory caching via `moka` for read-only API responses (5 minute
//!   TTL).
//!
//! # Example
//!
//! ```rust,ignore
//! use boodschap_ah::{AhClient, AhConfig};
//!
//! let client = AhClient::new(&AhConfig::default())?;
//!
//! // Search works anonymously
//! let products = client.search("halfvolle melk", 5).await?;
//!
//! // Cart writes need a logged-in token
//! let report = client.batch_add_order(&[(products[0].id, 2)]).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;

pub use auth::{AuthManager, Token, TokenStore};
pub use client::{AhClient, BatchEntry, BatchFailure, BatchReport, ListEntry, Product};
pub use config::AhConfig;
pub use error::{AhError, AuthError};
