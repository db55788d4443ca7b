//! Core types for boodschap.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod confidence;
pub mod id;
pub mod item;
pub mod money;

pub use cart::{CartLine, CartSnapshot, Provider};
pub use confidence::Confidence;
pub use id::*;
pub use item::GroceryItem;
pub use money::{CurrencyCode, Money, MoneyError};
