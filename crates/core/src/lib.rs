//! Jabuticaba Core - Shared types library.
//!
//! This crate provides common types used across all Jabuticaba components:
//! - `fulfillment` - Order fulfillment core (checkout, shipping, notifications)
//! - `cli` - Command-line tools for migrations and operations
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, contact data, and statuses
//! - [`text`] - Accent/punctuation-insensitive text normalization

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod text;
pub mod types;

pub use types::*;
