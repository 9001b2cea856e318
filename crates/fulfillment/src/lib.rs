//! Jabuticaba Fulfillment - order orchestration core.
//!
//! This crate owns the path from a shopper's cart to a shipped, notified
//! order:
//!
//! - [`zones`] - matching addresses to last-mile delivery zones
//! - [`freight`] - aggregating third-party carrier quotes
//! - [`checkout`] - the checkout session state machine and order submission
//! - [`provisioning`] - creating carrier shipments, exactly once per order
//! - [`notifications`] - durable status-change notifications over email and chat
//!
//! Persistence lives behind the store traits in [`db`]; external providers
//! behind the [`carrier`] and [`payment`] client traits. Both have
//! production implementations here and in-memory fakes for tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod carrier;
pub mod checkout;
pub mod config;
pub mod db;
pub mod freight;
pub mod models;
pub mod notifications;
pub mod payment;
pub mod provisioning;
pub mod zones;

#[cfg(test)]
pub mod testing;
