//! Subscription Change Engine
//!
//! Lets a checkout flow preview and then commit a change to a subscription
//! (or the creation of a new one) against a billing gateway. Previews are
//! read-only and may be requested any number of times; commits always
//! rebuild a fresh preview and perform exactly one gateway mutation.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod observability;
pub mod ports;
