//! Order Service Core - Shared types library.
//!
//! This crate provides the domain types used across the order service workspace:
//! - `order-service` - HTTP API, upstream clients, and order persistence
//! - `order-cli` - Command-line tools for migrations
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. The optional `postgres` feature adds `sqlx` encoding for
//! the id newtypes and money values.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, money, order status, and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
