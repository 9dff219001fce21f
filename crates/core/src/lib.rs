//! ShopEasy Core - Shared domain types and client state machines.
//!
//! This crate provides the pieces of the storefront that carry actual logic
//! but no I/O:
//! - [`types`] - Records mirrored from the commerce backend (users, products,
//!   carts, addresses, orders) and validated newtypes (IDs, emails, phones)
//! - [`otp`] - The OTP entry / verification / resend state machine
//! - [`cart`] - Cart summary bookkeeping with optimistic adds and reconciliation
//! - [`listing`] - Product listing query (page, search, category, sort)
//! - [`stats`] - Admin statistics derived from the backend's counters
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no HTTP
//! clients, no sessions, no clocks. Callers pass `now` explicitly, which keeps
//! the timers deterministic under test.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod listing;
pub mod otp;
pub mod stats;
pub mod types;

pub use types::*;
