//! Session-backed state shared by the route handlers.
//!
//! - `cart` - Cart summary kept in step with the backend
//! - `flash` - One-shot notifications for the next rendered page
//! - `otp` - Pending OTP logins, locked per flow

pub mod cart;
pub mod flash;
pub mod otp;
