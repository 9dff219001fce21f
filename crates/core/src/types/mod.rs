//! Core types for ShopEasy.
//!
//! Records mirrored from the commerce backend plus type-safe wrappers for the
//! values the storefront validates before sending them anywhere.

pub mod address;
pub mod cart_item;
pub mod email;
pub mod id;
pub mod order;
pub mod phone;
pub mod price;
pub mod product;
pub mod status;
pub mod user;

pub use address::{Address, AddressError, NewAddress};
pub use cart_item::{CartItem, CartSnapshot};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{Order, OrderItem, OrderUser};
pub use phone::{Phone, PhoneError};
pub use price::{CurrencyCode, Price};
pub use product::{Product, ProductDraft, ProductImage, ValidationError};
pub use status::*;
pub use user::User;
