//! Shopping cart state.
//!
//! # Data Flow
//! ```text
//! /cart/* handlers
//!     → store.rs (add / remove / get under a single mutex)
//!
//! Export cycle (every interval)
//!     → observer.rs (CartSizeObserver::sample)
//!     → store.rs (snapshot: copy of user → size)
//!     → cart_items_count gauge points
//! ```
//!
//! # Design Decisions
//! - One mutex guards the whole mapping so every operation is linearizable
//! - Carts are created lazily and never deleted
//! - The gauge never sees live carts, only a copied snapshot

pub mod observer;
pub mod store;

pub use observer::{register_cart_gauge, CartSizeObserver, CART_ITEMS_GAUGE};
pub use store::{Cart, CartError, CartStore};
