//! Concurrent per-user cart storage.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

use crate::sync::lock;

/// Errors returned by cart operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// A required argument was empty or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The user has no cart, or the cart holds no items.
    #[error("cart not found or empty for user {user_id}")]
    NotFound { user_id: String },

    /// The index does not address an item in the cart.
    #[error("index {index} out of range for cart of size {size}")]
    OutOfRange { index: i64, size: usize },
}

/// A single user's cart. Items keep insertion order and may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    pub items: Vec<String>,
}

impl Cart {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Thread-safe mapping of user id to cart.
///
/// All reads and writes go through one mutex, so each call observes either
/// all or none of any concurrent mutation.
#[derive(Debug, Default)]
pub struct CartStore {
    carts: Mutex<HashMap<String, Cart>>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` to the user's cart, creating the cart if needed.
    ///
    /// Returns the cart contents right after the append, read under the same
    /// lock as the write.
    pub fn add_item(&self, user_id: &str, item: &str) -> Result<Vec<String>, CartError> {
        if user_id.is_empty() {
            return Err(CartError::InvalidArgument("user_id must not be empty".into()));
        }
        if item.is_empty() {
            return Err(CartError::InvalidArgument("item must not be empty".into()));
        }

        let mut carts = lock(&self.carts);
        let cart = carts.entry(user_id.to_string()).or_default();
        cart.items.push(item.to_string());
        Ok(cart.items.clone())
    }

    /// Remove the item at `index`, keeping the order of the remaining items.
    ///
    /// Returns the cart contents right after the removal. An emptied cart
    /// stays in the store.
    pub fn remove_item_at(&self, user_id: &str, index: i64) -> Result<Vec<String>, CartError> {
        let mut carts = lock(&self.carts);
        let cart = match carts.get_mut(user_id) {
            Some(cart) if !cart.is_empty() => cart,
            _ => {
                return Err(CartError::NotFound {
                    user_id: user_id.to_string(),
                })
            }
        };

        let size = cart.len();
        let position = usize::try_from(index)
            .ok()
            .filter(|position| *position < size)
            .ok_or(CartError::OutOfRange { index, size })?;

        cart.items.remove(position);
        Ok(cart.items.clone())
    }

    /// Items in the user's cart, in insertion order. Unknown users get an
    /// empty list.
    pub fn get_items(&self, user_id: &str) -> Vec<String> {
        lock(&self.carts)
            .get(user_id)
            .map(|cart| cart.items.clone())
            .unwrap_or_default()
    }

    /// Number of items in the user's cart.
    pub fn size(&self, user_id: &str) -> usize {
        lock(&self.carts).get(user_id).map_or(0, Cart::len)
    }

    /// Point-in-time copy of every cart's size.
    pub fn snapshot(&self) -> HashMap<String, usize> {
        lock(&self.carts)
            .iter()
            .map(|(user_id, cart)| (user_id.clone(), cart.len()))
            .collect()
    }

    /// Number of carts ever created.
    pub fn cart_count(&self) -> usize {
        lock(&self.carts).len()
    }
}
