//! Cart size sampling for the `cart_items_count` gauge.

use std::sync::Arc;

use crate::cart::store::CartStore;
use crate::instruments::{
    Attributes, MetricRegistry, Observable, ObservableGauge, ObserveResult, Observation,
    RegistryError,
};

pub const CART_ITEMS_GAUGE: &str = "cart_items_count";

/// Reports one observation per cart: its item count, tagged with `user_id`.
#[derive(Debug, Clone)]
pub struct CartSizeObserver {
    store: Arc<CartStore>,
}

impl CartSizeObserver {
    pub fn new(store: Arc<CartStore>) -> Self {
        Self { store }
    }
}

impl Observable for CartSizeObserver {
    fn sample(&self) -> ObserveResult {
        Ok(self
            .store
            .snapshot()
            .into_iter()
            .map(|(user_id, size)| {
                Observation::new(
                    i64::try_from(size).unwrap_or(i64::MAX),
                    Attributes::new().with("user_id", user_id),
                )
            })
            .collect())
    }
}

/// Register the `cart_items_count` gauge backed by `store`.
pub fn register_cart_gauge(
    registry: &MetricRegistry,
    store: Arc<CartStore>,
) -> Result<ObservableGauge, RegistryError> {
    registry.observable_gauge(
        CART_ITEMS_GAUGE,
        "1",
        "Number of items currently in user carts",
        CartSizeObserver::new(store),
    )
}
