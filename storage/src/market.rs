use std::time::SystemTime;

use crate::cache::CacheValue;
use crate::error::StorageError;

/// Buy or sell side of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Order lifecycle. Transitions form a DAG rooted at `Active`; `Filled`,
/// `Cancelled` and `Expired` are final.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderStatus {
    Active,
    PartiallyFilled,
    Filled,
    Cancelled,
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }
}

/// A market order: the representative persisted, order-matched domain
/// entity. It exercises the cache, partition and replica layers; the
/// matching rules themselves live with the game content.
#[derive(Clone, Debug, PartialEq)]
pub struct MarketOrder {
    pub order_id: u64,
    pub player: u64,
    pub side: OrderSide,
    pub commodity: String,
    pub quantity: u64,
    pub filled: u64,
    pub price_per_unit: u64,
    pub status: OrderStatus,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

impl MarketOrder {
    pub fn new(
        order_id: u64,
        player: u64,
        side: OrderSide,
        commodity: &str,
        quantity: u64,
        price_per_unit: u64,
        created_at: SystemTime,
        expires_at: SystemTime,
    ) -> Self {
        Self {
            order_id,
            player,
            side,
            commodity: commodity.to_string(),
            quantity,
            filled: 0,
            price_per_unit,
            status: OrderStatus::Active,
            created_at,
            expires_at,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.quantity - self.filled
    }

    /// Applies a fill of `amount` units. Over-fills and fills against a
    /// terminal order are conflicts.
    pub fn fill(&mut self, amount: u64) -> Result<(), StorageError> {
        if self.status.is_terminal() {
            return Err(StorageError::Conflict {
                reason: format!("order {} is {:?}", self.order_id, self.status),
            });
        }
        if amount == 0 || amount > self.remaining() {
            return Err(StorageError::Conflict {
                reason: format!(
                    "fill of {amount} exceeds remaining {} on order {}",
                    self.remaining(),
                    self.order_id
                ),
            });
        }

        self.filled += amount;
        self.status = if self.filled == self.quantity {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        Ok(())
    }

    /// Cancels the order. Cancelling a terminal order (e.g. already
    /// filled) is rejected with a conflict.
    pub fn cancel(&mut self) -> Result<(), StorageError> {
        if self.status.is_terminal() {
            return Err(StorageError::Conflict {
                reason: format!("cannot cancel order {}: already {:?}", self.order_id, self.status),
            });
        }
        self.status = OrderStatus::Cancelled;
        Ok(())
    }

    /// Expires the order once past its expiry time. Terminal orders are
    /// left alone.
    pub fn expire(&mut self, now: SystemTime) -> bool {
        if self.status.is_terminal() || now < self.expires_at {
            return false;
        }
        self.status = OrderStatus::Expired;
        true
    }
}

impl CacheValue for MarketOrder {
    fn size_estimate(&self) -> usize {
        std::mem::size_of::<Self>() + self.commodity.len()
    }
}
