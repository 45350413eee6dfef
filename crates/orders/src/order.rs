use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fairmarket_core::{DomainError, DomainResult, Entity, OrderId, ProductId, SellerId, UserId};

/// Order fulfilment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One line of an order.
///
/// `price_at_purchase` freezes the unit price at placement; later price
/// edits on the product never reach back into historical orders. The seller
/// is denormalized so seller-level signals need no product lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub seller_id: SellerId,
    pub quantity: u32,
    pub price_at_purchase: u64,
}

impl OrderItem {
    /// Line subtotal, or `None` when the quantity times the frozen unit
    /// price overflows the minor-unit range.
    pub fn line_total(&self) -> Option<u64> {
        u64::from(self.quantity).checked_mul(self.price_at_purchase)
    }
}

/// Customer order: a batch of lines moving through fulfilment as one unit.
///
/// Immutable once placed, except for status transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    items: Vec<OrderItem>,
    total_amount: u64,
    status: OrderStatus,
    shipping_address: String,
    created_at: DateTime<Utc>,
    version: u64,
}

impl Order {
    /// Place a new order. The total is derived from the frozen line prices
    /// and must stay representable in minor units.
    pub fn place(
        id: OrderId,
        user_id: UserId,
        items: Vec<OrderItem>,
        shipping_address: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }
        if items.iter().any(|item| item.quantity == 0) {
            return Err(DomainError::validation("item quantity must be positive"));
        }
        let shipping_address = shipping_address.into();
        if shipping_address.trim().is_empty() {
            return Err(DomainError::validation("shipping_address cannot be empty"));
        }

        let total_amount = items
            .iter()
            .try_fold(0u64, |total, item| {
                item.line_total().and_then(|line| total.checked_add(line))
            })
            .ok_or_else(|| {
                DomainError::validation("order total overflows the minor-unit range")
            })?;

        Ok(Self {
            id,
            user_id,
            items,
            total_amount,
            status: OrderStatus::Pending,
            shipping_address,
            created_at: now,
            version: 0,
        })
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn shipping_address(&self) -> &str {
        &self.shipping_address
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_delivered(&self) -> bool {
        self.status == OrderStatus::Delivered
    }

    /// Distinct sellers with at least one line in this order.
    pub fn seller_ids(&self) -> Vec<SellerId> {
        let mut seen = HashSet::new();
        self.items
            .iter()
            .map(|item| item.seller_id)
            .filter(|seller_id| seen.insert(*seller_id))
            .collect()
    }

    /// Distinct products with at least one line in this order.
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut seen = HashSet::new();
        self.items
            .iter()
            .map(|item| item.product_id)
            .filter(|product_id| seen.insert(*product_id))
            .collect()
    }

    /// Units of one product across all lines of this order.
    pub fn units_of(&self, product_id: ProductId) -> u64 {
        self.items
            .iter()
            .filter(|item| item.product_id == product_id)
            .map(|item| u64::from(item.quantity))
            .sum()
    }

    pub fn contains_seller(&self, seller_id: SellerId) -> bool {
        self.items.iter().any(|item| item.seller_id == seller_id)
    }

    /// Move a pending order into fulfilment.
    pub fn mark_processing(&mut self) -> DomainResult<()> {
        if self.status != OrderStatus::Pending {
            return Err(DomainError::invalid_state(format!(
                "only pending orders can start processing, order is {}",
                self.status
            )));
        }
        self.status = OrderStatus::Processing;
        Ok(())
    }

    pub fn mark_shipped(&mut self) -> DomainResult<()> {
        if self.status != OrderStatus::Processing {
            return Err(DomainError::invalid_state(format!(
                "only processing orders can be shipped, order is {}",
                self.status
            )));
        }
        self.status = OrderStatus::Shipped;
        Ok(())
    }

    pub fn mark_delivered(&mut self) -> DomainResult<()> {
        if self.status != OrderStatus::Shipped {
            return Err(DomainError::invalid_state(format!(
                "only shipped orders can be delivered, order is {}",
                self.status
            )));
        }
        self.status = OrderStatus::Delivered;
        Ok(())
    }

    /// Cancel before shipment. Shipped, delivered, and already-cancelled
    /// orders cannot be cancelled.
    pub fn cancel(&mut self) -> DomainResult<()> {
        match self.status {
            OrderStatus::Pending | OrderStatus::Processing => {
                self.status = OrderStatus::Cancelled;
                Ok(())
            }
            other => Err(DomainError::invalid_state(format!(
                "orders cannot be cancelled once {other}"
            ))),
        }
    }

    /// Copy stamped with the storage version assigned by the record store on
    /// commit.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
