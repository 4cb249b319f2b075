//! Domain events published after state changes commit.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: Uuid, default_variant_id: Option<Uuid> },
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: Uuid, total: Decimal },
}

impl DomainEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            DomainEvent::Product(ProductEvent::Created { .. }) => "commerce.product.created",
            DomainEvent::Order(OrderEvent::Placed { .. }) => "commerce.order.placed",
        }
    }
}
