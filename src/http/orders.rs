//! Order history and the checkout workflow.
//!
//! Checkout is the single state-changing workflow with a real correctness
//! contract: validation, order creation, price snapshotting, stock decrement
//! and cart clearing commit as one transaction or not at all. An early return
//! drops the uncommitted transaction, which rolls everything back.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::checkout::{resolve_billing, settle, CheckoutError, CheckoutLine};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Money, Quantity};
use crate::error::{ApiError, ApiResult};
use crate::http::auth::AuthUser;
use crate::http::cart::ensure_cart;
use crate::models::{Order, OrderStatus};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub total_price: Decimal,
    pub currency: String,
    pub shipping_address: String,
    pub billing_address: String,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderLineView>,
}

#[derive(Debug, Serialize)]
pub struct OrderLineView {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub sku: String,
    pub variant_name: String,
    pub product_name: String,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: Uuid,
    order_id: Uuid,
    variant_id: Uuid,
    quantity: i32,
    price_at_purchase: Decimal,
    sku: String,
    variant_name: String,
    product_name: String,
}

impl OrderLineRow {
    fn into_view(self) -> OrderLineView {
        OrderLineView {
            id: self.id,
            variant_id: self.variant_id,
            sku: self.sku,
            variant_name: self.variant_name,
            product_name: self.product_name,
            quantity: self.quantity,
            price_at_purchase: self.price_at_purchase,
            subtotal: self.price_at_purchase * Decimal::from(self.quantity.max(0)),
        }
    }
}

impl OrderView {
    fn assemble(order: Order, items: Vec<OrderLineView>) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            total_price: order.total_price,
            currency: order.currency,
            shipping_address: order.shipping_address,
            billing_address: order.billing_address,
            tracking_number: order.tracking_number,
            created_at: order.created_at,
            items,
        }
    }
}

const ORDER_LINES_QUERY: &str =
    "SELECT op.id, op.order_id, op.variant_id, op.quantity, op.price_at_purchase, \
     v.sku, v.name AS variant_name, p.name AS product_name \
     FROM order_products op \
     JOIN product_variants v ON v.id = op.variant_id \
     JOIN products p ON p.id = v.product_id";

pub async fn list_orders(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<OrderView>>> {
    let orders: Vec<Order> = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user.0)
        .fetch_all(&state.db)
        .await?;
    let ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
    let rows: Vec<OrderLineRow> = sqlx::query_as(&format!("{ORDER_LINES_QUERY} WHERE op.order_id = ANY($1)"))
        .bind(&ids)
        .fetch_all(&state.db)
        .await?;

    let mut lines_by_order: HashMap<Uuid, Vec<OrderLineView>> = HashMap::new();
    for row in rows {
        lines_by_order.entry(row.order_id).or_default().push(row.into_view());
    }
    let views = orders
        .into_iter()
        .map(|order| {
            let items = lines_by_order.remove(&order.id).unwrap_or_default();
            OrderView::assemble(order, items)
        })
        .collect();
    Ok(Json(views))
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<OrderView>> {
    let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.0)
        .fetch_optional(&state.db)
        .await?;
    let order = order.ok_or_else(|| ApiError::not_found("order not found"))?;
    let view = load_order_view(&state.db, order).await?;
    Ok(Json(view))
}

async fn load_order_view(db: &sqlx::PgPool, order: Order) -> Result<OrderView, ApiError> {
    let rows: Vec<OrderLineRow> = sqlx::query_as(&format!("{ORDER_LINES_QUERY} WHERE op.order_id = $1"))
        .bind(order.id)
        .fetch_all(db)
        .await?;
    let items = rows.into_iter().map(OrderLineRow::into_view).collect();
    Ok(OrderView::assemble(order, items))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "shipping address must not be blank"))]
    pub shipping_address: String,
    pub billing_address: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct CheckoutLineRow {
    variant_id: Uuid,
    quantity: i32,
    price: Decimal,
    currency: String,
    stock: i32,
    product_name: String,
}

/// Converts the caller's cart into an order.
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<OrderView>)> {
    req.validate()?;
    let shipping = req.shipping_address.trim().to_string();
    if shipping.is_empty() {
        return Err(ApiError::invalid("shipping address must not be blank"));
    }
    let billing = resolve_billing(&shipping, req.billing_address.as_deref());

    let mut tx = state.db.begin().await?;
    let cart = ensure_cart(&mut *tx, user.0).await?;
    let rows: Vec<CheckoutLineRow> = sqlx::query_as(
        "SELECT ci.variant_id, ci.quantity, v.price, v.currency, v.stock, p.name AS product_name \
         FROM cart_items ci \
         JOIN product_variants v ON v.id = ci.variant_id \
         JOIN products p ON p.id = v.product_id \
         WHERE ci.cart_id = $1 \
         ORDER BY ci.created_at",
    )
    .bind(cart.id)
    .fetch_all(&mut *tx)
    .await?;

    let lines: Vec<CheckoutLine> = rows
        .iter()
        .map(|row| CheckoutLine {
            variant_id: row.variant_id,
            product_name: row.product_name.clone(),
            unit_price: Money::new(row.price, &row.currency),
            stock: Quantity::new(row.stock.max(0) as u32),
            quantity: row.quantity.max(0) as u32,
        })
        .collect();
    // All validation happens here, before the first write.
    let settlement = settle(&lines)?;

    let order: Order = sqlx::query_as(
        "INSERT INTO orders (id, user_id, status, total_price, currency, shipping_address, billing_address) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user.0)
    .bind(OrderStatus::Pending.as_str())
    .bind(settlement.total.amount())
    .bind(settlement.total.currency())
    .bind(&shipping)
    .bind(&billing)
    .fetch_one(&mut *tx)
    .await?;

    for line in &settlement.lines {
        sqlx::query(
            "INSERT INTO order_products (id, order_id, variant_id, quantity, price_at_purchase) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::now_v7())
        .bind(order.id)
        .bind(line.variant_id)
        .bind(line.quantity as i32)
        .bind(line.price_at_purchase.amount())
        .execute(&mut *tx)
        .await?;

        // Conditional decrement: a concurrent checkout that drained the stock
        // since the validation read makes this affect zero rows, which aborts
        // and rolls back the whole order.
        let updated = sqlx::query("UPDATE product_variants SET stock = stock - $2 WHERE id = $1 AND stock >= $2")
            .bind(line.variant_id)
            .bind(line.quantity as i32)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(CheckoutError::InsufficientStock { product: line.product_name.clone() }.into());
        }
    }

    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(order_id = %order.id, user_id = %user.0, total = %order.total_price, "order placed");
    state
        .events
        .publish(&DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id,
            user_id: user.0,
            total: order.total_price,
        }))
        .await;

    let view = load_order_view(&state.db, order).await?;
    Ok((StatusCode::CREATED, Json(view)))
}
