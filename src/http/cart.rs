//! Cart management.
//!
//! A user has exactly one cart, created lazily on first touch and never
//! deleted. Every mutation returns the recomputed cart view; totals are
//! evaluated live against current catalog prices.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::cart::{classify_quantity, totals, CartLine, QuantityChange};
use crate::domain::value_objects::{Money, DEFAULT_CURRENCY};
use crate::error::{ApiError, ApiResult};
use crate::models::{Cart, CartItem};
use crate::state::AppState;
use crate::http::auth::AuthUser;

#[derive(Debug, Serialize)]
pub struct CartView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartItemView>,
    pub total_items: u32,
    pub total_price: Decimal,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct CartItemView {
    pub id: Uuid,
    pub quantity: i32,
    pub subtotal: Decimal,
    pub product_variant: CartVariantView,
}

#[derive(Debug, Serialize)]
pub struct CartVariantView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    pub currency: String,
    pub stock: i32,
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: Uuid,
    quantity: i32,
    variant_id: Uuid,
    product_id: Uuid,
    variant_name: String,
    sku: String,
    price: Decimal,
    currency: String,
    stock: i32,
    product_name: String,
}

/// Resolves the caller's single cart, persisting it on first access.
pub(crate) async fn ensure_cart<'e>(
    db: impl sqlx::PgExecutor<'e>,
    user_id: Uuid,
) -> Result<Cart, sqlx::Error> {
    sqlx::query_as::<_, Cart>(
        "INSERT INTO carts (id, user_id) VALUES ($1, $2) \
         ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .fetch_one(db)
    .await
}

async fn load_cart_view(db: &sqlx::PgPool, cart_id: Uuid, user_id: Uuid) -> Result<CartView, ApiError> {
    let rows: Vec<CartLineRow> = sqlx::query_as(
        "SELECT ci.id, ci.quantity, v.id AS variant_id, v.product_id, v.name AS variant_name, \
         v.sku, v.price, v.currency, v.stock, p.name AS product_name \
         FROM cart_items ci \
         JOIN product_variants v ON v.id = ci.variant_id \
         JOIN products p ON p.id = v.product_id \
         WHERE ci.cart_id = $1 \
         ORDER BY ci.created_at",
    )
    .bind(cart_id)
    .fetch_all(db)
    .await?;

    let currency = rows
        .first()
        .map(|row| row.currency.clone())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    let lines: Vec<CartLine> = rows
        .iter()
        .map(|row| CartLine {
            quantity: row.quantity.max(0) as u32,
            unit_price: Money::new(row.price, &row.currency),
        })
        .collect();
    let cart_totals = totals(&currency, &lines);

    let items = rows
        .into_iter()
        .map(|row| CartItemView {
            id: row.id,
            quantity: row.quantity,
            subtotal: row.price * Decimal::from(row.quantity.max(0)),
            product_variant: CartVariantView {
                id: row.variant_id,
                product_id: row.product_id,
                product_name: row.product_name,
                name: row.variant_name,
                sku: row.sku,
                price: row.price,
                currency: row.currency,
                stock: row.stock,
            },
        })
        .collect();

    Ok(CartView {
        id: cart_id,
        user_id,
        items,
        total_items: cart_totals.total_items,
        total_price: cart_totals.total_price.amount(),
        currency,
    })
}

pub async fn get_cart(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<CartView>> {
    let cart = ensure_cart(&state.db, user.0).await?;
    Ok(Json(load_cart_view(&state.db, cart.id, user.0).await?))
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub product_variant_id: Uuid,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: u32,
}

pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<AddItemRequest>,
) -> ApiResult<(StatusCode, Json<CartView>)> {
    req.validate()?;
    let variant: Option<(i32,)> = sqlx::query_as("SELECT stock FROM product_variants WHERE id = $1")
        .bind(req.product_variant_id)
        .fetch_optional(&state.db)
        .await?;
    let (stock,) = variant.ok_or_else(|| ApiError::not_found("product variant not found"))?;
    if (stock.max(0) as u32) < req.quantity {
        return Err(ApiError::invalid("not enough stock"));
    }

    let cart = ensure_cart(&state.db, user.0).await?;
    sqlx::query(
        "INSERT INTO cart_items (id, cart_id, variant_id, quantity) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (cart_id, variant_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity",
    )
    .bind(Uuid::now_v7())
    .bind(cart.id)
    .bind(req.product_variant_id)
    .bind(req.quantity as i32)
    .execute(&state.db)
    .await?;

    let view = load_cart_view(&state.db, cart.id, user.0).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub item_id: Uuid,
    pub quantity: i64,
}

pub async fn update_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<UpdateQuantityRequest>,
) -> ApiResult<Json<CartView>> {
    let cart = ensure_cart(&state.db, user.0).await?;
    let item: Option<CartItem> = sqlx::query_as("SELECT * FROM cart_items WHERE id = $1 AND cart_id = $2")
        .bind(req.item_id)
        .bind(cart.id)
        .fetch_optional(&state.db)
        .await?;
    let item = item.ok_or_else(|| ApiError::not_found("item not found in cart"))?;

    match classify_quantity(req.quantity) {
        QuantityChange::Remove => {
            sqlx::query("DELETE FROM cart_items WHERE id = $1")
                .bind(item.id)
                .execute(&state.db)
                .await?;
        }
        QuantityChange::Set(quantity) => {
            let (stock,): (i32,) = sqlx::query_as("SELECT stock FROM product_variants WHERE id = $1")
                .bind(item.variant_id)
                .fetch_one(&state.db)
                .await?;
            if (stock.max(0) as u32) < quantity.value() {
                return Err(ApiError::invalid("not enough stock"));
            }
            sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
                .bind(item.id)
                .bind(quantity.value() as i32)
                .execute(&state.db)
                .await?;
        }
    }

    Ok(Json(load_cart_view(&state.db, cart.id, user.0).await?))
}

#[derive(Debug, Deserialize)]
pub struct RemoveItemRequest {
    pub item_id: Uuid,
}

pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<RemoveItemRequest>,
) -> ApiResult<Json<CartView>> {
    let cart = ensure_cart(&state.db, user.0).await?;
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
        .bind(req.item_id)
        .bind(cart.id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("item not found in cart"));
    }
    Ok(Json(load_cart_view(&state.db, cart.id, user.0).await?))
}

pub async fn clear_cart(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<CartView>> {
    let cart = ensure_cart(&state.db, user.0).await?;
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart.id)
        .execute(&state.db)
        .await?;
    Ok(Json(load_cart_view(&state.db, cart.id, user.0).await?))
}
