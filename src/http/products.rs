use std::collections::BTreeSet;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::{Sku, DEFAULT_CURRENCY};
use crate::error::{ApiError, ApiResult};
use crate::models::{Attribute, AttributeValue, Product, ProductVariant};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<ProductVariant>,
}

pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProductDetail>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("product not found"))?;
    let variants =
        sqlx::query_as::<_, ProductVariant>("SELECT * FROM product_variants WHERE product_id = $1 ORDER BY name")
            .bind(id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(ProductDetail { product, variants }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "name must not be blank"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, message = "base_sku must not be blank"))]
    pub base_sku: String,
    pub price: Decimal,
    pub currency: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[validate(range(min = 0))]
    pub default_stock: Option<i32>,
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(req): Json<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<ProductDetail>)> {
    req.validate()?;
    let currency = req.currency.as_deref().unwrap_or(DEFAULT_CURRENCY);
    let default_sku = Sku::for_default(&req.base_sku)?;

    let mut tx = state.db.begin().await?;
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, name, description, base_sku, price, currency, category_id, tags) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.base_sku)
    .bind(req.price)
    .bind(currency)
    .bind(req.category_id)
    .bind(&req.tags)
    .fetch_one(&mut *tx)
    .await?;

    // A product always leaves creation with at least one purchasable unit.
    let variant = sqlx::query_as::<_, ProductVariant>(
        "INSERT INTO product_variants (id, product_id, name, sku, price, currency, stock) \
         VALUES ($1, $2, 'Default', $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(product.id)
    .bind(default_sku.as_str())
    .bind(product.price)
    .bind(&product.currency)
    .bind(req.default_stock.unwrap_or(0))
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    state
        .events
        .publish(&DomainEvent::Product(ProductEvent::Created {
            product_id: product.id,
            default_variant_id: Some(variant.id),
        }))
        .await;

    Ok((StatusCode::CREATED, Json(ProductDetail { product, variants: vec![variant] })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, message = "name must not be blank"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub currency: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> ApiResult<Json<Product>> {
    req.validate()?;
    // Variant rows are untouched: catalog price changes are never retroactive.
    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET name = $2, description = $3, price = $4, \
         currency = COALESCE($5, currency), category_id = $6, tags = $7, updated_at = now() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.price)
    .bind(req.currency.as_deref())
    .bind(req.category_id)
    .bind(&req.tags)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("product not found"))?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("product not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_variants(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ProductVariant>>> {
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    if exists.is_none() {
        return Err(ApiError::not_found("product not found"));
    }
    let variants =
        sqlx::query_as::<_, ProductVariant>("SELECT * FROM product_variants WHERE product_id = $1 ORDER BY name")
            .bind(id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(variants))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVariantRequest {
    #[validate(length(min = 1, message = "name must not be blank"))]
    pub name: String,
    pub sku: Option<String>,
    pub price: Option<Decimal>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub stock: i32,
    #[serde(default)]
    pub attribute_value_ids: Vec<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
struct AttributeCodeRow {
    name: String,
    sku_code: String,
}

pub async fn create_variant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateVariantRequest>,
) -> ApiResult<(StatusCode, Json<ProductVariant>)> {
    req.validate()?;
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("product not found"))?;

    let value_ids: Vec<Uuid> = req.attribute_value_ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    let sku = match &req.sku {
        Some(raw) => Sku::new(raw.clone())?,
        None => {
            if value_ids.is_empty() {
                return Err(ApiError::invalid("a sku or at least one attribute value is required"));
            }
            let codes: Vec<AttributeCodeRow> = sqlx::query_as(
                "SELECT a.name, av.sku_code FROM attribute_values av \
                 JOIN attributes a ON a.id = av.attribute_id WHERE av.id = ANY($1)",
            )
            .bind(&value_ids)
            .fetch_all(&state.db)
            .await?;
            if codes.len() != value_ids.len() {
                return Err(ApiError::not_found("attribute value not found"));
            }
            let pairs: Vec<(String, String)> =
                codes.into_iter().map(|row| (row.name, row.sku_code)).collect();
            Sku::compose(&product.base_sku, &pairs)?
        }
    };

    let mut tx = state.db.begin().await?;
    let variant = sqlx::query_as::<_, ProductVariant>(
        "INSERT INTO product_variants (id, product_id, name, sku, price, currency, stock) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(product.id)
    .bind(&req.name)
    .bind(sku.as_str())
    .bind(req.price.unwrap_or(product.price))
    .bind(&product.currency)
    .bind(req.stock)
    .fetch_one(&mut *tx)
    .await?;
    for value_id in &value_ids {
        sqlx::query("INSERT INTO variant_attributes (variant_id, attribute_value_id) VALUES ($1, $2)")
            .bind(variant.id)
            .bind(value_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(variant)))
}

pub async fn list_attributes(State(state): State<AppState>) -> ApiResult<Json<Vec<Attribute>>> {
    let attributes = sqlx::query_as::<_, Attribute>("SELECT * FROM attributes ORDER BY name")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(attributes))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAttributeRequest {
    #[validate(length(min = 1, message = "name must not be blank"))]
    pub name: String,
}

pub async fn create_attribute(
    State(state): State<AppState>,
    Json(req): Json<CreateAttributeRequest>,
) -> ApiResult<(StatusCode, Json<Attribute>)> {
    req.validate()?;
    let attribute = sqlx::query_as::<_, Attribute>("INSERT INTO attributes (id, name) VALUES ($1, $2) RETURNING *")
        .bind(Uuid::now_v7())
        .bind(&req.name)
        .fetch_one(&state.db)
        .await?;
    Ok((StatusCode::CREATED, Json(attribute)))
}

pub async fn list_attribute_values(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<AttributeValue>>> {
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM attributes WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    if exists.is_none() {
        return Err(ApiError::not_found("attribute not found"));
    }
    let values =
        sqlx::query_as::<_, AttributeValue>("SELECT * FROM attribute_values WHERE attribute_id = $1 ORDER BY value")
            .bind(id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(values))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAttributeValueRequest {
    #[validate(length(min = 1, message = "value must not be blank"))]
    pub value: String,
    #[validate(length(min = 1, max = 10, message = "sku_code must be 1 to 10 characters"))]
    pub sku_code: String,
}

pub async fn create_attribute_value(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateAttributeValueRequest>,
) -> ApiResult<(StatusCode, Json<AttributeValue>)> {
    req.validate()?;
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM attributes WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    if exists.is_none() {
        return Err(ApiError::not_found("attribute not found"));
    }
    let value = sqlx::query_as::<_, AttributeValue>(
        "INSERT INTO attribute_values (id, attribute_id, value, sku_code) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(id)
    .bind(&req.value)
    .bind(&req.sku_code)
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(value)))
}
