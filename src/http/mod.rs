pub mod auth;
pub mod cart;
pub mod categories;
pub mod orders;
pub mod products;

use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/products", get(products::list_products).post(products::create_product))
        .route(
            "/api/v1/products/:id",
            get(products::get_product).put(products::update_product).delete(products::delete_product),
        )
        .route(
            "/api/v1/products/:id/variants",
            get(products::list_variants).post(products::create_variant),
        )
        .route("/api/v1/attributes", get(products::list_attributes).post(products::create_attribute))
        .route(
            "/api/v1/attributes/:id/values",
            get(products::list_attribute_values).post(products::create_attribute_value),
        )
        .route("/api/v1/categories", get(categories::list_categories).post(categories::create_category))
        .route("/api/v1/categories/:id", get(categories::get_category))
        .route("/api/v1/cart", get(cart::get_cart))
        .route("/api/v1/cart/add-item", post(cart::add_item))
        .route("/api/v1/cart/update-quantity", post(cart::update_quantity))
        .route("/api/v1/cart/remove-item", post(cart::remove_item))
        .route("/api/v1/cart/clear", post(cart::clear_cart))
        .route("/api/v1/orders", get(orders::list_orders))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/api/v1/orders/checkout", post(orders::checkout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "mercadito" }))
}
