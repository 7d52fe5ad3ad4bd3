use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::error::AppError;

pub mod auth;
pub mod identity;
pub mod inventory;
pub mod order;

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Welcome to Medi-Reach API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "healthy" }))
}

/// Malformed bodies, query strings and path segments all surface as `{"error": ...}` 400s.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Invalid request body: {}", err)).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Invalid query string: {}", err)).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Invalid path: {}", err)).into()
    }));
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    extractor_configs(cfg);

    cfg.route("/", web::get().to(index))
        .route("/health", web::get().to(health))
        .route("/signup", web::post().to(auth::signup))
        .route("/login", web::post().to(auth::login))
        .route("/logout", web::post().to(auth::logout))
        .route("/me", web::get().to(auth::me))
        .service(
            web::scope("/medicines")
                .route("", web::get().to(inventory::list_medicines))
                .route("", web::post().to(inventory::create_medicine))
                .route("/categories", web::get().to(inventory::list_categories))
                .route("/{id}", web::get().to(inventory::get_medicine))
                .route("/{id}", web::put().to(inventory::update_medicine))
                .route("/{id}", web::delete().to(inventory::delete_medicine)),
        )
        // Fixed segments are registered before `/{id}` so they win the match.
        .service(
            web::scope("/orders")
                .route("", web::get().to(order::list_my_orders))
                .route("", web::post().to(order::place_order))
                .route("/guest", web::post().to(order::place_guest_order))
                .route("/all", web::get().to(order::list_all_orders))
                .route("/stats", web::get().to(order::order_stats))
                .route("/track/{order_number}", web::get().to(order::track_order))
                .route("/{id}", web::get().to(order::get_order))
                .route("/{id}", web::delete().to(order::cancel_order))
                .route("/{id}/status", web::put().to(order::update_order_status))
                .route("/{id}/tracking", web::get().to(order::track_order_by_id)),
        );
}
