use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    db::{
        models::{Order, OrderFilter, OrderStatus},
        orders as order_store,
    },
    error::AppError,
    handlers::identity::{Admin, Caller},
    services::{
        orders::{self, Customer, PlaceOrderRequest},
        tracking::{self, TrackingInfo},
    },
    state::AppState,
    utils::{Page, PageRequest},
};

#[derive(Deserialize, Debug, Default)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListOrdersQuery {
    fn status(&self) -> Result<Option<OrderStatus>, AppError> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<OrderStatus>().map_err(AppError::Validation))
            .transpose()
    }

    fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

fn orders_page(page: Page<Order>) -> serde_json::Value {
    json!({
        "orders": page.items,
        "total": page.total,
        "page": page.page,
        "per_page": page.per_page,
        "pages": page.pages,
    })
}

fn placed(order: Order) -> HttpResponse {
    HttpResponse::Created().json(json!({
        "message": "Order placed successfully",
        "order": order,
    }))
}

pub async fn place_order(
    caller: Caller,
    state: web::Data<AppState>,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let order = orders::place_order(
        &state.pool,
        Customer::Account(caller.user.id),
        body.into_inner(),
    )
    .await?;
    Ok(placed(order))
}

pub async fn place_guest_order(
    state: web::Data<AppState>,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let order = orders::place_order(&state.pool, Customer::Guest, body.into_inner()).await?;
    Ok(placed(order))
}

pub async fn list_my_orders(
    caller: Caller,
    state: web::Data<AppState>,
    query: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = OrderFilter {
        user_id: Some(caller.user.id),
        status: query.status()?,
    };
    let page = order_store::list_orders(&state.pool, &filter, query.page_request()).await?;
    Ok(HttpResponse::Ok().json(orders_page(page)))
}

pub async fn list_all_orders(
    _admin: Admin,
    state: web::Data<AppState>,
    query: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = OrderFilter {
        user_id: None,
        status: query.status()?,
    };
    let page = order_store::list_orders(&state.pool, &filter, query.page_request()).await?;
    Ok(HttpResponse::Ok().json(orders_page(page)))
}

pub async fn order_stats(
    _admin: Admin,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let stats = orders::order_stats(&state.pool).await?;
    Ok(HttpResponse::Ok().json(stats))
}

pub async fn get_order(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let order = order_store::get_order(&state.pool, path.into_inner()).await?;
    orders::ensure_can_view(&order, &caller.user)?;
    Ok(HttpResponse::Ok().json(json!({ "order": order })))
}

pub async fn track_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let order = tracking::track_by_order_number(&state.pool, &path).await?;
    let tracking = TrackingInfo::from(&order);
    Ok(HttpResponse::Ok().json(json!({
        "order": order,
        "tracking": tracking,
    })))
}

pub async fn track_order_by_id(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let info = tracking::track_by_id(&state.pool, path.into_inner(), &caller.user).await?;
    Ok(HttpResponse::Ok().json(info))
}

pub async fn update_order_status(
    admin: Admin,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<StatusUpdate>,
) -> Result<HttpResponse, AppError> {
    let order = orders::update_status(&state.pool, path.into_inner(), body.status.as_deref()).await?;
    log::info!(
        "Admin {} set order {} to {}",
        admin.0.user.id,
        order.order_number,
        order.status
    );
    Ok(HttpResponse::Ok().json(json!({
        "message": "Order status updated successfully",
        "order": order,
    })))
}

pub async fn cancel_order(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let order = orders::cancel_order(&state.pool, path.into_inner(), &caller.user).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Order cancelled successfully",
        "order": order,
    })))
}
