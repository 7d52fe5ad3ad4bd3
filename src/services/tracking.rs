use chrono::{DateTime, Utc};
use phf::phf_map;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    db::{
        models::{Order, User},
        orders,
    },
    error::AppError,
    services::orders::ensure_can_view,
    utils::{format_date, is_valid_order_number, normalize_order_number},
};

/// Customer-facing wording for raw status values. Includes legacy values that the
/// current status set no longer produces.
static STATUS_MESSAGES: phf::Map<&'static str, &'static str> = phf_map! {
    "Pending" => "Order is being processed",
    "In Transit" => "Out for delivery",
    "Out For Delivery" => "Out for delivery",
    "Delivered" => "Order delivered successfully",
};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TrackingInfo {
    pub order_id: i64,
    pub order_number: String,
    pub status: String,
    pub message: String,
    pub estimated_delivery: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
}

pub fn status_message(status: &str) -> String {
    STATUS_MESSAGES
        .get(status)
        .map(|m| m.to_string())
        .unwrap_or_else(|| format!("Status: {}", status))
}

impl From<&Order> for TrackingInfo {
    fn from(order: &Order) -> Self {
        let status = order.status.to_string();
        TrackingInfo {
            order_id: order.id,
            order_number: order.order_number.clone(),
            message: status_message(&status),
            status,
            estimated_delivery: order.estimated_delivery.map(format_date),
            delivered_at: order.delivered_at,
        }
    }
}

/// Public lookup by order number, case-insensitive.
pub async fn track_by_order_number(pool: &SqlitePool, order_number: &str) -> Result<Order, AppError> {
    let normalized = normalize_order_number(order_number);
    if !is_valid_order_number(&normalized) {
        return Err(AppError::NotFound("Order not found".to_string()));
    }
    orders::find_by_order_number(pool, &normalized)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

/// Lookup by internal id; only the owner or an administrator may see it.
pub async fn track_by_id(pool: &SqlitePool, order_id: i64, user: &User) -> Result<TrackingInfo, AppError> {
    let order = orders::get_order(pool, order_id).await?;
    ensure_can_view(&order, user)?;
    Ok(TrackingInfo::from(&order))
}
