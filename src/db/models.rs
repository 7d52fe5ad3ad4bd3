use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Medicine {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub description: String,
    pub dosage: Option<String>,
    pub side_effects: Option<String>,
    pub manufacturer: Option<String>,
    pub price_cents: i64,
    pub stock: i64,
    pub requires_prescription: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct NewMedicine {
    pub name: String,
    pub category: String,
    pub description: String,
    pub price_cents: i64,
    pub stock: i64,
    #[serde(default)]
    pub requires_prescription: bool,
    pub dosage: Option<String>,
    pub side_effects: Option<String>,
    pub manufacturer: Option<String>,
    pub image_url: Option<String>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct MedicinePatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub stock: Option<i64>,
    pub requires_prescription: Option<bool>,
    pub dosage: Option<String>,
    pub side_effects: Option<String>,
    pub manufacturer: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct MedicineFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub requires_prescription: Option<bool>,
}

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Processing,
    Confirmed,
    #[sqlx(rename = "In Transit")]
    #[serde(rename = "In Transit")]
    InTransit,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Confirmed,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::InTransit => "In Transit",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let allowed: Vec<&str> = OrderStatus::ALL.iter().map(|s| s.as_str()).collect();
                format!("Invalid status. Must be one of: {}", allowed.join(", "))
            })
    }
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub user_id: Option<i64>,
    pub medicine_id: i64,
    pub medicine_name: String,
    pub quantity: i64,
    pub total_price_cents: i64,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub city: String,
    pub phone: String,
    pub customer_name: Option<String>,
    pub pharmacy_name: Option<String>,
    pub payment_method: String,
    pub notes: Option<String>,
    pub prescription_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Row about to be inserted; the order number is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Option<i64>,
    pub medicine_id: i64,
    pub medicine_name: String,
    pub quantity: i64,
    pub total_price_cents: i64,
    pub delivery_address: String,
    pub city: String,
    pub phone: String,
    pub customer_name: Option<String>,
    pub pharmacy_name: Option<String>,
    pub payment_method: String,
    pub notes: Option<String>,
    pub prescription_url: Option<String>,
    pub estimated_delivery: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<i64>,
    pub status: Option<OrderStatus>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OrderStats {
    pub total_orders: i64,
    pub pending: i64,
    pub processing: i64,
    pub confirmed: i64,
    pub in_transit: i64,
    pub delivered: i64,
    pub cancelled: i64,
    pub total_revenue_cents: i64,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub is_admin: bool,
}
