//! Order placement, cancellation and status progression.
//!
//! Stock changes and order rows are always written in the same transaction.

use chrono::{Duration, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    db::{
        medicines,
        models::{NewOrder, Order, OrderStats, OrderStatus, User},
        orders,
    },
    error::AppError,
    utils::{generate_order_number, non_blank},
};

pub const ESTIMATED_DELIVERY_DAYS: i64 = 3;
pub const DEFAULT_PAYMENT_METHOD: &str = "Cash on Delivery";

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PlaceOrderRequest {
    pub medicine_id: Option<i64>,
    pub quantity: Option<i64>,
    pub delivery_address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub customer_name: Option<String>,
    pub pharmacy_name: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub prescription_url: Option<String>,
}

/// Who the order is placed for: a signed-in account or an anonymous guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Customer {
    Account(i64),
    Guest,
}

impl Customer {
    fn user_id(&self) -> Option<i64> {
        match self {
            Customer::Account(id) => Some(*id),
            Customer::Guest => None,
        }
    }
}

fn require(value: Option<&str>, field: &str) -> Result<String, AppError> {
    non_blank(value).ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

pub async fn place_order(
    pool: &SqlitePool,
    customer: Customer,
    request: PlaceOrderRequest,
) -> Result<Order, AppError> {
    let medicine_id = request
        .medicine_id
        .ok_or_else(|| AppError::Validation("medicine_id is required".to_string()))?;
    let quantity = request
        .quantity
        .ok_or_else(|| AppError::Validation("quantity is required".to_string()))?;
    let delivery_address = require(request.delivery_address.as_deref(), "delivery_address")?;
    let city = require(request.city.as_deref(), "city")?;
    let phone = require(request.phone.as_deref(), "phone")?;
    let customer_name = match customer {
        Customer::Guest => Some(require(request.customer_name.as_deref(), "customer_name")?),
        Customer::Account(_) => non_blank(request.customer_name.as_deref()),
    };

    let medicine = medicines::get_medicine(pool, medicine_id).await?;

    if quantity <= 0 {
        return Err(AppError::Validation(
            "Quantity must be greater than 0".to_string(),
        ));
    }

    let prescription_url = non_blank(request.prescription_url.as_deref());
    if medicine.requires_prescription && prescription_url.is_none() {
        return Err(AppError::Validation(
            "Prescription is required for this medicine".to_string(),
        ));
    }

    if medicine.stock < quantity {
        log::warn!(
            "Rejected order for medicine {}: requested {}, available {}",
            medicine.id,
            quantity,
            medicine.stock
        );
        return Err(AppError::InsufficientStock {
            available: medicine.stock,
        });
    }

    let mut tx = pool.begin().await?;

    // The price is taken from the row the decrement returned, not the earlier read.
    let reserved = medicines::decrement_stock(&mut tx, medicine_id, quantity).await?;
    let total_price_cents = reserved
        .price_cents
        .checked_mul(quantity)
        .ok_or_else(|| AppError::Validation("Order total is too large".to_string()))?;

    let new = NewOrder {
        user_id: customer.user_id(),
        medicine_id: reserved.id,
        medicine_name: reserved.name.clone(),
        quantity,
        total_price_cents,
        delivery_address,
        city,
        phone,
        customer_name,
        pharmacy_name: non_blank(request.pharmacy_name.as_deref()),
        payment_method: non_blank(request.payment_method.as_deref())
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
        notes: non_blank(request.notes.as_deref()),
        prescription_url,
        estimated_delivery: Utc::now() + Duration::days(ESTIMATED_DELIVERY_DAYS),
    };
    let order = orders::insert_order(&mut tx, &new, generate_order_number).await?;

    tx.commit().await?;

    log::info!(
        "Placed order {} for {} x {} (stock now {})",
        order.order_number,
        order.quantity,
        order.medicine_name,
        reserved.stock
    );
    Ok(order)
}

/// Cancels a pending order owned by `user` and puts its units back into stock.
pub async fn cancel_order(pool: &SqlitePool, order_id: i64, user: &User) -> Result<Order, AppError> {
    let order = orders::get_order(pool, order_id).await?;

    if order.user_id != Some(user.id) {
        return Err(AppError::Forbidden(
            "Unauthorized to cancel this order".to_string(),
        ));
    }
    if order.status != OrderStatus::Pending {
        return Err(AppError::InvalidState(
            "Only pending orders can be cancelled".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let cancelled = orders::transition_status(
        &mut *tx,
        order.id,
        OrderStatus::Pending,
        OrderStatus::Cancelled,
    )
    .await?
    .ok_or_else(|| {
        AppError::InvalidState("Only pending orders can be cancelled".to_string())
    })?;

    let restored = medicines::increment_stock(&mut tx, order.medicine_id, order.quantity).await?;
    if restored.is_none() {
        log::warn!(
            "Medicine {} no longer exists; stock for order {} not restored",
            order.medicine_id,
            order.order_number
        );
    }

    tx.commit().await?;

    log::info!("Cancelled order {}", cancelled.order_number);
    Ok(cancelled)
}

/// Admin status change. Any status may follow any other; see `orders::set_status`
/// for the `delivered_at` rule.
pub async fn update_status(
    pool: &SqlitePool,
    order_id: i64,
    new_status: Option<&str>,
) -> Result<Order, AppError> {
    let raw = new_status
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("Status is required".to_string()))?;
    let status: OrderStatus = raw.parse().map_err(AppError::Validation)?;

    let order = orders::set_status(pool, order_id, status).await?;
    log::info!("Order {} moved to {}", order.order_number, order.status);
    Ok(order)
}

/// An order is visible to its owner and to administrators.
pub fn ensure_can_view(order: &Order, user: &User) -> Result<(), AppError> {
    if user.is_admin || order.user_id == Some(user.id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Unauthorized access to this order".to_string(),
        ))
    }
}

pub async fn order_stats(pool: &SqlitePool) -> Result<OrderStats, AppError> {
    let (counts, revenue) = futures::try_join!(
        orders::count_by_status(pool),
        orders::delivered_revenue(pool)
    )?;
    Ok(orders::build_stats(&counts, revenue))
}
