//! Order store.

use chrono::Utc;
use sqlx::{Executor, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db::models::{NewOrder, Order, OrderFilter, OrderStats, OrderStatus},
    error::AppError,
    utils::{Page, PageRequest},
};

/// Attempts at finding an unused order number before giving up.
pub const ORDER_NUMBER_ATTEMPTS: usize = 5;

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

async fn insert_with_number(
    conn: &mut SqliteConnection,
    order_number: &str,
    new: &NewOrder,
) -> Result<Order, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, Order>(
        "INSERT INTO orders (order_number, user_id, medicine_id, medicine_name, quantity, \
         total_price_cents, status, delivery_address, city, phone, customer_name, pharmacy_name, \
         payment_method, notes, prescription_url, created_at, updated_at, estimated_delivery) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16, $17) \
         RETURNING *",
    )
    .bind(order_number)
    .bind(new.user_id)
    .bind(new.medicine_id)
    .bind(&new.medicine_name)
    .bind(new.quantity)
    .bind(new.total_price_cents)
    .bind(OrderStatus::Pending)
    .bind(&new.delivery_address)
    .bind(&new.city)
    .bind(&new.phone)
    .bind(&new.customer_name)
    .bind(&new.pharmacy_name)
    .bind(&new.payment_method)
    .bind(&new.notes)
    .bind(&new.prescription_url)
    .bind(now)
    .bind(new.estimated_delivery)
    .fetch_one(conn)
    .await
}

/// Inserts a `Pending` order under a fresh order number drawn from `next_number`.
///
/// A collision on the unique order number is retried with the next candidate. SQLite
/// rolls back only the failed statement, so the surrounding transaction stays usable.
pub async fn insert_order<F>(
    conn: &mut SqliteConnection,
    new: &NewOrder,
    mut next_number: F,
) -> Result<Order, AppError>
where
    F: FnMut() -> String,
{
    for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
        let order_number = next_number();
        match insert_with_number(&mut *conn, &order_number, new).await {
            Ok(order) => return Ok(order),
            Err(e) if is_unique_violation(&e) => {
                log::warn!(
                    "Order number {} already taken (attempt {}/{})",
                    order_number,
                    attempt,
                    ORDER_NUMBER_ATTEMPTS
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Conflict(
        "Could not allocate a unique order number".to_string(),
    ))
}

pub async fn find_order<'e, E>(executor: E, id: i64) -> Result<Option<Order>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(order)
}

pub async fn get_order<'e, E>(executor: E, id: i64) -> Result<Order, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    find_order(executor, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

/// Exact match; callers normalise the number first.
pub async fn find_by_order_number<'e, E>(
    executor: E,
    order_number: &str,
) -> Result<Option<Order>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_number)
        .fetch_optional(executor)
        .await?;
    Ok(order)
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &OrderFilter) {
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
}

/// Newest first.
pub async fn list_orders<'e, E>(
    executor: E,
    filter: &OrderFilter,
    page: PageRequest,
) -> Result<Page<Order>, AppError>
where
    E: Executor<'e, Database = Sqlite> + Copy,
{
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM orders WHERE 1 = 1");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(executor).await?;

    let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM orders WHERE 1 = 1");
    push_filters(&mut select, filter);
    select
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(page.per_page())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let orders = select.build_query_as::<Order>().fetch_all(executor).await?;

    Ok(Page::new(orders, total, page))
}

/// Sets the status. The first transition to `Delivered` stamps `delivered_at`; later ones
/// keep the original stamp.
pub async fn set_status<'e, E>(
    executor: E,
    id: i64,
    status: OrderStatus,
) -> Result<Order, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $1, updated_at = $2, \
         delivered_at = CASE WHEN $1 = 'Delivered' AND delivered_at IS NULL THEN $2 ELSE delivered_at END \
         WHERE id = $3 RETURNING *",
    )
    .bind(status)
    .bind(now)
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    Ok(order)
}

/// Moves the order from `from` to `to` only if it is still in `from`.
/// Returns `None` when another writer changed the status first.
pub async fn transition_status<'e, E>(
    executor: E,
    id: i64,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<Option<Order>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4 RETURNING *",
    )
    .bind(to)
    .bind(Utc::now())
    .bind(id)
    .bind(from)
    .fetch_optional(executor)
    .await?;

    Ok(order)
}

pub async fn count_by_status<'e, E>(executor: E) -> Result<Vec<(OrderStatus, i64)>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, (OrderStatus, i64)>(
        "SELECT status, COUNT(*) FROM orders GROUP BY status",
    )
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

pub async fn delivered_revenue<'e, E>(executor: E) -> Result<i64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let revenue: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(total_price_cents), 0) FROM orders WHERE status = $1",
    )
    .bind(OrderStatus::Delivered)
    .fetch_one(executor)
    .await?;
    Ok(revenue)
}

pub fn build_stats(counts: &[(OrderStatus, i64)], total_revenue_cents: i64) -> OrderStats {
    let count_of = |wanted: OrderStatus| {
        counts
            .iter()
            .find(|(status, _)| *status == wanted)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    };

    OrderStats {
        total_orders: counts.iter().map(|(_, n)| n).sum(),
        pending: count_of(OrderStatus::Pending),
        processing: count_of(OrderStatus::Processing),
        confirmed: count_of(OrderStatus::Confirmed),
        in_transit: count_of(OrderStatus::InTransit),
        delivered: count_of(OrderStatus::Delivered),
        cancelled: count_of(OrderStatus::Cancelled),
        total_revenue_cents,
    }
}

#[cfg(test)]
pub(crate) fn sample_order(medicine_id: i64, user_id: Option<i64>) -> NewOrder {
    NewOrder {
        user_id,
        medicine_id,
        medicine_name: "Paracetamol 500mg".to_string(),
        quantity: 2,
        total_price_cents: 500,
        delivery_address: "12 Marina Road".to_string(),
        city: "Lagos".to_string(),
        phone: "+2348000000000".to_string(),
        customer_name: None,
        pharmacy_name: None,
        payment_method: "Cash on Delivery".to_string(),
        notes: None,
        prescription_url: None,
        estimated_delivery: Utc::now() + chrono::Duration::days(3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn fixed(numbers: &[&str]) -> impl FnMut() -> String {
        let mut numbers: Vec<String> = numbers.iter().rev().map(|n| n.to_string()).collect();
        move || numbers.pop().expect("ran out of order numbers")
    }

    #[tokio::test]
    async fn insert_retries_on_order_number_collision() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let first = insert_order(&mut conn, &sample_order(1, None), fixed(&["ORD-AAAAAA"]))
            .await
            .unwrap();
        assert_eq!(first.order_number, "ORD-AAAAAA");
        assert_eq!(first.status, OrderStatus::Pending);

        let second = insert_order(
            &mut conn,
            &sample_order(1, None),
            fixed(&["ORD-AAAAAA", "ORD-BBBBBB"]),
        )
        .await
        .unwrap();
        assert_eq!(second.order_number, "ORD-BBBBBB");
    }

    #[tokio::test]
    async fn insert_gives_up_after_repeated_collisions() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        insert_order(&mut conn, &sample_order(1, None), fixed(&["ORD-AAAAAA"]))
            .await
            .unwrap();

        let err = insert_order(&mut conn, &sample_order(1, None), || {
            "ORD-AAAAAA".to_string()
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn delivered_at_is_stamped_once() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let order = insert_order(&mut conn, &sample_order(1, None), fixed(&["ORD-CCCCCC"]))
            .await
            .unwrap();
        drop(conn);
        assert!(order.delivered_at.is_none());

        let delivered = set_status(&pool, order.id, OrderStatus::Delivered)
            .await
            .unwrap();
        let stamp = delivered.delivered_at.expect("delivered_at set");

        let again = set_status(&pool, order.id, OrderStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(again.delivered_at, Some(stamp));

        let reopened = set_status(&pool, order.id, OrderStatus::Processing)
            .await
            .unwrap();
        assert_eq!(reopened.status, OrderStatus::Processing);
        assert_eq!(reopened.delivered_at, Some(stamp));
    }

    #[tokio::test]
    async fn transition_only_applies_from_expected_status() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let order = insert_order(&mut conn, &sample_order(1, None), fixed(&["ORD-DDDDDD"]))
            .await
            .unwrap();
        drop(conn);

        let moved = transition_status(&pool, order.id, OrderStatus::Pending, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(moved.map(|o| o.status), Some(OrderStatus::Cancelled));

        let stale =
            transition_status(&pool, order.id, OrderStatus::Pending, OrderStatus::Cancelled)
                .await
                .unwrap();
        assert!(stale.is_none());
    }

    #[tokio::test]
    async fn list_filters_by_owner_and_status() {
        let pool = test_pool().await;
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, is_admin, created_at) \
             VALUES (7, 'amina', 'amina@example.com', 'x', 0, $1)",
        )
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let mine = insert_order(&mut conn, &sample_order(1, Some(7)), fixed(&["ORD-EEEEEE"]))
            .await
            .unwrap();
        insert_order(&mut conn, &sample_order(1, None), fixed(&["ORD-FFFFFF"]))
            .await
            .unwrap();
        drop(conn);
        set_status(&pool, mine.id, OrderStatus::Confirmed)
            .await
            .unwrap();

        let filter = OrderFilter {
            user_id: Some(7),
            status: None,
        };
        let page = list_orders(&pool, &filter, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].order_number, "ORD-EEEEEE");

        let filter = OrderFilter {
            user_id: None,
            status: Some(OrderStatus::Pending),
        };
        let page = list_orders(&pool, &filter, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].order_number, "ORD-FFFFFF");
    }

    #[tokio::test]
    async fn stats_count_statuses_and_delivered_revenue() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let a = insert_order(&mut conn, &sample_order(1, None), fixed(&["ORD-G00001"]))
            .await
            .unwrap();
        let b = insert_order(&mut conn, &sample_order(1, None), fixed(&["ORD-G00002"]))
            .await
            .unwrap();
        insert_order(&mut conn, &sample_order(1, None), fixed(&["ORD-G00003"]))
            .await
            .unwrap();
        drop(conn);
        set_status(&pool, a.id, OrderStatus::Delivered).await.unwrap();
        set_status(&pool, b.id, OrderStatus::InTransit).await.unwrap();

        let counts = count_by_status(&pool).await.unwrap();
        let revenue = delivered_revenue(&pool).await.unwrap();
        let stats = build_stats(&counts, revenue);

        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.in_transit, 1);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.cancelled, 0);
        assert_eq!(stats.total_revenue_cents, 500);
    }
}
