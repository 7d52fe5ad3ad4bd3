//! Catalog store.

use chrono::Utc;
use sqlx::{Executor, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db::models::{Medicine, MedicineFilter, MedicinePatch, NewMedicine},
    error::AppError,
    utils::{Page, PageRequest},
};

fn validate_price(price_cents: i64) -> Result<(), AppError> {
    if price_cents <= 0 {
        return Err(AppError::Validation(
            "Price must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_stock(stock: i64) -> Result<(), AppError> {
    if stock < 0 {
        return Err(AppError::Validation("Stock cannot be negative".to_string()));
    }
    Ok(())
}

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// `%term%` for `LIKE ... ESCAPE '\'`, with wildcards in the term matched literally.
///
/// SQLite's `LOWER` only folds ASCII, so the term is folded the same way.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.trim().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c.to_ascii_lowercase());
    }
    pattern.push('%');
    pattern
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &MedicineFilter) {
    if let Some(category) = filter.category.as_deref().filter(|c| !c.trim().is_empty()) {
        qb.push(" AND LOWER(category) LIKE ")
            .push_bind(contains_pattern(category))
            .push(" ESCAPE '\\'");
    }

    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = contains_pattern(search);
        qb.push(" AND (LOWER(name) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR LOWER(description) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    if let Some(requires_prescription) = filter.requires_prescription {
        qb.push(" AND requires_prescription = ")
            .push_bind(requires_prescription);
    }
}

pub async fn list_medicines<'e, E>(
    executor: E,
    filter: &MedicineFilter,
    page: PageRequest,
) -> Result<Page<Medicine>, AppError>
where
    E: Executor<'e, Database = Sqlite> + Copy,
{
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM medicines WHERE 1 = 1");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(executor).await?;

    let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM medicines WHERE 1 = 1");
    push_filters(&mut select, filter);
    select
        .push(" ORDER BY name ASC, id ASC LIMIT ")
        .push_bind(page.per_page())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let medicines = select
        .build_query_as::<Medicine>()
        .fetch_all(executor)
        .await?;

    Ok(Page::new(medicines, total, page))
}

pub async fn find_medicine<'e, E>(executor: E, id: i64) -> Result<Option<Medicine>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let medicine = sqlx::query_as::<_, Medicine>("SELECT * FROM medicines WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(medicine)
}

pub async fn get_medicine<'e, E>(executor: E, id: i64) -> Result<Medicine, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    find_medicine(executor, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Medicine not found".to_string()))
}

pub async fn list_categories<'e, E>(executor: E) -> Result<Vec<String>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let categories = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT category FROM medicines WHERE TRIM(category) <> '' ORDER BY category ASC",
    )
    .fetch_all(executor)
    .await?;
    Ok(categories)
}

pub async fn create_medicine<'e, E>(executor: E, new: &NewMedicine) -> Result<Medicine, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let name = required(&new.name, "name")?;
    let category = required(&new.category, "category")?;
    let description = required(&new.description, "description")?;
    validate_price(new.price_cents)?;
    validate_stock(new.stock)?;

    let now = Utc::now();
    let medicine = sqlx::query_as::<_, Medicine>(
        "INSERT INTO medicines (name, category, description, dosage, side_effects, manufacturer, \
         price_cents, stock, requires_prescription, image_url, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11) RETURNING *",
    )
    .bind(name)
    .bind(category)
    .bind(description)
    .bind(&new.dosage)
    .bind(&new.side_effects)
    .bind(&new.manufacturer)
    .bind(new.price_cents)
    .bind(new.stock)
    .bind(new.requires_prescription)
    .bind(&new.image_url)
    .bind(now)
    .fetch_one(executor)
    .await?;

    log::info!("Created medicine {} ({})", medicine.id, medicine.name);
    Ok(medicine)
}

pub async fn update_medicine<'e, E>(
    executor: E,
    id: i64,
    patch: &MedicinePatch,
) -> Result<Medicine, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let name = patch.name.as_deref().map(|v| required(v, "name")).transpose()?;
    let category = patch
        .category
        .as_deref()
        .map(|v| required(v, "category"))
        .transpose()?;
    let description = patch
        .description
        .as_deref()
        .map(|v| required(v, "description"))
        .transpose()?;
    if let Some(price_cents) = patch.price_cents {
        validate_price(price_cents)?;
    }
    if let Some(stock) = patch.stock {
        validate_stock(stock)?;
    }

    let medicine = sqlx::query_as::<_, Medicine>(
        "UPDATE medicines SET \
         name = COALESCE($1, name), \
         category = COALESCE($2, category), \
         description = COALESCE($3, description), \
         price_cents = COALESCE($4, price_cents), \
         stock = COALESCE($5, stock), \
         requires_prescription = COALESCE($6, requires_prescription), \
         dosage = COALESCE($7, dosage), \
         side_effects = COALESCE($8, side_effects), \
         manufacturer = COALESCE($9, manufacturer), \
         image_url = COALESCE($10, image_url), \
         updated_at = $11 \
         WHERE id = $12 RETURNING *",
    )
    .bind(name)
    .bind(category)
    .bind(description)
    .bind(patch.price_cents)
    .bind(patch.stock)
    .bind(patch.requires_prescription)
    .bind(&patch.dosage)
    .bind(&patch.side_effects)
    .bind(&patch.manufacturer)
    .bind(&patch.image_url)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound("Medicine not found".to_string()))?;

    log::info!("Updated medicine {}", medicine.id);
    Ok(medicine)
}

pub async fn delete_medicine<'e, E>(executor: E, id: i64) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM medicines WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Medicine not found".to_string()));
    }

    log::info!("Deleted medicine {}", id);
    Ok(())
}

/// Takes `amount` units out of stock in one conditional statement, so two concurrent
/// callers can never both consume the last unit.
pub async fn decrement_stock(
    conn: &mut SqliteConnection,
    id: i64,
    amount: i64,
) -> Result<Medicine, AppError> {
    if amount <= 0 {
        return Err(AppError::Validation(
            "Quantity must be greater than 0".to_string(),
        ));
    }

    let updated = sqlx::query_as::<_, Medicine>(
        "UPDATE medicines SET stock = stock - $1, updated_at = $2 \
         WHERE id = $3 AND stock >= $1 RETURNING *",
    )
    .bind(amount)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match updated {
        Some(medicine) => Ok(medicine),
        None => {
            let current = get_medicine(&mut *conn, id).await?;
            Err(AppError::InsufficientStock {
                available: current.stock,
            })
        }
    }
}

/// Puts units back into stock. Returns `None` when the medicine no longer exists.
pub async fn increment_stock(
    conn: &mut SqliteConnection,
    id: i64,
    amount: i64,
) -> Result<Option<Medicine>, AppError> {
    if amount <= 0 {
        return Err(AppError::Validation(
            "Quantity must be greater than 0".to_string(),
        ));
    }

    let medicine = sqlx::query_as::<_, Medicine>(
        "UPDATE medicines SET stock = stock + $1, updated_at = $2 WHERE id = $3 RETURNING *",
    )
    .bind(amount)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(medicine)
}

#[cfg(test)]
pub(crate) fn sample_medicine(name: &str, price_cents: i64, stock: i64) -> NewMedicine {
    NewMedicine {
        name: name.to_string(),
        category: "Analgesic".to_string(),
        description: format!("{} tablets", name),
        price_cents,
        stock,
        ..NewMedicine::default()
    }
}
