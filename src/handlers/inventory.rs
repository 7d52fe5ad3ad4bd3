use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    db::{
        medicines,
        models::{MedicineFilter, MedicinePatch, NewMedicine},
    },
    error::AppError,
    handlers::identity::Admin,
    state::AppState,
    utils::PageRequest,
};

#[derive(Deserialize, Debug, Default)]
pub struct ListMedicinesQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub requires_prescription: Option<String>,
}

pub async fn list_medicines(
    state: web::Data<AppState>,
    query: web::Query<ListMedicinesQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let filter = MedicineFilter {
        category: query.category,
        search: query.search,
        requires_prescription: query
            .requires_prescription
            .map(|v| v.trim().eq_ignore_ascii_case("true")),
    };
    let page_request = PageRequest {
        page: query.page,
        per_page: query.per_page,
    };

    let page = medicines::list_medicines(&state.pool, &filter, page_request).await?;
    log::debug!("Listing {} of {} medicines", page.items.len(), page.total);

    Ok(HttpResponse::Ok().json(json!({
        "medicines": page.items,
        "total": page.total,
        "page": page.page,
        "per_page": page.per_page,
        "pages": page.pages,
    })))
}

pub async fn list_categories(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let categories = medicines::list_categories(&state.pool).await?;
    Ok(HttpResponse::Ok().json(json!({ "categories": categories })))
}

pub async fn get_medicine(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let medicine = medicines::get_medicine(&state.pool, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "medicine": medicine })))
}

pub async fn create_medicine(
    _admin: Admin,
    state: web::Data<AppState>,
    body: web::Json<NewMedicine>,
) -> Result<HttpResponse, AppError> {
    let medicine = medicines::create_medicine(&state.pool, &body).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Medicine created successfully",
        "medicine": medicine,
    })))
}

pub async fn update_medicine(
    _admin: Admin,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<MedicinePatch>,
) -> Result<HttpResponse, AppError> {
    let medicine = medicines::update_medicine(&state.pool, path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Medicine updated successfully",
        "medicine": medicine,
    })))
}

pub async fn delete_medicine(
    _admin: Admin,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    medicines::delete_medicine(&state.pool, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Medicine deleted successfully" })))
}
