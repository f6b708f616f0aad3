//! Staff endpoints. Every handler takes [`AdminSession`], so role checks
//! live in the extractor, not here.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use crate::auth::AdminSession;
use crate::domain::{
    Category, CustomerQuestion, LoginLog, Order, OrderSearchCriteria, Product, Testimonial, User,
};
use crate::error::{Result, ShopError};
use crate::http::dto::{
    AnswerQuestionRequest, CategoryPayload, LoginLogQuery, ProductListQuery, ProductPayload,
    QuestionListQuery, SetOrderVisibilityRequest, SetProductVisibilityRequest, SetPublishedRequest,
    SetSuspicionRequest, UpdateOrderStatusRequest, UploadVouchersRequest, UploadVouchersResponse,
};
use crate::server::AppState;
use crate::services::catalog::StockSummary;

// Categories

pub async fn list_categories(
    State(state): State<AppState>,
    _session: AdminSession,
) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.catalog.admin_categories().await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    _session: AdminSession,
    Json(payload): Json<CategoryPayload>,
) -> Result<(StatusCode, Json<Category>)> {
    payload.validate()?;
    let category = Category {
        id: None,
        name: payload.name,
        slug: payload.slug,
        sort_order: payload.sort_order,
        is_removed: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let category = state.catalog.create_category(category).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryPayload>,
) -> Result<Json<Category>> {
    payload.validate()?;
    let mut category = state
        .storage
        .get_category_by_id(id)
        .await?
        .filter(|c| !c.is_removed)
        .ok_or(ShopError::CategoryNotFound)?;
    category.name = payload.name;
    category.slug = payload.slug;
    category.sort_order = payload.sort_order;
    Ok(Json(state.catalog.update_category(category).await?))
}

pub async fn remove_category(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.catalog.remove_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Products

pub async fn list_products(
    State(state): State<AppState>,
    _session: AdminSession,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog.admin_products(query.category_id).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    _session: AdminSession,
    Json(payload): Json<ProductPayload>,
) -> Result<(StatusCode, Json<Product>)> {
    payload.validate()?;
    let product = Product {
        id: None,
        category_id: payload.category_id,
        name: payload.name,
        slug: payload.slug,
        description: payload.description,
        face_value: payload.face_value,
        price: payload.price,
        currency: payload.currency,
        image_url: payload.image_url,
        show_product: payload.show_product,
        is_removed: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let product = state.catalog.create_product(product).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<Product>> {
    payload.validate()?;
    let mut product = state
        .storage
        .get_product_by_id(id)
        .await?
        .filter(|p| !p.is_removed)
        .ok_or(ShopError::ProductNotFound)?;
    product.category_id = payload.category_id;
    product.name = payload.name;
    product.slug = payload.slug;
    product.description = payload.description;
    product.face_value = payload.face_value;
    product.price = payload.price;
    product.currency = payload.currency;
    product.image_url = payload.image_url;
    product.show_product = payload.show_product;
    Ok(Json(state.catalog.update_product(product).await?))
}

pub async fn set_product_visibility(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
    Json(request): Json<SetProductVisibilityRequest>,
) -> Result<Json<Product>> {
    Ok(Json(
        state.catalog.set_product_visibility(id, request.show).await?,
    ))
}

pub async fn remove_product(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.catalog.remove_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_vouchers(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
    Json(request): Json<UploadVouchersRequest>,
) -> Result<(StatusCode, Json<UploadVouchersResponse>)> {
    request.validate()?;
    let added = state.catalog.upload_vouchers(id, request.codes).await?;
    Ok((StatusCode::CREATED, Json(UploadVouchersResponse { added })))
}

pub async fn product_stock(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Json<StockSummary>> {
    Ok(Json(state.catalog.stock_summary(id).await?))
}

// Orders

pub async fn search_orders(
    State(state): State<AppState>,
    _session: AdminSession,
    Json(criteria): Json<OrderSearchCriteria>,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders.search(&criteria).await?))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>> {
    Ok(Json(state.orders.update_status(id, request.status).await?))
}

pub async fn set_order_visibility(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
    Json(request): Json<SetOrderVisibilityRequest>,
) -> Result<StatusCode> {
    state.orders.set_visibility(id, request.visibility).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_order_suspicion(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
    Json(request): Json<SetSuspicionRequest>,
) -> Result<StatusCode> {
    state.orders.set_suspicion(id, request.suspicious).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_order(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.orders.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Users

pub async fn list_users(
    State(state): State<AppState>,
    _session: AdminSession,
) -> Result<Json<Vec<User>>> {
    Ok(Json(state.users.list_users().await?))
}

pub async fn remove_user(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.users.remove_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Questions

pub async fn list_questions(
    State(state): State<AppState>,
    _session: AdminSession,
    Query(query): Query<QuestionListQuery>,
) -> Result<Json<Vec<CustomerQuestion>>> {
    Ok(Json(state.support.questions_by_status(query.status).await?))
}

pub async fn answer_question(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
    Json(request): Json<AnswerQuestionRequest>,
) -> Result<Json<CustomerQuestion>> {
    request.validate()?;
    Ok(Json(state.support.answer_question(id, request.answer).await?))
}

pub async fn remove_question(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.support.remove_question(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Testimonials

pub async fn list_testimonials(
    State(state): State<AppState>,
    _session: AdminSession,
) -> Result<Json<Vec<Testimonial>>> {
    Ok(Json(state.support.admin_testimonials().await?))
}

pub async fn set_testimonial_published(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
    Json(request): Json<SetPublishedRequest>,
) -> Result<Json<Testimonial>> {
    Ok(Json(
        state
            .support
            .set_testimonial_published(id, request.published)
            .await?,
    ))
}

pub async fn remove_testimonial(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.support.remove_testimonial(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Operations

pub async fn login_logs(
    State(state): State<AppState>,
    _session: AdminSession,
    Query(query): Query<LoginLogQuery>,
) -> Result<Json<Vec<LoginLog>>> {
    Ok(Json(
        state.storage.list_recent_login_logs(query.limit).await?,
    ))
}

pub async fn object_storage_health(
    State(state): State<AppState>,
    _session: AdminSession,
) -> Result<Json<serde_json::Value>> {
    let health = state.object_storage.health().await?;
    Ok(Json(serde_json::json!({ "healthy": health.healthy })))
}
