//! Anonymous storefront endpoints.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use crate::auth::AuthSession;
use crate::domain::{Category, CustomerQuestion, Product, Testimonial};
use crate::error::Result;
use crate::http::dto::{ProductDetailResponse, SubmitQuestionRequest};
use crate::server::AppState;

pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.catalog.browse_categories().await?))
}

pub async fn products_in_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog.browse_products(&slug).await?))
}

pub async fn product_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetailResponse>> {
    let (product, available) = state.catalog.product_detail(&slug).await?;
    Ok(Json(ProductDetailResponse { product, available }))
}

pub async fn testimonials(State(state): State<AppState>) -> Result<Json<Vec<Testimonial>>> {
    Ok(Json(state.support.published_testimonials().await?))
}

/// Contact form. Works without a session; a logged-in submitter gets the
/// question attached to their account.
pub async fn submit_question(
    State(state): State<AppState>,
    session: Option<AuthSession>,
    headers: HeaderMap,
    Json(request): Json<SubmitQuestionRequest>,
) -> Result<(StatusCode, Json<CustomerQuestion>)> {
    request.validate()?;
    let remote_ip = super::client_ip(&headers);
    let question = state
        .support
        .submit_question(
            session.map(|AuthSession(claims)| claims.sub),
            request.name,
            request.email,
            request.phone,
            request.subject,
            request.body,
            &request.captcha_token,
            remote_ip.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(question)))
}
