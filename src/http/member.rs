//! Endpoints that create data on behalf of a logged-in member.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::auth::AuthSession;
use crate::domain::{Order, Profile, Testimonial};
use crate::error::Result;
use crate::http::dto::{
    CreateTestimonialRequest, PlaceOrderRequest, VerificationConfirmRequest,
    VerificationStartRequest, VerificationStartResponse,
};
use crate::server::AppState;

pub async fn place_order(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    request.validate()?;
    let order = state
        .orders
        .place_order(
            claims.sub,
            request.product_id,
            request.quantity,
            request.payment_method,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn create_testimonial(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Json(request): Json<CreateTestimonialRequest>,
) -> Result<(StatusCode, Json<Testimonial>)> {
    request.validate()?;
    let testimonial = state
        .support
        .create_testimonial(claims.sub, request.author_name, request.body, request.rating)
        .await?;
    Ok((StatusCode::CREATED, Json(testimonial)))
}

pub async fn request_verification(
    State(state): State<AppState>,
    _session: AuthSession,
    Json(request): Json<VerificationStartRequest>,
) -> Result<Json<VerificationStartResponse>> {
    request.validate()?;
    let tx_id = state.users.request_phone_verification(&request.phone).await?;
    Ok(Json(VerificationStartResponse { tx_id }))
}

pub async fn confirm_verification(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Json(request): Json<VerificationConfirmRequest>,
) -> Result<Json<Profile>> {
    request.validate()?;
    let profile = state
        .users
        .confirm_phone_verification(claims.sub, &request.phone, &request.tx_id, &request.otp)
        .await?;
    Ok(Json(profile))
}
