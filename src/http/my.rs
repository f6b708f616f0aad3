//! Endpoints over the caller's own data.

use axum::extract::{Path, State};
use axum::Json;

use crate::auth::AuthSession;
use crate::domain::{CustomerQuestion, Order, Profile};
use crate::error::Result;
use crate::http::dto::{OrderDetailResponse, UpdateProfileRequest};
use crate::server::AppState;

pub async fn profile(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Result<Json<Profile>> {
    Ok(Json(state.users.profile(claims.sub).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>> {
    request.validate()?;
    let profile = state
        .users
        .update_profile(
            claims.sub,
            request.display_name,
            request.phone,
            request.marketing_opt_in,
        )
        .await?;
    Ok(Json(profile))
}

pub async fn orders(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders.my_orders(claims.sub).await?))
}

/// One order by number. Voucher codes appear once the order is paid.
pub async fn order_detail(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(order_no): Path<String>,
) -> Result<Json<OrderDetailResponse>> {
    let (order, vouchers) = state.orders.order_detail(claims.sub, &order_no).await?;
    Ok(Json(OrderDetailResponse { order, vouchers }))
}

pub async fn questions(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Result<Json<Vec<CustomerQuestion>>> {
    Ok(Json(state.support.my_questions(claims.sub).await?))
}
