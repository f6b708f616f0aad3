//! Login dance endpoints. The session rides an HttpOnly cookie; the same
//! token is returned in the body for clients that keep it themselves.

use axum::extract::{Query, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::auth::extract::cookie_value;
use crate::auth::{build_session_cookie, clear_session_cookie, resolve_cookie_domain};
use crate::domain::SocialProvider;
use crate::error::{Result, ShopError};
use crate::events::LoginEvent;
use crate::http::dto::{CallbackQuery, LoginQuery, RefreshRequest, SessionResponse, UserView};
use crate::server::AppState;
use crate::services::{CallbackOutcome, ClientMeta};

/// Carries the OAuth state nonce between login start and callback.
pub const STATE_COOKIE: &str = "pinshop_oauth_state";
/// Holds the Keycloak refresh token.
pub const REFRESH_COOKIE: &str = "pinshop_refresh";

const STATE_TTL_MINUTES: i64 = 10;
const REFRESH_TTL_MINUTES: i64 = 60 * 24 * 30;

fn cookie_domain<'a>(state: &'a AppState, headers: &'a HeaderMap) -> &'a str {
    resolve_cookie_domain(
        &state.config.auth.cookie_domains,
        super::request_host(headers),
    )
}

fn client_meta(headers: &HeaderMap) -> ClientMeta {
    ClientMeta {
        remote_ip: super::client_ip(headers),
        user_agent: super::user_agent(headers),
    }
}

fn session_response(
    state: &AppState,
    headers: &HeaderMap,
    outcome: CallbackOutcome,
    extra_cookie: Option<String>,
) -> Response {
    let domain = cookie_domain(state, headers);
    let session_cookie = build_session_cookie(
        &state.config.auth.session_cookie,
        &outcome.session_token,
        domain,
        state.jwt.ttl_minutes(),
    );
    let refresh_cookie = build_session_cookie(
        REFRESH_COOKIE,
        &outcome.tokens.refresh_token,
        domain,
        REFRESH_TTL_MINUTES,
    );

    let body = SessionResponse {
        user: UserView::from(&outcome.user),
        session_token: outcome.session_token,
        expires_in: state.jwt.ttl_minutes() * 60,
        refresh_token: outcome.tokens.refresh_token,
    };
    let mut response = Json(body).into_response();
    let headers_mut = response.headers_mut();
    if let Ok(value) = session_cookie.parse() {
        headers_mut.append(SET_COOKIE, value);
    }
    if let Ok(value) = refresh_cookie.parse() {
        headers_mut.append(SET_COOKIE, value);
    }
    if let Some(cookie) = extra_cookie {
        if let Ok(value) = cookie.parse() {
            headers_mut.append(SET_COOKIE, value);
        }
    }
    response
}

/// Redirects the browser to Keycloak with a fresh state nonce.
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    headers: HeaderMap,
) -> Response {
    let hint = query
        .provider
        .as_deref()
        .map(SocialProvider::from_idp_alias);
    let start = state.auth_flow.login_start(hint);
    let domain = cookie_domain(&state, &headers);
    let state_cookie = build_session_cookie(STATE_COOKIE, &start.state, domain, STATE_TTL_MINUTES);
    (
        StatusCode::FOUND,
        [(LOCATION, start.redirect_url), (SET_COOKIE, state_cookie)],
    )
        .into_response()
}

pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let meta = client_meta(&headers);

    // Keycloak redirects back with `error` instead of `code` when the user
    // was refused upstream.
    if let Some(error) = query.error {
        let detail = match query.error_description {
            Some(description) => format!("{error}: {description}"),
            None => error,
        };
        state.bus.publish(LoginEvent::failure(
            "unknown",
            SocialProvider::Keycloak,
            meta.remote_ip,
            meta.user_agent,
            detail.clone(),
        ));
        crate::metrics::auth::login_failure(SocialProvider::Keycloak.idp_alias());
        return Err(ShopError::KeycloakAuthFailed(detail));
    }

    let code = query
        .code
        .ok_or_else(|| ShopError::Validation("missing code parameter".into()))?;
    let echoed_state = query
        .state
        .ok_or_else(|| ShopError::Validation("missing state parameter".into()))?;
    let expected = cookie_value(&headers, STATE_COOKIE);

    let outcome = state
        .auth_flow
        .callback(&code, &echoed_state, expected.as_deref(), &meta)
        .await?;

    let clear_state = clear_session_cookie(STATE_COOKIE, cookie_domain(&state, &headers));
    Ok(session_response(&state, &headers, outcome, Some(clear_state)))
}

/// Trades the refresh cookie (or a body-supplied token) for a new session.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<Response> {
    let token = cookie_value(&headers, REFRESH_COOKIE)
        .or_else(|| body.and_then(|Json(request)| request.refresh_token))
        .ok_or(ShopError::Unauthorized)?;
    let outcome = state.auth_flow.refresh(&token).await?;
    Ok(session_response(&state, &headers, outcome, None))
}

/// Clears the session and refresh cookies and tells Keycloak to drop the
/// session. Always succeeds from the client's point of view.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let token = cookie_value(&headers, REFRESH_COOKIE);
    state.auth_flow.logout(token.as_deref()).await;

    let domain = cookie_domain(&state, &headers);
    let clear_session = clear_session_cookie(&state.config.auth.session_cookie, domain);
    let clear_refresh = clear_session_cookie(REFRESH_COOKIE, domain);
    (
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, clear_session), (SET_COOKIE, clear_refresh)],
    )
        .into_response()
}
