use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::auth::JwtKeys;
use crate::clients::{KeycloakClient, ObjectStorageClient, RecaptchaClient, VerificationClient};
use crate::config::AppConfig;
use crate::error::Result;
use crate::events::LoginEventBus;
use crate::http::{admin, auth, member, my, open};
use crate::services::{
    AuthFlowService, CatalogService, NotifyService, OrderService, SupportService, UserService,
};
use crate::storage::Storage;

/// Everything a handler can reach. Cheap to clone; all heavy members sit
/// behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn Storage>,
    pub jwt: Arc<JwtKeys>,
    pub catalog: Arc<CatalogService>,
    pub orders: Arc<OrderService>,
    pub users: Arc<UserService>,
    pub support: Arc<SupportService>,
    pub auth_flow: Arc<AuthFlowService>,
    pub object_storage: Arc<ObjectStorageClient>,
    pub bus: LoginEventBus,
}

impl AppState {
    /// Wires clients and services from the configuration. Only providers
    /// with a config section are constructed.
    pub fn build(
        config: AppConfig,
        storage: Arc<dyn Storage>,
        bus: LoginEventBus,
    ) -> Result<Self> {
        let jwt = Arc::new(JwtKeys::new(
            &config.auth.jwt_secret,
            config.auth.token_ttl_minutes,
        ));
        let keycloak = Arc::new(KeycloakClient::new(&config.keycloak)?);
        let captcha = Arc::new(RecaptchaClient::new(&config.recaptcha)?);
        let verifier = Arc::new(VerificationClient::new(&config.verification)?);
        let object_storage = Arc::new(ObjectStorageClient::new(&config.object_storage)?);
        let notify = Arc::new(NotifyService::from_config(&config)?);

        let catalog = Arc::new(CatalogService::new(storage.clone()));
        let orders = Arc::new(OrderService::new(storage.clone(), notify.clone()));
        let users = Arc::new(UserService::new(
            storage.clone(),
            verifier,
            config.auth.admin_emails.clone(),
        ));
        let support = Arc::new(SupportService::new(storage.clone(), captcha, notify));
        let auth_flow = Arc::new(AuthFlowService::new(
            keycloak,
            users.clone(),
            jwt.clone(),
            bus.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            storage,
            jwt,
            catalog,
            orders,
            users,
            support,
            auth_flow,
            object_storage,
            bus,
        })
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics() -> Response {
    match crate::metrics::render() {
        Some(body) => body.into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed",
        )
            .into_response(),
    }
}

/// Builds the full route table over the shared state.
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        // Storefront
        .route("/open/categories", get(open::categories))
        .route(
            "/open/categories/:slug/products",
            get(open::products_in_category),
        )
        .route("/open/products/:slug", get(open::product_detail))
        .route("/open/testimonials", get(open::testimonials))
        .route("/open/questions", post(open::submit_question))
        // Login dance
        .route("/auth/login", get(auth::login))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        // Own data
        .route("/my/profile", get(my::profile).put(my::update_profile))
        .route("/my/orders", get(my::orders))
        .route("/my/orders/:order_no", get(my::order_detail))
        .route("/my/questions", get(my::questions))
        // Member actions
        .route("/member/orders", post(member::place_order))
        .route("/member/testimonials", post(member::create_testimonial))
        .route(
            "/member/verification/request",
            post(member::request_verification),
        )
        .route(
            "/member/verification/confirm",
            post(member::confirm_verification),
        )
        // Staff
        .route(
            "/admin/categories",
            get(admin::list_categories).post(admin::create_category),
        )
        .route(
            "/admin/categories/:id",
            put(admin::update_category).delete(admin::remove_category),
        )
        .route(
            "/admin/products",
            get(admin::list_products).post(admin::create_product),
        )
        .route(
            "/admin/products/:id",
            put(admin::update_product).delete(admin::remove_product),
        )
        .route(
            "/admin/products/:id/visibility",
            put(admin::set_product_visibility),
        )
        .route("/admin/products/:id/vouchers", post(admin::upload_vouchers))
        .route("/admin/products/:id/stock", get(admin::product_stock))
        .route("/admin/orders/search", post(admin::search_orders))
        .route("/admin/orders/:id/status", put(admin::update_order_status))
        .route(
            "/admin/orders/:id/visibility",
            put(admin::set_order_visibility),
        )
        .route(
            "/admin/orders/:id/suspicion",
            put(admin::set_order_suspicion),
        )
        .route("/admin/orders/:id", delete(admin::remove_order))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:id", delete(admin::remove_user))
        .route("/admin/questions", get(admin::list_questions))
        .route("/admin/questions/:id/answer", post(admin::answer_question))
        .route("/admin/questions/:id", delete(admin::remove_question))
        .route("/admin/testimonials", get(admin::list_testimonials))
        .route(
            "/admin/testimonials/:id/publish",
            put(admin::set_testimonial_published),
        )
        .route("/admin/testimonials/:id", delete(admin::remove_testimonial))
        .route("/admin/login-logs", get(admin::login_logs))
        .route(
            "/admin/object-storage/health",
            get(admin::object_storage_health),
        )
        .layer(cors)
        .with_state(state)
}

/// Binds the listener and serves until the process is stopped.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let addr = format!("{}:{}", state.config.server.host, port);
    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
