use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, SecurityConfig};
use crate::db::{AuthStore, OrderStore};
use crate::services::identity::{
    IdentityResolver, LocalIdentityResolver, RemoteIdentityResolver,
};
use crate::services::sessions::SessionIssuer;
use crate::token::TokenCodec;

pub mod auth;
mod dishes;
mod error;
mod orders;
mod sessions;
mod types;
mod users;
mod validation;

pub use error::ApiError;
pub use types::*;

/// Shared state of the account service.
pub struct AuthState {
    pub store: AuthStore,
    pub security: SecurityConfig,
    pub codec: TokenCodec,
    pub sessions: SessionIssuer,
    pub resolver: Arc<dyn IdentityResolver>,
}

/// Shared state of the ordering service. Identity is resolved through the
/// account service; there is no local user table.
pub struct OrderState {
    pub store: OrderStore,
    pub resolver: Arc<dyn IdentityResolver>,
}

fn token_codec(config: &Config) -> anyhow::Result<TokenCodec> {
    let secret = config.require_token_secret()?;
    Ok(TokenCodec::new(
        secret,
        chrono::Duration::minutes(i64::from(config.auth.token_ttl_minutes)),
    ))
}

pub async fn create_auth_state(config: &Config) -> anyhow::Result<Arc<AuthState>> {
    let codec = token_codec(config)?;

    let store = AuthStore::with_pool_options(
        &config.auth.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let resolver: Arc<dyn IdentityResolver> =
        Arc::new(LocalIdentityResolver::new(store.clone(), codec.clone()));
    let sessions = SessionIssuer::new(store.clone(), codec.clone());

    Ok(Arc::new(AuthState {
        store,
        security: config.security.clone(),
        codec,
        sessions,
        resolver,
    }))
}

pub async fn create_order_state(config: &Config) -> anyhow::Result<Arc<OrderState>> {
    let codec = token_codec(config)?;

    let store = OrderStore::with_pool_options(
        &config.orders.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let resolver: Arc<dyn IdentityResolver> = Arc::new(RemoteIdentityResolver::new(
        codec,
        config.orders.auth_base_url.clone(),
        Duration::from_secs(config.orders.request_timeout_seconds),
    )?);

    Ok(Arc::new(OrderState { store, resolver }))
}

pub fn auth_router(state: Arc<AuthState>, cors_origins: &[String]) -> Router {
    let protected = Router::new()
        .route("/users", get(users::list_users).put(users::update_me))
        .route("/users/me", get(users::get_me))
        .route_layer(middleware::from_fn_with_state(
            state.resolver.clone(),
            auth::auth_middleware,
        ));

    let public = Router::new()
        .route(
            "/sessions",
            post(sessions::create_session).get(sessions::get_session),
        )
        .route("/users", post(users::create_user))
        .route("/users/{id}", get(users::get_user));

    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

pub fn order_router(state: Arc<OrderState>, cors_origins: &[String]) -> Router {
    let protected = Router::new()
        .route("/dishes", get(dishes::list_dishes).post(dishes::create_dish))
        .route(
            "/dishes/{id}",
            get(dishes::get_dish)
                .put(dishes::update_dish)
                .delete(dishes::delete_dish),
        )
        .route("/orders", post(orders::create_order).get(orders::list_orders))
        .route(
            "/orders/{id}",
            get(orders::get_order).delete(orders::delete_order),
        )
        .route("/orders/{id}/status", put(orders::update_order_status))
        .route_layer(middleware::from_fn_with_state(
            state.resolver.clone(),
            auth::auth_middleware,
        ));

    let public = Router::new().route("/dishes/menu", get(dishes::get_menu));

    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = if origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    layer.allow_methods(Any).allow_headers(Any)
}
