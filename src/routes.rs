use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put, MethodRouter},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, require_admin};
use crate::state::AppState;

pub const CATEGORIES_BASE: &str = "/api/v1/categories";

/// Full application router with global middleware applied.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let router = Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .nest(CATEGORIES_BASE, category_routes(&state))
        .fallback(public::not_found)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(config.api.request_timeout_secs)));

    let router = match cors_layer(&config) {
        Some(cors) => router.layer(cors),
        None => router,
    };
    let router = if config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn category_routes(state: &AppState) -> Router<AppState> {
    // JWT runs first, then the role check
    let admin = |route: MethodRouter<AppState>| {
        route
            .route_layer(from_fn(require_admin))
            .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
    };

    Router::new()
        .route(
            "/",
            get(public::category_list).merge(admin(post(protected::category_create))),
        )
        .route("/tree", get(public::category_tree))
        .route("/bulk/update", admin(put(protected::category_bulk_update)))
        .route("/repair", admin(post(protected::category_repair)))
        .route(
            "/:id",
            get(public::category_show).merge(admin(
                put(protected::category_update).delete(protected::category_delete),
            )),
        )
        .route("/:id/ancestors", get(public::category_ancestors))
        .route("/:id/descendants", admin(get(protected::category_descendants)))
        .route("/:id/analytics", admin(get(protected::category_analytics)))
}

fn cors_layer(config: &AppConfig) -> Option<CorsLayer> {
    if !config.security.enable_cors {
        return None;
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(Any),
    )
}
