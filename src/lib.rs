pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod payments;
pub mod services;
pub mod state;

#[cfg(test)]
pub mod testing;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use config::SecurityConfig;
use middleware::{require_admin, require_identity};
use state::AppState;

/// Builds the HTTP surface. Routes sit in one of three tiers by guard:
/// public, protected (identity) and elevated (identity + admin role).
pub fn app(state: AppState) -> Router {
    let guard_open_routes = state.config.security.guard_open_routes;
    let cors = cors_layer(&state.config.security);

    let (public_extra, protected_extra, elevated_extra) = if guard_open_routes {
        (Router::new(), cart_write_routes(), promotion_routes())
    } else {
        (cart_write_routes().merge(promotion_routes()), Router::new(), Router::new())
    };

    Router::new()
        .merge(public_routes().merge(public_extra))
        .merge(protected_routes(&state, protected_extra))
        .merge(elevated_routes(&state, elevated_extra))
        .fallback(handlers::public::status::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use handlers::public::{catalog, status, token, users};

    Router::new()
        .route("/", get(status::root))
        .route("/health", get(status::health))
        .route("/jwt", post(token::issue_token))
        .route("/users", post(users::create_user))
        .route("/menu", get(catalog::list_menu))
        .route("/reviews", get(catalog::list_reviews))
}

/// Unguarded unless SECURITY_GUARD_OPEN_ROUTES is set.
fn cart_write_routes() -> Router<AppState> {
    use handlers::public::cart;

    Router::new()
        .route("/cart", post(cart::add_cart_entry))
        .route("/cart/:id", delete(cart::remove_cart_entry))
}

/// Unguarded unless SECURITY_GUARD_OPEN_ROUTES is set.
fn promotion_routes() -> Router<AppState> {
    use handlers::public::users;

    // Same segment name as the admin check; there it carries an email.
    Router::new().route("/users/admin/:id", patch(users::promote_user))
}

fn protected_routes(state: &AppState, extra: Router<AppState>) -> Router<AppState> {
    use handlers::protected::{cart, payments, users};

    Router::new()
        .route("/users/admin/:id", get(users::check_admin))
        .route("/cart", get(cart::list_cart))
        .route("/create-payment-intent", post(payments::create_payment_intent))
        .route("/payments", post(payments::capture_payment))
        .merge(extra)
        .route_layer(from_fn_with_state(state.clone(), require_identity))
}

fn elevated_routes(state: &AppState, extra: Router<AppState>) -> Router<AppState> {
    use handlers::elevated::{menu, stats, users};

    // Layers run outermost-last: identity is established before the role check.
    Router::new()
        .route("/users", get(users::list_users))
        .route("/menu", post(menu::add_menu_item))
        .route("/menu/:id", delete(menu::remove_menu_item))
        .route("/admin-stats", get(stats::admin_stats))
        .merge(extra)
        .route_layer(from_fn_with_state(state.clone(), require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_identity))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
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

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
