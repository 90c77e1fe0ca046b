//! Route definitions for BizManager

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/me", get(handlers::me))
        // User management (admin)
        .nest("/users", user_routes())
        // Inventory catalogue
        .nest("/inventory", inventory_routes())
        // Sales, purchases and expenses
        .nest("/transactions", transaction_routes())
        // Delivery and packaging costs
        .nest("/settings", settings_routes())
        // Dashboard and reports
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/reports", get(handlers::get_report))
        .route("/reports/share", get(handlers::get_share_text))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Change stream; authenticates with a query token
        .route("/realtime", get(handlers::realtime_socket))
        .merge(protected)
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/logout", post(handlers::logout))
}

/// User management routes
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/:user_id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
}

/// Inventory routes
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_items).post(handlers::create_item))
        .route("/low-stock", get(handlers::list_low_stock))
        .route("/export", get(handlers::export_inventory))
        .route(
            "/:item_id",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
}

/// Transaction routes
fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route("/export", get(handlers::export_transactions))
        .route("/suggestions", get(handlers::get_suggestions))
        .route(
            "/:transaction_id",
            get(handlers::get_transaction)
                .put(handlers::update_transaction)
                .delete(handlers::delete_transaction),
        )
        .route(
            "/:transaction_id/status",
            put(handlers::set_transaction_status),
        )
}

/// Delivery and packaging settings routes
fn settings_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/delivery",
            get(handlers::list_delivery_companies).post(handlers::create_delivery_company),
        )
        .route(
            "/delivery/:company_id",
            get(handlers::get_delivery_company)
                .put(handlers::rename_delivery_company)
                .delete(handlers::delete_delivery_company),
        )
        .route(
            "/delivery/:company_id/rates",
            post(handlers::add_delivery_rate),
        )
        .route(
            "/delivery/:company_id/rates/:index",
            delete(handlers::remove_delivery_rate),
        )
        .route(
            "/delivery/:company_id/cost",
            get(handlers::get_delivery_cost),
        )
        .route(
            "/packaging",
            get(handlers::list_packaging_options).post(handlers::create_packaging_option),
        )
        .route(
            "/packaging/:option_id",
            get(handlers::get_packaging_option)
                .put(handlers::update_packaging_option)
                .delete(handlers::delete_packaging_option),
        )
}
