// src/main.rs

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use facturio::{config::AppState, handlers, middleware::auth::identity_middleware};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    // If configuration fails the application must not start.
    let app_state = AppState::new()
        .await
        .expect("failed to initialize application state");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("failed to run database migrations");

    tracing::info!("database migrations applied");

    let invoice_routes = Router::new()
        .route(
            "/",
            get(handlers::invoices::list_invoices).post(handlers::invoices::create_invoice),
        )
        .route(
            "/{id}",
            get(handlers::invoices::get_invoice)
                .put(handlers::invoices::update_invoice)
                .delete(handlers::invoices::delete_invoice),
        )
        .route("/{id}/status", put(handlers::invoices::change_invoice_status))
        .route(
            "/search/{customer_name}",
            get(handlers::invoices::search_invoices),
        );

    let product_routes = Router::new()
        .route(
            "/",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/{id}",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route(
            "/category/{category}",
            get(handlers::products::list_products_by_category),
        )
        .route("/search/{name}", get(handlers::products::search_products))
        .route("/low-stock", get(handlers::products::list_low_stock_products));

    let client_routes = Router::new()
        .route(
            "/",
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route(
            "/{id}",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        );

    let company_routes = Router::new()
        .route(
            "/",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .route(
            "/generate-invoice-number",
            post(handlers::settings::generate_invoice_number),
        );

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/invoices", invoice_routes)
        .nest("/api/products", product_routes)
        .nest("/api/clients", client_routes)
        .nest("/api/company", company_routes)
        .route(
            "/api/activity-logs",
            get(handlers::activity_logs::list_activity_logs),
        )
        // Identity resolution runs on every route; it never rejects, it only
        // attaches the caller (or Anonymous) for the audit trail.
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            identity_middleware,
        ))
        .with_state(app_state);

    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind TCP listener");
    tracing::info!("server listening on {}", listener.local_addr().unwrap());

    // ConnectInfo gives the audit trail the peer address when no forwarding
    // header is present.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}
