use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    server::telemetry::init_telemetry();
    server::health::record_start_time();

    let pool = server::db::create_pool();
    server::db::run_migrations(&pool).await;

    let router = server::openapi::app_router(pool)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = server::config::bind_addr();
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listener");

    axum::serve(listener, router)
        .await
        .expect("Server error");
}
