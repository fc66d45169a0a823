use conduit_api::{config, db, store::AppState};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL and JWT_SECRET_KEY
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("Starting Conduit API in {:?} mode", config.environment);

    let pool = db::connect()
        .await
        .unwrap_or_else(|e| panic!("database setup failed: {}", e));
    let state = AppState::postgres(pool);

    let app = conduit_api::app(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Conduit API listening on http://{}", bind_addr);
    axum::serve(listener, app).await.expect("server");
}
