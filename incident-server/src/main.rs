use incident_server::{app_router, build_state};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "incident_server=info".into()),
        )
        .init();

    let db_path = std::env::var("INCIDENTS_DB").unwrap_or_else(|_| "incidents.db".into());
    let state = build_state(&db_path).expect("open incident database");

    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
        .await
        .expect("bind :8080");

    tracing::info!("incident-server listening on :8080");
    axum::serve(listener, app).await.expect("serve");
}
