use soundclip::routes::{create_routes, EXTRACT_DIR, UPLOAD_DIR};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    for dir in [UPLOAD_DIR, EXTRACT_DIR] {
        if let Err(e) = std::fs::create_dir_all(dir) {
            tracing::error!(dir, error = %e, "failed to create working directory");
            std::process::exit(1);
        }
    }

    let app = create_routes().layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let addr = "0.0.0.0:3000".parse().unwrap();
    tracing::info!("Listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
