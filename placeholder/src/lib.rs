// Static holding-page server
//
// A single route returning a constant HTML document while the real site is
// under construction. Unrelated to the TTS flow; it shares nothing with the
// transcript core.

use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

const INDEX: &str = r#"<!DOCTYPE html>
<html>
<body>

<h1>Under Construction</h1>

<img src="https://cdn.sumomo.horse/misc/unsu-true.jpg" alt="Seiun Sky" width="256" height="256">

</body>
</html>"#;

/// Server configuration
#[derive(Clone, Debug)]
pub struct PlaceholderConfig {
    pub host: String,
    pub port: u16,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl PlaceholderConfig {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("PLACEHOLDER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PLACEHOLDER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        }
    }
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .layer(TraceLayer::new_for_http())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX)
}

pub async fn serve(cfg: PlaceholderConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = format!("{}:{}", cfg.host, cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        target: "placeholder",
        url = %format!("http://{}", addr),
        "Holding page ready"
    );
    axum::serve(listener, router()).await?;
    Ok(())
}
