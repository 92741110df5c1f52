use crate::config::ServeConfig;
use crate::listing::{self, ListingState};

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use axum::http::{HeaderValue, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{MethodRouter, get};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

const NO_STORE: &str = "no-store, no-cache, must-revalidate, max-age=0";

#[derive(Clone, Copy)]
struct LogState {
    local_offset: UtcOffset,
}

/// Serves `config.root` with caching disabled on every response. Directories
/// without an `index.html` get a generated listing.
pub fn app(config: &ServeConfig) -> Router {
    let state = LogState {
        local_offset: config.local_offset,
    };
    let listing: MethodRouter =
        get(listing::list_directory).with_state(ListingState::new(&config.root));
    Router::new()
        .fallback_service(ServeDir::new(&config.root).fallback(listing))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(NO_STORE),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            EXPIRES,
            HeaderValue::from_static("0"),
        ))
        .layer(middleware::from_fn_with_state(state, log_request))
}

pub async fn serve(config: ServeConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    let port = listener.local_addr()?.port();
    println!("Server running at http://localhost:{port}");
    println!("Cache disabled - all files will be fresh");
    println!("Serving {}", config.root.display());
    println!("Press Ctrl+C to stop");
    axum::serve(listener, app(&config)).await
}

async fn log_request(State(state): State<LogState>, req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let response = next.run(req).await;
    info!(
        "[{}] \"{method} {path}\" {}",
        clock(state.local_offset),
        response.status().as_u16()
    );
    response
}

fn clock(offset: UtcOffset) -> String {
    OffsetDateTime::now_utc()
        .to_offset(offset)
        .format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| "--:--:--".to_string())
}
