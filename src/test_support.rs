//! Helpers shared by the HTTP tests.

use axum::http::header;
use axum::response::IntoResponse;
use axum::Router;

/// Upload response as the analysis service writes it.
pub const ANALYSIS_FIXTURE: &str = include_str!("../fixtures/analysis_response.json");

/// Re-analysis response as the analysis service writes it.
pub const REANALYSIS_FIXTURE: &str = include_str!("../fixtures/reanalysis_response.json");

/// Serve `app` on an ephemeral loopback port and return its base URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Answer with `body` byte for byte, labelled as JSON.
pub fn raw_json(body: &'static str) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], body)
}
