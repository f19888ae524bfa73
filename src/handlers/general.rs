// src/handlers/general.rs

use axum::{Json, response::{Html, IntoResponse}};
use serde_json::json;

/// Root handler — a minimal landing page pointing at the docs
pub async fn root_handler() -> impl IntoResponse {
    Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"/><title>Planilla API</title></head>
<body style="font-family: system-ui, sans-serif; max-width: 640px; margin: 48px auto;">
  <h1>Planilla API</h1>
  <p>Payroll administration backend: employees, legal tax parameters, pay stubs and payroll runs.</p>
  <ul>
    <li><a href="/docs">Swagger UI</a></li>
    <li><a href="/api-docs/openapi.json">OpenAPI spec</a></li>
    <li><a href="/health">Health check</a></li>
  </ul>
</body>
</html>"#,
    )
}

/// Liveness probe
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "planilla",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
