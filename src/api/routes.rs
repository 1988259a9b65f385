use actix_cors::Cors;
use actix_web::{web, HttpResponse};

use super::handlers;
use super::state::ApiState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health checks
        .route("/health", web::get().to(health_check))
        .route("/metrics", web::get().to(metrics_endpoint))

        // API v1
        .service(
            web::scope("/api/v1")
                .wrap(
                    Cors::default()
                        .allowed_origin_fn(|origin, _req_head| {
                            origin.as_bytes().starts_with(b"http://localhost") ||
                            origin.as_bytes().starts_with(b"https://")
                        })
                        .allowed_methods(vec!["GET", "POST"])
                        .allowed_headers(vec!["Content-Type"])
                        .expose_headers(vec!["Content-Disposition"])
                        .max_age(3600)
                )
                .route("/templates", web::get().to(handlers::list_templates))
                .route("/invoices/{format}", web::post().to(handlers::render_invoice))
        );
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy"
    }))
}

async fn metrics_endpoint(state: web::Data<ApiState>) -> HttpResponse {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let mut metric_families = prometheus::gather();
    metric_families.extend(state.metrics.registry.gather());
    let mut buffer = vec![];

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}
