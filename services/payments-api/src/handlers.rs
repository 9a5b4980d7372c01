use crate::errors::ApiError;
use crate::metrics;
use crate::models::*;
use actix_web::{web, HttpRequest, HttpResponse};
use payment_adapters::{PaymentRequest, PaymentRouter, RefundRequest};
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

/// Process start, reported by `/status`
#[derive(Debug, Clone, Copy)]
pub struct StartedAt(pub Instant);

impl Default for StartedAt {
    fn default() -> Self {
        Self(Instant::now())
    }
}

// ===== Service Status =====
pub async fn service_status(started_at: web::Data<StartedAt>) -> HttpResponse {
    HttpResponse::Ok().json(StatusResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: started_at.0.elapsed().as_secs(),
    })
}

// ===== Create Payment =====
pub async fn create_payment(
    body: web::Json<CreatePaymentBody>,
    router: web::Data<Arc<PaymentRouter>>,
) -> Result<HttpResponse, ApiError> {
    let request = PaymentRequest::try_from(body.into_inner())?;
    let result = router.charge(request).await?;

    Ok(HttpResponse::Created().json(result))
}

// ===== Get Payment =====
pub async fn get_payment(
    path: web::Path<String>,
    router: web::Data<Arc<PaymentRouter>>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let result = router.find(&id).await?;

    Ok(HttpResponse::Ok().json(result))
}

// ===== Refund Payment =====
pub async fn refund_payment(
    path: web::Path<String>,
    body: web::Json<RefundBody>,
    router: web::Data<Arc<PaymentRouter>>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let request = RefundRequest::try_from(body.into_inner())?;
    let result = router.refund(&id, request).await?;

    Ok(HttpResponse::Created().json(result))
}

// ===== Provider Breakers =====
pub async fn providers_status(router: web::Data<Arc<PaymentRouter>>) -> HttpResponse {
    let providers = router
        .providers()
        .iter()
        .filter_map(|p| p.breaker_snapshot())
        .collect();

    HttpResponse::Ok().json(ProvidersStatusResponse { providers })
}

// ===== Prometheus =====
pub async fn prometheus_metrics() -> Result<HttpResponse, ApiError> {
    let body = metrics::metrics_handler().map_err(|e| {
        error!("Failed to render metrics: {}", e);
        ApiError::Internal(e.to_string())
    })?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body))
}

fn json_error(err: actix_web::error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(err.to_string()).into()
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .service(
            web::scope("/payments")
                .route("", web::post().to(create_payment))
                .route("/{id}", web::get().to(get_payment))
                .route("/{id}/refund", web::post().to(refund_payment)),
        )
        .route("/providers/status", web::get().to(providers_status))
        .route("/status", web::get().to(service_status))
        .route("/metrics", web::get().to(prometheus_metrics));
}
