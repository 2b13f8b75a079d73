use actix_web::{http::header, web, HttpResponse, Responder};
use prometheus::{Encoder, Registry};
use tracing::error;

/// Handler for metrics. Runs all registered collectors and serves data over Http.
pub(crate) async fn metrics_handler(registry: web::Data<Registry>) -> impl Responder {
    // Collectors read sysfs synchronously, keep them off the async workers.
    let families = match web::block(move || registry.gather()).await {
        Ok(families) => families,
        Err(error) => {
            error!(%error, "Failed to gather metrics");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let mut buffer = Vec::new();
    let encoder = prometheus::TextEncoder::new();
    if let Err(error) = encoder.encode(&families, &mut buffer) {
        error!(%error, "Could not encode custom metrics");
    };

    let res_custom = match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(error) => {
            error!(%error, "Prometheus metrics could not be parsed from_utf8'd");
            String::default()
        }
    };
    HttpResponse::Ok()
        .insert_header(header::ContentType(mime::TEXT_PLAIN))
        .body(res_custom)
}
