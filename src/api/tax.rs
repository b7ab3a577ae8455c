use crate::auth::session::Session;
use crate::tax_lookup::{TaxLookup, TaxLookupError, TaxRecord};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct TaxLookupRequest {
    #[serde(default)]
    #[schema(example = "https://siat.sat.gob.mx/app/qr/faces/pages/mobile/validadorqr.jsf?D1=10&D2=1&D3=12345_LOPA850101AB1")]
    pub url: String,
}

/// Scrape RFC, name and address from a tax-authority verification page or PDF
#[utoipa::path(
    post,
    path = "/api/tax/lookup",
    request_body = TaxLookupRequest,
    responses(
        (status = 200, description = "Taxpayer data found", body = TaxRecord),
        (status = 400, description = "URL missing", body = TaxLookupError),
        (status = 422, description = "Page could not be fetched or parsed", body = TaxLookupError),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Tax"
)]
pub async fn lookup(
    session: Session,
    tax: web::Data<TaxLookup>,
    payload: web::Json<TaxLookupRequest>,
) -> actix_web::Result<HttpResponse> {
    if payload.url.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "La URL es requerida",
            "snippets": []
        })));
    }

    match tax.lookup(&payload.url).await {
        Ok(record) => {
            info!(user_id = session.user_id, rfc = %record.rfc, "Tax lookup succeeded");
            Ok(HttpResponse::Ok().json(record))
        }
        Err(e) => {
            info!(user_id = session.user_id, error = %e.error, "Tax lookup failed");
            Ok(HttpResponse::UnprocessableEntity().json(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{bearer, test_config};
    use crate::auth::middleware::auth_middleware;
    use actix_web::http::StatusCode;
    use actix_web::middleware::from_fn;
    use actix_web::{App, test};
    use serde_json::Value;
    use std::time::Duration;

    #[actix_web::test]
    async fn missing_and_unsupported_urls_are_reported() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .app_data(web::Data::new(TaxLookup::new(Duration::from_secs(1)).unwrap()))
                .service(
                    web::scope("/api")
                        .wrap(from_fn(auth_middleware))
                        .route("/tax/lookup", web::post().to(lookup)),
                ),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/tax/lookup")
            .insert_header(bearer(4, 2, Some(4)))
            .set_json(json!({ "url": "  " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/tax/lookup")
            .insert_header(bearer(4, 2, Some(4)))
            .set_json(json!({ "url": "ftp://sat.gob.mx/constancia.pdf" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "La URL debe comenzar con http:// o https://");
        assert_eq!(body["snippets"], json!([]));
    }
}
