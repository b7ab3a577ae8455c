use crate::auth::jwt::verify_token;
use crate::auth::session::Session;
use crate::config::Config;
use crate::model::role::Role;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::AUTHORIZATION,
    web::Data,
};
use serde_json::{Value, json};
use tracing::{debug, info};

/// Resolves the caller's `Session` from the bearer token, or answers 401.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    match resolve_session(&req, &config.jwt_secret) {
        Ok(session) => {
            debug!(user_id = session.user_id, email = %session.email, role = %session.role, "Session resolved");
            req.extensions_mut().insert(session);
            next.call(req).await
        }
        Err(body) => {
            info!(path = %req.path(), reason = %body["error"], "Request rejected");
            let resp = HttpResponse::Unauthorized().json(body);
            Ok(req.into_response(resp.map_into_boxed_body()))
        }
    }
}

fn resolve_session(req: &ServiceRequest, secret: &str) -> Result<Session, Value> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| json!({"error": "Missing Authorization header"}))?;

    let token = header
        .to_str()
        .map_err(|_| json!({"error": "Invalid Authorization header encoding"}))?
        .strip_prefix("Bearer ")
        .ok_or_else(|| json!({"error": "Authorization header must start with Bearer"}))?;

    let claims = verify_token(token, secret)
        .map_err(|e| json!({"error": "Invalid or expired token", "details": e}))?;

    let role = Role::from_id(claims.role).ok_or_else(|| json!({"error": "Invalid role"}))?;

    Ok(Session {
        user_id: claims.user_id,
        email: claims.sub,
        role,
        employee_id: claims.employee_id,
    })
}
