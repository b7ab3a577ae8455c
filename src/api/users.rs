use crate::auth::password::hash_password;
use crate::auth::session::Session;
use crate::error::StoreError;
use crate::model::role::Role;
use crate::repository::UserRepository;
use crate::utils::email_registry;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[serde(default)]
    #[schema(example = "ana.lopez@unici.edu.mx", format = "email")]
    pub email: String,
    #[serde(default)]
    #[schema(example = "Temporal.2026")]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct EditUser {
    #[schema(example = 12)]
    pub id: Option<u64>,
    #[serde(default)]
    #[schema(example = "ana.lopez@unici.edu.mx", format = "email")]
    pub email: String,
    #[serde(default)]
    #[schema(example = "hr")]
    pub role: String,
}

/// Create a user account (admin only)
#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = Object, example = json!({
            "user": { "id": 12, "email": "ana.lopez@unici.edu.mx" }
        })),
        (status = 400, description = "Email or password missing", body = Object, example = json!({
            "error": "Email y contraseña son requeridos"
        })),
        (status = 409, description = "Email already registered"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Backend error, text passed through")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn create_user(
    session: Session,
    users: web::Data<dyn UserRepository>,
    payload: web::Json<CreateUser>,
) -> actix_web::Result<HttpResponse> {
    session.require_admin()?;

    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Email y contraseña son requeridos"
        })));
    }

    if !email_registry::is_email_available(&email, users.get_ref()).await {
        return Ok(HttpResponse::Conflict().json(json!({
            "error": "El correo ya está registrado"
        })));
    }

    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match users.create_user(&email, &hashed).await {
        Ok(user) => {
            email_registry::mark_taken(&email).await;
            info!(user_id = user.id, admin_id = session.user_id, "User created");
            Ok(HttpResponse::Created().json(json!({ "user": user })))
        }
        Err(StoreError::Duplicate(_)) => Ok(HttpResponse::Conflict().json(json!({
            "error": "El correo ya está registrado"
        }))),
        Err(e) => {
            error!(error = %e, "Failed to create user");
            Ok(HttpResponse::InternalServerError().json(json!({ "error": e.to_string() })))
        }
    }
}

/// Update a user's email and role (admin only)
#[utoipa::path(
    put,
    path = "/api/admin/users",
    request_body = EditUser,
    responses(
        (status = 200, description = "User updated", body = Object, example = json!({ "success": true })),
        (status = 400, description = "id, email or role missing or invalid"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already registered"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Backend error, text passed through")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn edit_user(
    session: Session,
    users: web::Data<dyn UserRepository>,
    payload: web::Json<EditUser>,
) -> actix_web::Result<HttpResponse> {
    session.require_admin()?;

    let email = payload.email.trim().to_lowercase();
    let (Some(id), false, false) = (payload.id, email.is_empty(), payload.role.trim().is_empty()) else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "id, email y rol son requeridos"
        })));
    };

    let Ok(role) = payload.role.trim().parse::<Role>() else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Rol inválido. Permitidos: admin, hr, employee"
        })));
    };

    match users.update_user(id, &email, role).await {
        Ok(Some(previous)) => {
            email_registry::release(&previous).await;
            email_registry::mark_taken(&email).await;
            info!(user_id = id, %role, admin_id = session.user_id, "User updated");
            Ok(HttpResponse::Ok().json(json!({ "success": true })))
        }
        Ok(None) => Ok(HttpResponse::NotFound().json(json!({
            "error": "Usuario no encontrado"
        }))),
        Err(StoreError::Duplicate(_)) => Ok(HttpResponse::Conflict().json(json!({
            "error": "El correo ya está registrado"
        }))),
        Err(e) => {
            error!(error = %e, user_id = id, "Failed to update user");
            Ok(HttpResponse::InternalServerError().json(json!({ "error": e.to_string() })))
        }
    }
}
