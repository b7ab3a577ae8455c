use crate::auth::session::Session;
use crate::config::Config;
use crate::form::{FailureKind, FormValues, SubmitOutcome};
use crate::listing::{self, ListingQuery};
use crate::model::request::{FieldSpec, RequestKind, RequestRow, RequestStatus};
use crate::repository::{ListScope, ProfileRepository, RequestRepository};
use crate::requests::{FormView, MISSING_APPROVER_MESSAGE, open_form};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{Span, error, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Serialize, ToSchema)]
pub struct FormDescriptor {
    pub kind: RequestKind,
    #[schema(example = "Solicitud de permiso")]
    pub title: String,
    /// Empty when the alert is shown
    pub fields: Vec<FieldSpec>,
    /// Shown instead of the fields when no direct manager is assigned
    pub alert: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[schema(example = json!({
    "success": true,
    "message": "Solicitud de permiso enviada correctamente",
    "values": {}
}))]
pub struct SubmissionResponse {
    pub success: bool,
    pub message: String,
    /// Form state after the submit: cleared on success, kept on failure
    pub values: FormValues,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct RequestListQuery {
    /// Case-insensitive match on employee name or reason
    pub search: Option<String>,
    #[schema(example = "pending")]
    /// pending, approved or rejected
    pub status: Option<String>,
    #[schema(example = "mine")]
    /// mine (default), team or all
    pub scope: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<usize>,
}

#[derive(Serialize, ToSchema)]
pub struct RequestListResponse {
    pub data: Vec<RequestRow>,
    #[schema(example = 1)]
    pub page: usize,
    #[schema(example = 10)]
    pub per_page: usize,
    #[schema(example = 1)]
    pub total: usize,
    #[schema(example = 1)]
    pub total_pages: usize,
}

fn parse_kind(raw: &str) -> actix_web::Result<RequestKind> {
    raw.parse()
        .map_err(|_| actix_web::error::ErrorNotFound("Unknown request type"))
}

fn outcome_status(outcome: &SubmitOutcome) -> StatusCode {
    match outcome.failure() {
        None => StatusCode::CREATED,
        Some(FailureKind::Validation) => StatusCode::BAD_REQUEST,
        Some(FailureKind::InProgress) => StatusCode::CONFLICT,
        Some(FailureKind::Backend | FailureKind::Unexpected) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn missing_approver(kind: RequestKind) -> HttpResponse {
    HttpResponse::UnprocessableEntity().json(json!({
        "success": false,
        "alert": "missing_approver",
        "title": kind.title(),
        "message": MISSING_APPROVER_MESSAGE
    }))
}

/// Form descriptor for a request type
#[utoipa::path(
    get,
    path = "/api/requests/{kind}/form",
    params(
        ("kind" = RequestKind, Path, description = "vacation, permission, incapacity, tardiness or birthday")
    ),
    responses(
        (status = 200, description = "Fields to render, or the missing-manager alert", body = FormDescriptor),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown request type")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn get_form(
    session: Session,
    profiles: web::Data<dyn ProfileRepository>,
    path: web::Path<String>,
) -> actix_web::Result<HttpResponse> {
    let kind = parse_kind(&path)?;

    let view = open_form(kind, session.employee_id, profiles.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id = session.user_id, "Failed to resolve direct manager");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let descriptor = match view {
        FormView::Ready(form) => FormDescriptor {
            kind,
            title: form.form.title().to_string(),
            fields: kind.fields().to_vec(),
            alert: None,
        },
        FormView::MissingApprover { kind } => FormDescriptor {
            kind,
            title: kind.title().to_string(),
            fields: Vec::new(),
            alert: Some(MISSING_APPROVER_MESSAGE.to_string()),
        },
    };

    Ok(HttpResponse::Ok().json(descriptor))
}

/// Submit a request
#[utoipa::path(
    post,
    path = "/api/requests/{kind}",
    params(
        ("kind" = RequestKind, Path, description = "vacation, permission, incapacity, tardiness or birthday")
    ),
    request_body(
        content = FormValues,
        description = "Named form fields; a repeated name keeps its last value",
        content_type = "application/x-www-form-urlencoded"
    ),
    responses(
        (status = 201, description = "Request stored", body = SubmissionResponse),
        (status = 400, description = "Missing or invalid field", body = SubmissionResponse),
        (status = 422, description = "No direct manager assigned", body = Object, example = json!({
            "success": false,
            "alert": "missing_approver",
            "title": "Solicitud de permiso",
            "message": "No tienes un jefe directo asignado. Contacta a Recursos Humanos para poder enviar solicitudes."
        })),
        (status = 500, description = "The store rejected the write", body = SubmissionResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
#[instrument(
    name = "submit_form",
    skip_all,
    fields(submission_id = %Uuid::new_v4(), user_id = session.user_id, kind = tracing::field::Empty)
)]
pub async fn submit(
    session: Session,
    requests: web::Data<dyn RequestRepository>,
    profiles: web::Data<dyn ProfileRepository>,
    path: web::Path<String>,
    fields: web::Form<Vec<(String, String)>>,
) -> actix_web::Result<HttpResponse> {
    let kind = parse_kind(&path)?;
    Span::current().record("kind", tracing::field::display(kind));

    let view = open_form(kind, session.employee_id, profiles.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to resolve direct manager");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let mut form = match view {
        FormView::Ready(form) => form,
        FormView::MissingApprover { kind } => return Ok(missing_approver(kind)),
    };

    form.form.fill(fields.into_inner());
    let outcome = form.submit(requests.get_ref()).await;

    Ok(HttpResponse::build(outcome_status(&outcome)).json(SubmissionResponse {
        success: outcome.success,
        message: outcome.message,
        values: form.form.values().clone(),
    }))
}

/// List requests of a type
#[utoipa::path(
    get,
    path = "/api/requests/{kind}",
    params(
        ("kind" = RequestKind, Path, description = "vacation, permission, incapacity, tardiness or birthday"),
        RequestListQuery
    ),
    responses(
        (status = 200, description = "Filtered, paginated request list", body = RequestListResponse),
        (status = 400, description = "Unknown status or scope"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn list_requests(
    session: Session,
    requests: web::Data<dyn RequestRepository>,
    config: web::Data<Config>,
    path: web::Path<String>,
    query: web::Query<RequestListQuery>,
) -> actix_web::Result<HttpResponse> {
    let kind = parse_kind(&path)?;

    let scope = match query.scope.as_deref().unwrap_or("mine") {
        "mine" => ListScope::ByEmployee(session.employee_id()?),
        "team" => ListScope::ByApprover(session.employee_id()?),
        "all" => {
            session.require_hr_or_admin()?;
            ListScope::All
        }
        _ => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Invalid scope. Allowed: mine, team, all"
            })));
        }
    };

    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        if status.parse::<RequestStatus>().is_err() {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Invalid status. Allowed: pending, approved, rejected"
            })));
        }
    }

    let rows = requests.list(kind, scope).await.map_err(|e| {
        error!(error = %e, kind = %kind, "Failed to fetch request list");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let query = query.into_inner();
    let listing_query = ListingQuery {
        search: query.search,
        category: query.status,
        page: query.page.unwrap_or(1),
    };
    let page = listing::apply(rows, &listing_query, config.listing_page_size);

    Ok(HttpResponse::Ok().json(RequestListResponse {
        data: page.items,
        page: page.page,
        per_page: page.page_size,
        total: page.total,
        total_pages: page.total_pages,
    }))
}
