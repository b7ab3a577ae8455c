use crate::api::requests::{
    FormDescriptor, RequestListQuery, RequestListResponse, SubmissionResponse,
};
use crate::api::tax::TaxLookupRequest;
use crate::api::users::{CreateUser, EditUser};
use crate::form::{FormValues, SubmitOutcome};
use crate::model::request::{FieldSpec, FieldType, RequestKind, RequestRow, RequestStatus};
use crate::model::role::Role;
use crate::model::user::CreatedUser;
use crate::tax_lookup::{TaxLookupError, TaxRecord};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "UNICI Intranet API",
        version = "1.0.0",
        description = r#"
## UNICI HR intranet

Backend for the employee self-service screens of the UNICI intranet.

### Key Features
- **HR requests**
  - Vacation, permission, incapacity, tardiness and birthday-leave requests
  - Requests are routed to the employee's direct manager; without one, the form shows an alert instead of its fields
- **Listings**
  - Search, status filter and fixed-size pagination
- **User administration**
  - Create users and change their email or role
- **Tax-id lookup**
  - Reads RFC, name and address from a tax-authority verification page or PDF

### Security
Every endpoint requires a **JWT Bearer** token from the identity provider.
Admin endpoints require the admin role; listing every request requires HR or admin.
"#,
    ),
    paths(
        crate::api::requests::get_form,
        crate::api::requests::submit,
        crate::api::requests::list_requests,

        crate::api::users::create_user,
        crate::api::users::edit_user,

        crate::api::tax::lookup
    ),
    components(
        schemas(
            RequestKind,
            RequestStatus,
            FieldSpec,
            FieldType,
            FormValues,
            SubmitOutcome,
            FormDescriptor,
            SubmissionResponse,
            RequestListQuery,
            RequestListResponse,
            RequestRow,
            Role,
            CreateUser,
            EditUser,
            CreatedUser,
            TaxLookupRequest,
            TaxRecord,
            TaxLookupError
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Requests", description = "HR request forms and listings"),
        (name = "Admin", description = "User administration"),
        (name = "Tax", description = "Tax-id lookup"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();

        for path in [
            "/api/requests/{kind}/form",
            "/api/requests/{kind}",
            "/api/admin/users",
            "/api/tax/lookup",
        ] {
            assert!(paths.iter().any(|p| p == path), "{path} missing from docs");
        }
        assert!(doc.components.unwrap().security_schemes.contains_key("bearer_auth"));
    }
}
