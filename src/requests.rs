//! Per-request-type submit handlers and form opening.

use chrono::{NaiveDate, NaiveTime};
use tracing::{error, info, instrument};

use crate::error::StoreError;
use crate::form::{FailureKind, FormValues, SubmissionForm, SubmitOutcome};
use crate::model::request::{FieldRange, FieldType, NewRequest, RequestKind};
use crate::repository::{ProfileRepository, RequestRepository};
use crate::utils::db_utils::SqlValue;

pub const MISSING_APPROVER_MESSAGE: &str =
    "No tienes un jefe directo asignado. Contacta a Recursos Humanos para poder enviar solicitudes.";
pub const MISSING_IDS_MESSAGE: &str = "No se pudo identificar al empleado o a su jefe directo";

/// What the employee sees when opening a request form.
#[derive(Debug)]
pub enum FormView {
    /// No direct manager on the profile: the alert replaces the fields.
    MissingApprover { kind: RequestKind },
    Ready(RequestForm),
}

/// A form bound to the employee and the approver resolved when it was opened.
#[derive(Debug)]
pub struct RequestForm {
    pub kind: RequestKind,
    pub employee_id: u64,
    pub approver_id: u64,
    pub form: SubmissionForm,
}

impl RequestForm {
    pub async fn submit(&mut self, repo: &dyn RequestRepository) -> SubmitOutcome {
        let (kind, employee_id, approver_id) = (self.kind, self.employee_id, self.approver_id);

        self.form
            .submit(|values| async move {
                Ok(submit_request(repo, kind, Some(employee_id), Some(approver_id), &values).await)
            })
            .await
    }
}

pub async fn open_form(
    kind: RequestKind,
    employee_id: Option<u64>,
    profiles: &dyn ProfileRepository,
) -> Result<FormView, StoreError> {
    let Some(employee_id) = employee_id else {
        return Ok(FormView::MissingApprover { kind });
    };

    match profiles.direct_manager(employee_id).await? {
        Some(approver_id) => Ok(FormView::Ready(RequestForm {
            kind,
            employee_id,
            approver_id,
            form: SubmissionForm::new(kind.title()),
        })),
        None => Ok(FormView::MissingApprover { kind }),
    }
}

/// Validates and inserts one request. Never writes when an id is missing
/// or a field is invalid.
#[instrument(name = "submit_request", skip(repo, values))]
pub async fn submit_request(
    repo: &dyn RequestRepository,
    kind: RequestKind,
    employee_id: Option<u64>,
    approver_id: Option<u64>,
    values: &FormValues,
) -> SubmitOutcome {
    let (Some(employee_id), Some(approver_id)) = (employee_id, approver_id) else {
        info!("Rejected: employee or approver not resolved");
        return SubmitOutcome::rejected(MISSING_IDS_MESSAGE);
    };

    let fields = match shape_fields(kind, values) {
        Ok(fields) => fields,
        Err(message) => {
            info!(%message, "Rejected: invalid fields");
            return SubmitOutcome::rejected(message);
        }
    };

    let request = NewRequest {
        kind,
        employee_id,
        approver_id,
        fields,
    };

    match repo.insert(&request).await {
        Ok(id) => {
            info!(id, employee_id, approver_id, "Request stored");
            SubmitOutcome::succeeded(kind.success_message())
        }
        Err(e) => {
            error!(error = %e, employee_id, "Failed to store request");
            SubmitOutcome::failed(FailureKind::Backend, e.to_string())
        }
    }
}

/// Converts form values into typed columns, in field order.
pub fn shape_fields(
    kind: RequestKind,
    values: &FormValues,
) -> Result<Vec<(&'static str, SqlValue)>, String> {
    let mut fields = Vec::with_capacity(kind.fields().len());

    for spec in kind.fields() {
        let value = match values.get(spec.name) {
            None if spec.required => {
                return Err(format!("El campo \"{}\" es obligatorio", spec.label));
            }
            None => SqlValue::Null,
            Some(raw) => parse_value(spec.field_type, raw)
                .ok_or_else(|| format!("El campo \"{}\" no es válido", spec.label))?,
        };
        fields.push((spec.name, value));
    }

    check_range(kind, &fields)?;

    Ok(fields)
}

fn parse_value(field_type: FieldType, raw: &str) -> Option<SqlValue> {
    match field_type {
        FieldType::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(SqlValue::Date),
        FieldType::Time => NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
            .map(SqlValue::Time),
        FieldType::Count => raw
            .parse::<i64>()
            .ok()
            .filter(|n| *n >= 1)
            .map(SqlValue::I64),
        FieldType::Text | FieldType::Attachment => Some(SqlValue::String(raw.to_string())),
    }
}

fn check_range(kind: RequestKind, fields: &[(&'static str, SqlValue)]) -> Result<(), String> {
    let lookup = |name: &str| fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v);

    match kind.range() {
        Some(FieldRange::Dates(start, end)) => {
            if let (Some(SqlValue::Date(a)), Some(SqlValue::Date(b))) = (lookup(start), lookup(end)) {
                if a > b {
                    return Err("La fecha de inicio no puede ser posterior a la fecha de fin".into());
                }
            }
        }
        Some(FieldRange::Hours(start, end)) => {
            if let (Some(SqlValue::Time(a)), Some(SqlValue::Time(b))) = (lookup(start), lookup(end)) {
                if a >= b {
                    return Err("La hora de inicio debe ser anterior a la hora de fin".into());
                }
            }
        }
        None => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::Feedback;
    use crate::repository::{MockProfileRepository, MockRequestRepository};
    use rstest::rstest;

    fn permission_values() -> FormValues {
        FormValues::collect([
            ("fecha_permiso", "2024-05-01"),
            ("hora_inicio", "08:00"),
            ("hora_fin", "09:00"),
            ("motivo", "dentist"),
        ])
    }

    fn date(s: &str) -> SqlValue {
        SqlValue::Date(NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap())
    }

    fn time(s: &str) -> SqlValue {
        SqlValue::Time(NaiveTime::parse_from_str(s, "%H:%M").unwrap())
    }

    #[rstest]
    #[case(RequestKind::Vacation, None, Some(7))]
    #[case(RequestKind::Permission, Some(1), None)]
    #[case(RequestKind::Incapacity, None, None)]
    #[case(RequestKind::Tardiness, Some(1), None)]
    #[case(RequestKind::Birthday, None, Some(7))]
    #[actix_web::test]
    async fn unresolved_ids_never_write(
        #[case] kind: RequestKind,
        #[case] employee_id: Option<u64>,
        #[case] approver_id: Option<u64>,
    ) {
        let mut repo = MockRequestRepository::new();
        repo.expect_insert().times(0);

        let outcome = submit_request(&repo, kind, employee_id, approver_id, &permission_values()).await;

        assert!(!outcome.success);
        assert_eq!(outcome.failure(), Some(FailureKind::Validation));
    }

    #[actix_web::test]
    async fn permission_request_inserts_exact_fields() {
        let mut repo = MockRequestRepository::new();
        repo.expect_insert()
            .times(1)
            .withf(|req| {
                *req == NewRequest {
                    kind: RequestKind::Permission,
                    employee_id: 1,
                    approver_id: 7,
                    fields: vec![
                        ("fecha_permiso", date("2024-05-01")),
                        ("hora_inicio", time("08:00")),
                        ("hora_fin", time("09:00")),
                        ("motivo", SqlValue::String("dentist".into())),
                    ],
                }
            })
            .returning(|_| Ok(41));

        let outcome =
            submit_request(&repo, RequestKind::Permission, Some(1), Some(7), &permission_values()).await;

        assert!(outcome.success);
        assert_eq!(outcome.message, "Solicitud de permiso enviada correctamente");
    }

    #[actix_web::test]
    async fn form_clears_after_successful_permission_request() {
        let mut profiles = MockProfileRepository::new();
        profiles.expect_direct_manager().returning(|_| Ok(Some(7)));
        let mut repo = MockRequestRepository::new();
        repo.expect_insert()
            .times(1)
            .withf(|req| req.kind.table() == "solicitudes_permiso" && req.approver_id == 7)
            .returning(|_| Ok(1));

        let FormView::Ready(mut form) = open_form(RequestKind::Permission, Some(1), &profiles)
            .await
            .unwrap()
        else {
            panic!("expected a ready form");
        };
        form.form.fill([
            ("fecha_permiso", "2024-05-01"),
            ("hora_inicio", "08:00"),
            ("hora_fin", "09:00"),
            ("motivo", "dentist"),
        ]);

        let outcome = form.submit(&repo).await;

        assert!(outcome.success);
        assert!(form.form.values().is_empty());
        assert_eq!(
            form.form.feedback(),
            Some(&Feedback::Success("Solicitud de permiso enviada correctamente".into()))
        );
    }

    #[actix_web::test]
    async fn missing_manager_opens_the_alert_instead_of_the_form() {
        let mut profiles = MockProfileRepository::new();
        profiles.expect_direct_manager().returning(|_| Ok(None));

        let view = open_form(RequestKind::Permission, Some(1), &profiles).await.unwrap();
        assert!(matches!(view, FormView::MissingApprover { kind: RequestKind::Permission }));
    }

    #[actix_web::test]
    async fn user_without_employee_profile_gets_the_alert() {
        let mut profiles = MockProfileRepository::new();
        profiles.expect_direct_manager().times(0);

        let view = open_form(RequestKind::Vacation, None, &profiles).await.unwrap();
        assert!(matches!(view, FormView::MissingApprover { .. }));
    }

    #[actix_web::test]
    async fn store_errors_are_shown_verbatim() {
        let mut repo = MockRequestRepository::new();
        repo.expect_insert()
            .returning(|_| Err(StoreError::Database(sqlx::Error::Protocol("connection reset".into()))));

        let outcome =
            submit_request(&repo, RequestKind::Permission, Some(1), Some(7), &permission_values()).await;

        assert!(!outcome.success);
        assert_eq!(outcome.failure(), Some(FailureKind::Backend));
        assert!(outcome.message.contains("connection reset"));
    }

    #[actix_web::test]
    async fn unique_violations_keep_the_database_text() {
        let mut repo = MockRequestRepository::new();
        repo.expect_insert().returning(|_| {
            Err(StoreError::Duplicate(sqlx::Error::Protocol(
                "Duplicate entry '1-2024-05-01' for key 'uq_permiso_dia'".into(),
            )))
        });

        let outcome =
            submit_request(&repo, RequestKind::Permission, Some(1), Some(7), &permission_values()).await;

        assert_eq!(outcome.failure(), Some(FailureKind::Backend));
        assert!(outcome.message.contains("Duplicate entry '1-2024-05-01' for key 'uq_permiso_dia'"));
    }

    #[actix_web::test]
    async fn invalid_fields_never_write() {
        let mut repo = MockRequestRepository::new();
        repo.expect_insert().times(0);

        let mut values = permission_values();
        values.set("hora_fin", "07:30");
        let outcome = submit_request(&repo, RequestKind::Permission, Some(1), Some(7), &values).await;
        assert_eq!(outcome.message, "La hora de inicio debe ser anterior a la hora de fin");

        let values = FormValues::collect([("fecha", "2024-02-30"), ("hora_llegada", "08:20"), ("motivo", "tráfico")]);
        let outcome = submit_request(&repo, RequestKind::Tardiness, Some(1), Some(7), &values).await;
        assert_eq!(outcome.message, "El campo \"Fecha\" no es válido");
    }

    #[test]
    fn vacation_requires_at_least_one_day_and_ordered_dates() {
        let base = [("fecha_inicio", "2024-07-01"), ("fecha_fin", "2024-07-05")];

        let zero_days = FormValues::collect(base.into_iter().chain([("dias", "0")]));
        assert_eq!(
            shape_fields(RequestKind::Vacation, &zero_days).unwrap_err(),
            "El campo \"Días solicitados\" no es válido"
        );

        let reversed = FormValues::collect([
            ("fecha_inicio", "2024-07-05"),
            ("fecha_fin", "2024-07-01"),
            ("dias", "3"),
        ]);
        assert!(shape_fields(RequestKind::Vacation, &reversed).is_err());
    }

    #[test]
    fn blank_optional_fields_become_null_and_unknown_fields_are_ignored() {
        let values = FormValues::collect([
            ("fecha_inicio", "2024-03-04"),
            ("fecha_fin", "2024-03-06"),
            ("motivo", "gripe"),
            ("documento", " "),
            ("campus", "norte"),
        ]);

        let fields = shape_fields(RequestKind::Incapacity, &values).unwrap();
        let names: Vec<_> = fields.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["fecha_inicio", "fecha_fin", "motivo", "documento"]);
        assert_eq!(fields[3].1, SqlValue::Null);
    }

    #[test]
    fn missing_required_field_names_its_label() {
        let values = FormValues::collect([("fecha", "2024-06-10")]);
        let err = shape_fields(RequestKind::Tardiness, &values).unwrap_err();
        assert_eq!(err, "El campo \"Hora de llegada\" es obligatorio");
    }
}
