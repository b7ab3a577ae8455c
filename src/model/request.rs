use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::listing::Listable;
use crate::utils::db_utils::SqlValue;

/// HR request types, one table each.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestKind {
    Vacation,
    Permission,
    Incapacity,
    Tardiness,
    Birthday,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// `YYYY-MM-DD`
    Date,
    /// `HH:MM`
    Time,
    /// positive whole number
    Count,
    Text,
    /// storage object path of an uploaded file
    Attachment,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
}

const fn field(name: &'static str, label: &'static str, field_type: FieldType, required: bool) -> FieldSpec {
    FieldSpec {
        name,
        label,
        field_type,
        required,
    }
}

const VACATION_FIELDS: &[FieldSpec] = &[
    field("fecha_inicio", "Fecha de inicio", FieldType::Date, true),
    field("fecha_fin", "Fecha de fin", FieldType::Date, true),
    field("dias", "Días solicitados", FieldType::Count, true),
    field("motivo", "Motivo", FieldType::Text, false),
];

const PERMISSION_FIELDS: &[FieldSpec] = &[
    field("fecha_permiso", "Fecha del permiso", FieldType::Date, true),
    field("hora_inicio", "Hora de inicio", FieldType::Time, true),
    field("hora_fin", "Hora de fin", FieldType::Time, true),
    field("motivo", "Motivo", FieldType::Text, true),
];

const INCAPACITY_FIELDS: &[FieldSpec] = &[
    field("fecha_inicio", "Fecha de inicio", FieldType::Date, true),
    field("fecha_fin", "Fecha de fin", FieldType::Date, true),
    field("motivo", "Motivo", FieldType::Text, true),
    field("documento", "Comprobante", FieldType::Attachment, false),
];

const TARDINESS_FIELDS: &[FieldSpec] = &[
    field("fecha", "Fecha", FieldType::Date, true),
    field("hora_llegada", "Hora de llegada", FieldType::Time, true),
    field("motivo", "Motivo", FieldType::Text, true),
];

const BIRTHDAY_FIELDS: &[FieldSpec] = &[
    field("fecha", "Fecha", FieldType::Date, true),
    field("motivo", "Comentarios", FieldType::Text, false),
];

/// Start/end pair that must be ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRange {
    Dates(&'static str, &'static str),
    Hours(&'static str, &'static str),
}

impl RequestKind {
    pub fn table(self) -> &'static str {
        match self {
            RequestKind::Vacation => "solicitudes_vacaciones",
            RequestKind::Permission => "solicitudes_permiso",
            RequestKind::Incapacity => "solicitudes_incapacidad",
            RequestKind::Tardiness => "solicitudes_retardo",
            RequestKind::Birthday => "solicitudes_cumpleanos",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            RequestKind::Vacation => "Solicitud de vacaciones",
            RequestKind::Permission => "Solicitud de permiso",
            RequestKind::Incapacity => "Solicitud de incapacidad",
            RequestKind::Tardiness => "Solicitud de justificación de retardo",
            RequestKind::Birthday => "Solicitud de día de cumpleaños",
        }
    }

    pub fn success_message(self) -> String {
        format!("{} enviada correctamente", self.title())
    }

    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            RequestKind::Vacation => VACATION_FIELDS,
            RequestKind::Permission => PERMISSION_FIELDS,
            RequestKind::Incapacity => INCAPACITY_FIELDS,
            RequestKind::Tardiness => TARDINESS_FIELDS,
            RequestKind::Birthday => BIRTHDAY_FIELDS,
        }
    }

    pub fn range(self) -> Option<FieldRange> {
        match self {
            RequestKind::Vacation | RequestKind::Incapacity => {
                Some(FieldRange::Dates("fecha_inicio", "fecha_fin"))
            }
            RequestKind::Permission => Some(FieldRange::Hours("hora_inicio", "hora_fin")),
            RequestKind::Tardiness | RequestKind::Birthday => None,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Shaped row ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRequest {
    pub kind: RequestKind,
    pub employee_id: u64,
    pub approver_id: u64,
    pub fields: Vec<(&'static str, SqlValue)>,
}

/// Listing row joined with the employee's display name.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct RequestRow {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 1001)]
    pub approver_id: u64,
    #[schema(example = "Ana López", nullable = true)]
    pub employee_name: Option<String>,
    #[schema(example = "dentist", nullable = true)]
    pub motivo: Option<String>,
    #[schema(example = "pending", nullable = true)]
    pub status: Option<String>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: Option<DateTime<Utc>>,
}

impl RequestRow {
    /// NULL status reads as pending.
    pub fn status_label(&self) -> &str {
        self.status.as_deref().unwrap_or("pending")
    }
}

impl Listable for RequestRow {
    fn search_fields(&self) -> Vec<&str> {
        [self.employee_name.as_deref(), self.motivo.as_deref()]
            .into_iter()
            .flatten()
            .collect()
    }

    fn category(&self) -> Option<&str> {
        Some(self.status_label())
    }
}
