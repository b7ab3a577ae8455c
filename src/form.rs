//! Headless submit/validate/feedback shell shared by every request form.

use std::collections::BTreeMap;
use std::future::Future;

use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

pub const GENERIC_FAILURE_MESSAGE: &str = "Ocurrió un error al enviar la solicitud. Intenta de nuevo.";
pub const IN_PROGRESS_MESSAGE: &str = "La solicitud ya se está enviando";

/// Flat map of named field values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct FormValues(BTreeMap<String, String>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects pairs in order; a repeated name keeps its last value.
    pub fn collect<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut values = Self::new();
        for (name, value) in pairs {
            values.set(name, value);
        }
        values
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Trimmed value, `None` when missing or blank.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Why a submission did not go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Caught before any write.
    Validation,
    /// Reported by the store.
    Backend,
    /// The submit handler itself failed.
    Unexpected,
    InProgress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SubmitOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip)]
    failure: Option<FailureKind>,
}

impl SubmitOutcome {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            failure: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::failed(FailureKind::Validation, message)
    }

    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            failure: Some(kind),
        }
    }

    pub fn failure(&self) -> Option<FailureKind> {
        self.failure
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Success(String),
    Error(String),
}

#[derive(Debug, Clone)]
pub struct SubmissionForm {
    title: String,
    values: FormValues,
    submitting: bool,
    feedback: Option<Feedback>,
}

impl SubmissionForm {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            values: FormValues::new(),
            submitting: false,
            feedback: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn fill<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in pairs {
            self.values.set(name, value);
        }
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    /// Marks the form as submitting and hands out the values to send.
    /// Returns `None` while a previous submission has not finished.
    pub fn begin_submit(&mut self) -> Option<FormValues> {
        if self.submitting {
            return None;
        }
        self.submitting = true;
        self.feedback = None;
        Some(self.values.clone())
    }

    /// Records the handler's result. Fields are cleared only on success.
    pub fn finish_submit(&mut self, result: anyhow::Result<SubmitOutcome>) -> SubmitOutcome {
        self.submitting = false;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = ?e, form = %self.title, "Submit handler failed");
                SubmitOutcome::failed(FailureKind::Unexpected, GENERIC_FAILURE_MESSAGE)
            }
        };

        if outcome.success {
            self.values.clear();
            self.feedback = Some(Feedback::Success(outcome.message.clone()));
        } else {
            self.feedback = Some(Feedback::Error(outcome.message.clone()));
        }

        outcome
    }

    pub async fn submit<F, Fut>(&mut self, handler: F) -> SubmitOutcome
    where
        F: FnOnce(FormValues) -> Fut,
        Fut: Future<Output = anyhow::Result<SubmitOutcome>>,
    {
        let Some(values) = self.begin_submit() else {
            warn!(form = %self.title, "Submit ignored, already submitting");
            return SubmitOutcome::failed(FailureKind::InProgress, IN_PROGRESS_MESSAGE);
        };

        let result = handler(values).await;
        self.finish_submit(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn filled_form() -> SubmissionForm {
        let mut form = SubmissionForm::new("Solicitud de permiso");
        form.fill([("fecha_permiso", "2024-05-01"), ("motivo", "dentist")]);
        form
    }

    #[test]
    fn repeated_names_keep_the_last_value() {
        let values = FormValues::collect([("motivo", "first"), ("dias", "2"), ("motivo", "second")]);
        assert_eq!(values.get("motivo"), Some("second"));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn blank_values_read_as_missing() {
        let values = FormValues::collect([("motivo", "   ")]);
        assert_eq!(values.get("motivo"), None);
        assert_eq!(values.get("absent"), None);
    }

    #[actix_web::test]
    async fn success_clears_fields_and_shows_message() {
        let mut form = filled_form();

        let outcome = form
            .submit(|values| async move {
                assert_eq!(values.get("motivo"), Some("dentist"));
                Ok(SubmitOutcome::succeeded("Enviado"))
            })
            .await;

        assert!(outcome.success);
        assert!(form.values().is_empty());
        assert_eq!(form.feedback(), Some(&Feedback::Success("Enviado".into())));
        assert!(!form.is_submitting());
    }

    #[actix_web::test]
    async fn failure_keeps_fields_and_shows_handler_message() {
        let mut form = filled_form();

        let outcome = form
            .submit(|_| async { Ok(SubmitOutcome::rejected("X")) })
            .await;

        assert!(!outcome.success);
        assert_eq!(form.values().len(), 2);
        assert_eq!(form.feedback(), Some(&Feedback::Error("X".into())));
    }

    #[actix_web::test]
    async fn handler_error_shows_generic_message() {
        let mut form = filled_form();

        let outcome = form
            .submit(|_| async { Err(anyhow!("socket closed")) })
            .await;

        assert_eq!(outcome.failure(), Some(FailureKind::Unexpected));
        assert_eq!(outcome.message, GENERIC_FAILURE_MESSAGE);
        assert_eq!(form.values().len(), 2);
        assert_eq!(
            form.feedback(),
            Some(&Feedback::Error(GENERIC_FAILURE_MESSAGE.into()))
        );
    }

    #[test]
    fn second_submit_is_refused_while_the_first_is_pending() {
        let mut form = filled_form();

        assert!(form.begin_submit().is_some());
        assert!(form.is_submitting());
        assert!(form.begin_submit().is_none());

        form.finish_submit(Ok(SubmitOutcome::succeeded("ok")));
        assert!(!form.is_submitting());
        assert!(form.begin_submit().is_some());
    }
}
