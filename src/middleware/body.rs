//! Request-body field validation.
//!
//! A [`BodyValidator`] is built per handler from its declared rules and always
//! sits at position zero of the handler's chain, so a request with a missing
//! or malformed body never reaches user middleware.

use super::{Middleware, Next};
use crate::exception::AppError;
use crate::http::{HttpRequest, HttpResponse};
use axum::http::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

/// Runtime JSON type names a field can be required to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum PrimitiveType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl PrimitiveType {
    /// The type of `value`; `None` for `null`, which counts as absent.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(PrimitiveType::Boolean),
            Value::Number(_) => Some(PrimitiveType::Number),
            Value::String(_) => Some(PrimitiveType::String),
            Value::Array(_) => Some(PrimitiveType::Array),
            Value::Object(_) => Some(PrimitiveType::Object),
        }
    }
}

/// A required body field and its expected type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyRule {
    pub name: String,
    pub expected: PrimitiveType,
}

impl BodyRule {
    pub fn new(name: impl Into<String>, expected: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            expected,
        }
    }
}

/// The per-handler body gate.
///
/// Rules are checked in declaration order and the first failure wins. With
/// no rules the gate always proceeds, body or not.
#[derive(Debug, Clone, Default)]
pub struct BodyValidator {
    rules: Arc<[BodyRule]>,
}

impl BodyValidator {
    pub fn new(rules: impl IntoIterator<Item = BodyRule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    pub fn rules(&self) -> &[BodyRule] {
        &self.rules
    }

    pub fn check(&self, body: Option<&Value>) -> Result<(), AppError> {
        if self.rules.is_empty() {
            return Ok(());
        }
        let body = body.filter(|value| !value.is_null()).ok_or_else(|| {
            AppError::new(
                "The request does not contain any body values",
                StatusCode::NOT_ACCEPTABLE,
            )
            .operational()
        })?;

        for rule in self.rules.iter() {
            let found = body
                .get(&rule.name)
                .and_then(|value| PrimitiveType::of(value))
                .ok_or_else(|| {
                    AppError::bad_request(format!("Cannot find {} in the request body", rule.name))
                })?;
            if found != rule.expected {
                return Err(AppError::new(
                    format!(
                        "Type of the field \"{}\" must be {}. Instead found {}",
                        rule.name, rule.expected, found
                    ),
                    StatusCode::INTERNAL_SERVER_ERROR,
                ));
            }
        }
        Ok(())
    }
}

impl Middleware for BodyValidator {
    fn handle(&self, req: &mut HttpRequest, _: &mut HttpResponse, next: &mut Next) -> Result<(), AppError> {
        match self.check(req.body.as_ref()) {
            Ok(()) => next.proceed(),
            Err(error) => next.fail(error),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "BodyValidator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::exception::ExceptionFilter;
    use crate::exception::http::GlobalErrorFilter;
    use serde_json::json;

    fn widget_rules() -> BodyValidator {
        BodyValidator::new([
            BodyRule::new("title", PrimitiveType::String),
            BodyRule::new("age", PrimitiveType::Number),
        ])
    }

    #[test]
    fn test_empty_rules_always_pass() {
        assert!(BodyValidator::default().check(None).is_ok());
        assert!(BodyValidator::new([]).check(Some(&json!({}))).is_ok());
    }

    #[test]
    fn test_missing_body_is_406() {
        let err = widget_rules().check(None).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(err.message(), "The request does not contain any body values");
        assert!(err.is_operational());

        let err = widget_rules().check(Some(&Value::Null)).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_ACCEPTABLE);
    }

    #[test]
    fn test_missing_field_is_400() {
        let err = widget_rules().check(Some(&json!({}))).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Cannot find title in the request body");

        let err = widget_rules()
            .check(Some(&json!({ "title": "gear", "age": null })))
            .unwrap_err();
        assert_eq!(err.message(), "Cannot find age in the request body");
    }

    #[test]
    fn test_wrong_type_is_500() {
        let err = widget_rules()
            .check(Some(&json!({ "title": "gear", "age": "thirty" })))
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.message(),
            "Type of the field \"age\" must be number. Instead found string"
        );
        assert!(!err.is_operational());
    }

    async fn message(err: AppError) -> Value {
        let response = GlobalErrorFilter::new(Environment::Production).catch(&err);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice::<Value>(&bytes).unwrap()["message"].clone()
    }

    #[tokio::test]
    async fn test_production_hides_only_the_type_mismatch() {
        let mismatch = widget_rules().check(Some(&json!({ "title": "gear", "age": "thirty" })));
        assert_eq!(message(mismatch.unwrap_err()).await, "Something went wrong!");

        let missing = widget_rules().check(Some(&json!({ "title": "gear" })));
        assert_eq!(message(missing.unwrap_err()).await, "Cannot find age in the request body");

        let absent = widget_rules().check(None);
        assert_eq!(
            message(absent.unwrap_err()).await,
            "The request does not contain any body values"
        );
    }

    #[test]
    fn test_first_failing_rule_wins() {
        let err = widget_rules().check(Some(&json!({ "title": 42 }))).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message().contains("\"title\""));
    }

    #[test]
    fn test_valid_body_passes() {
        assert!(widget_rules()
            .check(Some(&json!({ "title": "gear", "age": 3, "extra": [1] })))
            .is_ok());
    }

    #[test]
    fn test_primitive_names() {
        assert_eq!(PrimitiveType::of(&json!([1])), Some(PrimitiveType::Array));
        assert_eq!(PrimitiveType::of(&Value::Null), None);
        assert_eq!("boolean".parse::<PrimitiveType>().unwrap(), PrimitiveType::Boolean);
        assert_eq!(PrimitiveType::Object.to_string(), "object");
    }
}
