//! Request body validation against resource schemas.
//!
//! `validate_body` is a pure function: it checks shape, types and
//! required-ness for one kind and operation, collects every violation
//! rather than stopping at the first, and returns the normalised field map
//! (strings trimmed) on success.

use crate::resources::{FieldKind, FieldSpec, ResourceKind};
use common::types::FieldViolation;
use serde_json::{Map, Value};

/// Longest accepted text value, in characters.
pub const MAX_TEXT_LENGTH: usize = 255;

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Longest accepted password, in characters. bcrypt ignores bytes past 72.
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// Which write a body is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Every required field must be present.
    Create,
    /// Any subset of known fields, but at least one.
    Update,
}

/// Validate `body` for `kind` and `operation`.
///
/// Returns the normalised fields, or every violation found. Violations for
/// schema fields come first in schema order, followed by `id` and unknown
/// fields.
pub fn validate_body(
    kind: ResourceKind,
    operation: Operation,
    body: &Value,
) -> Result<Map<String, Value>, Vec<FieldViolation>> {
    let Some(object) = body.as_object() else {
        return Err(vec![FieldViolation::new(
            "body",
            "Request body must be a JSON object",
        )]);
    };

    let mut violations = Vec::new();
    let mut fields = Map::new();

    for spec in kind.schema() {
        match object.get(spec.name) {
            None => {
                if operation == Operation::Create && spec.required {
                    violations.push(FieldViolation::new(
                        spec.name,
                        format!("{} is required", spec.name),
                    ));
                }
            }
            Some(Value::Null) => {
                if spec.required {
                    violations.push(FieldViolation::new(
                        spec.name,
                        format!("{} cannot be null", spec.name),
                    ));
                } else {
                    fields.insert(spec.name.to_string(), Value::Null);
                }
            }
            Some(value) => match check_field(spec, value) {
                Ok(normalised) => {
                    fields.insert(spec.name.to_string(), normalised);
                }
                Err(message) => violations.push(FieldViolation::new(spec.name, message)),
            },
        }
    }

    for key in object.keys() {
        if key == "id" {
            violations.push(FieldViolation::new("id", "id cannot be set"));
        } else if kind.field(key).is_none() {
            violations.push(FieldViolation::new(
                key.as_str(),
                format!("{} is not a known {} field", key, kind.display_name()),
            ));
        }
    }

    if operation == Operation::Update && violations.is_empty() && fields.is_empty() {
        violations.push(FieldViolation::new(
            "body",
            "At least one field must be provided",
        ));
    }

    if violations.is_empty() {
        Ok(fields)
    } else {
        Err(violations)
    }
}

fn check_field(spec: &FieldSpec, value: &Value) -> Result<Value, String> {
    let name = spec.name;
    match spec.kind {
        FieldKind::Text => check_text(name, value).map(Value::String),
        FieldKind::Email => {
            let email = check_text(name, value)?;
            if looks_like_email(&email) {
                Ok(Value::String(email))
            } else {
                Err(format!("{name} must be a valid email address"))
            }
        }
        FieldKind::Password => {
            let password = value
                .as_str()
                .ok_or_else(|| format!("{name} must be a string"))?;
            let length = password.chars().count();
            if (MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
                Ok(Value::String(password.to_string()))
            } else {
                Err(format!(
                    "{name} must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH} characters"
                ))
            }
        }
        FieldKind::Number => match value.as_f64() {
            Some(number) if number.is_finite() && number >= 0.0 => Ok(value.clone()),
            _ => Err(format!("{name} must be a non-negative number")),
        },
        FieldKind::Boolean => value
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| format!("{name} must be a boolean")),
        FieldKind::Reference(_) => match value.as_i64() {
            Some(id) if id > 0 => Ok(Value::from(id)),
            _ => Err(format!("{name} must be a positive integer id")),
        },
        FieldKind::OneOf(options) => match value.as_str() {
            Some(choice) if options.contains(&choice) => Ok(Value::String(choice.to_string())),
            _ => Err(format!("{name} must be one of: {}", options.join(", "))),
        },
    }
}

fn check_text(name: &str, value: &Value) -> Result<String, String> {
    let text = value
        .as_str()
        .ok_or_else(|| format!("{name} must be a string"))?
        .trim();

    if text.is_empty() {
        return Err(format!("{name} must not be empty"));
    }

    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(format!(
            "{name} must be at most {MAX_TEXT_LENGTH} characters"
        ));
    }

    Ok(text.to_string())
}

fn looks_like_email(candidate: &str) -> bool {
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields_of(violations: &[FieldViolation]) -> Vec<&str> {
        violations.iter().map(|v| v.field.as_str()).collect()
    }

    #[test]
    fn test_valid_create_is_normalised() {
        let body = json!({
            "name": "  Ceres ",
            "size": 939.4,
            "composition": "rock and ice",
            "galaxyId": 1
        });

        let fields = validate_body(ResourceKind::Asteroid, Operation::Create, &body).unwrap();

        assert_eq!(fields["name"], "Ceres");
        assert_eq!(fields["size"], 939.4);
        assert_eq!(fields["galaxyId"], 1);
        assert!(!fields.contains_key("orbitalPeriod"));
    }

    #[test]
    fn test_create_reports_every_missing_required_field() {
        let violations =
            validate_body(ResourceKind::Galaxy, Operation::Create, &json!({})).unwrap_err();

        assert_eq!(fields_of(&violations), vec!["name", "type"]);
        assert_eq!(violations[0].message, "name is required");
    }

    #[test]
    fn test_violations_are_aggregated() {
        let body = json!({
            "name": "",
            "mass": -1,
            "hasRings": "yes",
            "starId": 0,
            "moons": 3
        });

        let violations = validate_body(ResourceKind::Planet, Operation::Create, &body).unwrap_err();

        assert_eq!(
            fields_of(&violations),
            vec!["name", "mass", "hasRings", "starId", "moons"]
        );
    }

    #[test]
    fn test_id_cannot_be_set() {
        let body = json!({"id": 7, "name": "Orion"});

        let violations =
            validate_body(ResourceKind::Constellation, Operation::Update, &body).unwrap_err();

        assert_eq!(fields_of(&violations), vec!["id"]);
    }

    #[test]
    fn test_update_allows_partial_body() {
        let body = json!({"luminosity": 25.4});

        let fields = validate_body(ResourceKind::Star, Operation::Update, &body).unwrap();

        assert_eq!(fields.len(), 1);
        assert_eq!(fields["luminosity"], 25.4);
    }

    #[test]
    fn test_update_requires_at_least_one_field() {
        let violations =
            validate_body(ResourceKind::Star, Operation::Update, &json!({})).unwrap_err();

        assert_eq!(fields_of(&violations), vec!["body"]);
    }

    #[test]
    fn test_non_object_body_is_rejected() {
        for body in [json!([]), json!("Ceres"), json!(null), json!(4)] {
            let violations =
                validate_body(ResourceKind::Asteroid, Operation::Create, &body).unwrap_err();
            assert_eq!(fields_of(&violations), vec!["body"]);
        }
    }

    #[test]
    fn test_null_clears_optional_but_not_required_fields() {
        let fields = validate_body(
            ResourceKind::Nebula,
            Operation::Update,
            &json!({"galaxyId": null}),
        )
        .unwrap();
        assert_eq!(fields["galaxyId"], Value::Null);

        let violations = validate_body(
            ResourceKind::Nebula,
            Operation::Update,
            &json!({"name": null}),
        )
        .unwrap_err();
        assert_eq!(violations[0].message, "name cannot be null");
    }

    #[test]
    fn test_text_length_limit() {
        let long_name = "x".repeat(MAX_TEXT_LENGTH + 1);
        let violations = validate_body(
            ResourceKind::Comet,
            Operation::Create,
            &json!({"name": long_name}),
        )
        .unwrap_err();
        assert_eq!(violations[0].message, "name must be at most 255 characters");

        let exact = "x".repeat(MAX_TEXT_LENGTH);
        assert!(validate_body(
            ResourceKind::Comet,
            Operation::Create,
            &json!({"name": exact})
        )
        .is_ok());
    }

    #[test]
    fn test_reference_must_be_an_integer() {
        for bad in [json!(1.5), json!("3"), json!(-2)] {
            let violations = validate_body(
                ResourceKind::Moon,
                Operation::Update,
                &json!({"planetId": bad}),
            )
            .unwrap_err();
            assert_eq!(violations[0].message, "planetId must be a positive integer id");
        }
    }

    #[test]
    fn test_user_fields() {
        let body = json!({
            "username": "vera",
            "email": "vera@rubin.org",
            "password": "dark-matter",
            "role": "admin"
        });
        let fields = validate_body(ResourceKind::User, Operation::Create, &body).unwrap();
        assert_eq!(fields["role"], "admin");

        let body = json!({
            "username": "vera",
            "email": "not-an-email",
            "password": "short",
            "role": "root"
        });
        let violations = validate_body(ResourceKind::User, Operation::Create, &body).unwrap_err();
        assert_eq!(fields_of(&violations), vec!["email", "password", "role"]);
        assert_eq!(violations[2].message, "role must be one of: user, admin");
    }

    #[test]
    fn test_email_shapes() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a@@b.co"));
        assert!(!looks_like_email("a b@c.io"));
        assert!(!looks_like_email("a@.io"));
    }
}
