use std::sync::OnceLock;

use regex::Regex;
use validator::{Validate, ValidationErrors};

use shared_models::error::{AppError, FieldError};

use crate::i18n::Locale;
use crate::state::AppState;

pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("invalid ({})", err.code));
                FieldError::new(camel_case(&field), message)
            })
        })
        .collect();
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

/// Request bodies are camelCase on the wire; report fields the same way.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Schema check run before any handler logic.
pub fn validate_body<T: Validate>(body: &T) -> Result<(), AppError> {
    body.validate()
        .map_err(|errors| AppError::validation("Validation error", field_errors(&errors)))
}

/// Same check, with the summary message in the caller's locale.
pub fn validate_request<T: Validate>(state: &AppState, locale: &Locale, body: &T) -> Result<(), AppError> {
    body.validate().map_err(|errors| {
        AppError::validation(
            state.t(locale.as_str(), "validation.error", "Validation error"),
            field_errors(&errors),
        )
    })
}

/// E.164-style phone numbers, optional leading `+`.
pub fn is_valid_phone(phone: &str) -> bool {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE
        .get_or_init(|| Regex::new(r"^\+?[1-9]\d{1,14}$").expect("static phone pattern"))
        .is_match(phone)
}
