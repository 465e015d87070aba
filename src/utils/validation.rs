use crate::utils::error::{CalcError, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(CalcError::InvalidRecordError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(CalcError::InvalidRecordError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(CalcError::InvalidRecordError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CalcError::InvalidRecordError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_weight(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(CalcError::InvalidRecordError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Weight must be a finite, non-negative number".to_string(),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| CalcError::MissingFieldError {
        field: field_name.to_string(),
    })
}

/// Turns a reference-store slug into a display name, e.g. `saudi-arabia`
/// into `Saudi Arabia`.
pub fn display_name_from_slug(slug: &str) -> String {
    static WORD_START: OnceLock<Regex> = OnceLock::new();
    let re = WORD_START.get_or_init(|| Regex::new(r"\b[a-z]").expect("word-start pattern"));

    let spaced = slug.replace('-', " ");
    re.replace_all(&spaced, |caps: &regex::Captures| caps[0].to_uppercase())
        .into_owned()
}
