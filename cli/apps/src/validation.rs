//! Flag value validators.
//!
//! Each validator returns the [`FieldErrors`] for one flag; callers chain
//! them with [`FieldErrors::also`] to report every problem at once.

use crate::parsers;
use crds::{FieldError, FieldErrors};
use regex::Regex;
use std::sync::LazyLock;

static DNS1123_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid DNS-1123 label pattern"));

static DNS1123_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("valid DNS-1123 subdomain pattern")
});

static ENV_VAR_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-._a-zA-Z][-._a-zA-Z0-9]*$").expect("valid env var name pattern"));

const DNS1123_LABEL_MAX: usize = 63;
const DNS1123_SUBDOMAIN_MAX: usize = 253;

/// Namespace names are DNS-1123 labels.
pub fn namespace(value: &str, field: &str) -> FieldErrors {
    if value.is_empty() {
        return FieldError::missing_field(field).into();
    }
    if value.len() > DNS1123_LABEL_MAX || !DNS1123_LABEL.is_match(value) {
        return FieldError::invalid_value(value, field).into();
    }
    FieldErrors::new()
}

/// Resource names are DNS-1123 subdomains.
pub fn k8s_name(value: &str, field: &str) -> FieldErrors {
    if value.is_empty() {
        return FieldError::missing_field(field).into();
    }
    if value.len() > DNS1123_SUBDOMAIN_MAX || !DNS1123_SUBDOMAIN.is_match(value) {
        return FieldError::invalid_value(value, field).into();
    }
    FieldErrors::new()
}

/// `key=value` pairs, or `key-` to remove a key.
pub fn deletable_key_values(values: &[String], field: &str) -> FieldErrors {
    let mut errs = FieldErrors::new();
    for (i, value) in values.iter().enumerate() {
        let (key, _) = parsers::deletable_key_value(value);
        let well_formed = !key.is_empty() && (value.contains('=') || value.ends_with('-'));
        if !well_formed {
            errs.push(FieldError::invalid_array_value(value, field, i));
        }
    }
    errs
}

/// `key=<json or yaml>` pairs, or `key-` to remove a key.
pub fn json_or_yaml_key_values(values: &[String], field: &str) -> FieldErrors {
    let mut errs = deletable_key_values(values, field);
    for (i, value) in values.iter().enumerate() {
        if let (_, Some(raw)) = parsers::deletable_key_value(value) {
            if parsers::json_yaml_to_object(&raw).is_err() {
                errs.push(FieldError::invalid_array_value(value, field, i));
            }
        }
    }
    errs
}

/// `NAME=value` env vars, or `NAME-` to remove one.
pub fn deletable_env_vars(values: &[String], field: &str) -> FieldErrors {
    let mut errs = FieldErrors::new();
    for (i, value) in values.iter().enumerate() {
        let (name, _) = parsers::deletable_key_value(value);
        let well_formed = (value.contains('=') || value.ends_with('-')) && ENV_VAR_NAME.is_match(&name);
        if !well_formed {
            errs.push(FieldError::invalid_array_value(value, field, i));
        }
    }
    errs
}

/// `name=apiVersion:kind:[namespace:]name`, or `name-` to remove a claim.
pub fn deletable_key_object_references(values: &[String], field: &str) -> FieldErrors {
    let mut errs = FieldErrors::new();
    for (i, value) in values.iter().enumerate() {
        let well_formed = match parsers::deletable_key_value(value) {
            (key, _) if key.is_empty() => false,
            (_, None) => true,
            (_, Some(reference)) => {
                let parts: Vec<&str> = reference.split(':').collect();
                matches!(parts.len(), 3 | 4) && parts.iter().all(|p| !p.is_empty())
            }
        };
        if !well_formed {
            errs.push(FieldError::invalid_array_value(value, field, i));
        }
    }
    errs
}

/// A parseable resource quantity.
pub fn quantity(value: &str, field: &str) -> FieldErrors {
    match parsers::quantity(value) {
        Some(_) => FieldErrors::new(),
        None => FieldError::invalid_value(value, field).into(),
    }
}

/// A request must not exceed its limit. Unparseable values are left to
/// [`quantity`].
pub fn compare_quantity(limit: &str, request: &str, field: &str) -> FieldErrors {
    match (parsers::quantity(limit), parsers::quantity(request)) {
        (Some(l), Some(r)) if r > l => {
            FieldError::generic(format!("{request} must be less than or equal to {limit}"), field).into()
        }
        _ => FieldErrors::new(),
    }
}

/// One of a fixed set of values.
pub fn one_of(value: &str, field: &str, allowed: &[&str]) -> FieldErrors {
    if allowed.contains(&value) {
        FieldErrors::new()
    } else {
        FieldError::enum_invalid_value(value, field, allowed).into()
    }
}
