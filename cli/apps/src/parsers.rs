//! Parsers for repeatable flag values.
//!
//! Values are validated before they are parsed, so parsers are lenient and
//! never fail on shapes the validators reject.

use crds::{EnvVar, WorkloadServiceClaimReference};

/// Split `key=value` into its parts, or `key-` into `(key, None)`.
pub fn deletable_key_value(input: &str) -> (String, Option<String>) {
    if !input.contains('=') {
        if let Some(key) = input.strip_suffix('-') {
            return (key.to_string(), None);
        }
    }
    match input.split_once('=') {
        Some((key, value)) => (key.to_string(), Some(value.to_string())),
        None => (input.to_string(), Some(String::new())),
    }
}

/// Parse `NAME=value` into an env var; `NAME-` yields a deletion.
pub fn deletable_env_var(input: &str) -> (EnvVar, bool) {
    match deletable_key_value(input) {
        (name, Some(value)) => (EnvVar::new(name, value), false),
        (name, None) => (EnvVar::new(name, ""), true),
    }
}

/// Parse `apiVersion:kind:name` or `apiVersion:kind:namespace:name`.
pub fn object_reference(input: &str) -> WorkloadServiceClaimReference {
    let parts: Vec<&str> = input.split(':').collect();
    let name = parts.last().copied().unwrap_or_default();
    WorkloadServiceClaimReference {
        api_version: parts.first().copied().unwrap_or_default().to_string(),
        kind: parts.get(1).copied().unwrap_or_default().to_string(),
        name: name.to_string(),
    }
}

/// Namespace of a cross-namespace reference, `None` for same-namespace ones.
pub fn object_reference_namespace(input: &str) -> Option<String> {
    let parts: Vec<&str> = input.split(':').collect();
    (parts.len() == 4).then(|| parts[2].to_string())
}

/// Parse a JSON or YAML document into a JSON value.
pub fn json_yaml_to_object(input: &str) -> Result<serde_json::Value, serde_yaml::Error> {
    serde_yaml::from_str(input)
}

/// Binary and decimal suffixes understood in resource quantities.
const QUANTITY_SUFFIXES: &[(&str, f64)] = &[
    ("Ki", 1024.0),
    ("Mi", 1_048_576.0),
    ("Gi", 1_073_741_824.0),
    ("Ti", 1_099_511_627_776.0),
    ("Pi", 1_125_899_906_842_624.0),
    ("Ei", 1_152_921_504_606_846_976.0),
    ("n", 1e-9),
    ("u", 1e-6),
    ("m", 1e-3),
    ("k", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
    ("E", 1e18),
];

/// Parse a Kubernetes resource quantity (`500m`, `1Gi`, `0.5`, `1e3`) into
/// its numeric value.
pub fn quantity(input: &str) -> Option<f64> {
    let input = input.trim();
    let number_len = input
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(input.len());
    let (number, suffix) = input.split_at(number_len);
    if number.is_empty() || number.starts_with('-') {
        return None;
    }
    let value: f64 = number.parse().ok()?;

    if suffix.is_empty() {
        return Some(value);
    }
    if let Some(&(_, scale)) = QUANTITY_SUFFIXES.iter().find(|(s, _)| *s == suffix) {
        return Some(value * scale);
    }
    let exponent = suffix.strip_prefix(['e', 'E'])?;
    let exponent: i32 = exponent.parse().ok()?;
    Some(value * 10f64.powi(exponent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletable_key_value() {
        assert_eq!(deletable_key_value("foo=bar"), ("foo".to_string(), Some("bar".to_string())));
        assert_eq!(deletable_key_value("foo=bar=baz"), ("foo".to_string(), Some("bar=baz".to_string())));
        assert_eq!(deletable_key_value("foo-"), ("foo".to_string(), None));
        assert_eq!(deletable_key_value("foo-=bar"), ("foo-".to_string(), Some("bar".to_string())));
    }

    #[test]
    fn test_deletable_env_var() {
        let (env, delete) = deletable_env_var("SPRING_PROFILES_ACTIVE=mysql");
        assert!(!delete);
        assert_eq!(env, EnvVar::new("SPRING_PROFILES_ACTIVE", "mysql"));

        let (env, delete) = deletable_env_var("OLD-");
        assert!(delete);
        assert_eq!(env.name, "OLD");
    }

    #[test]
    fn test_object_reference() {
        let same = object_reference("services.tanzu.vmware.com/v1alpha1:PostgreSQL:my-prod-db");
        assert_eq!(same.api_version, "services.tanzu.vmware.com/v1alpha1");
        assert_eq!(same.kind, "PostgreSQL");
        assert_eq!(same.name, "my-prod-db");
        assert_eq!(object_reference_namespace("services.tanzu.vmware.com/v1alpha1:PostgreSQL:my-prod-db"), None);

        let cross = "services.tanzu.vmware.com/v1alpha1:PostgreSQL:my-prod-ns:my-prod-db";
        assert_eq!(object_reference(cross).name, "my-prod-db");
        assert_eq!(object_reference_namespace(cross).as_deref(), Some("my-prod-ns"));
    }

    #[test]
    fn test_json_yaml_to_object() {
        let json = json_yaml_to_object(r#"{"artifactId": "spring-petclinic", "version": "2.6.0"}"#).unwrap();
        assert_eq!(json["artifactId"], "spring-petclinic");

        let yaml = json_yaml_to_object("- first\n- second\n").unwrap();
        assert_eq!(yaml, serde_json::json!(["first", "second"]));
    }

    #[test]
    fn test_quantity() {
        assert_eq!(quantity("500m"), Some(0.5));
        assert_eq!(quantity("1Gi"), Some(1_073_741_824.0));
        assert_eq!(quantity("2"), Some(2.0));
        assert_eq!(quantity("1e3"), Some(1_000.0));
        assert_eq!(quantity("1.5k"), Some(1_500.0));
        assert_eq!(quantity("abc"), None);
        assert_eq!(quantity("1Gb"), None);
        assert_eq!(quantity(""), None);
    }
}
