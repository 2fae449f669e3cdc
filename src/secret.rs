//! Resolution of the GitHub token referenced by the interceptor params.

use std::path::{Component, Path, PathBuf};

use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::envelope::parse_trigger_id;

/// Reference to a key inside a secret in the trigger's own namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecretRef {
    #[serde(alias = "name")]
    pub secret_name: String,
    pub secret_key: String,
}

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secretRef.secretKey is empty")]
    EmptyKey,
    #[error("secretRef.secretName is empty")]
    EmptyName,
    #[error("no namespace for secret {0}: trigger ID is missing or malformed")]
    MissingNamespace(String),
    #[error("invalid {field} {value:?}: must be a single path component")]
    InvalidComponent { field: &'static str, value: String },
    #[error("cannot read secret {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Source of secret values.
pub trait SecretGetter {
    fn get(&self, namespace: &str, secret: &SecretRef) -> Result<SecretString, SecretError>;
}

/// Reads secrets mounted as files: `<root>/<namespace>/<name>/<key>`.
#[derive(Debug, Clone)]
pub struct FileSecretGetter {
    root: PathBuf,
}

impl FileSecretGetter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SecretGetter for FileSecretGetter {
    fn get(&self, namespace: &str, secret: &SecretRef) -> Result<SecretString, SecretError> {
        let path = self
            .root
            .join(single_component("namespace", namespace)?)
            .join(single_component("secretRef.secretName", &secret.secret_name)?)
            .join(single_component("secretRef.secretKey", &secret.secret_key)?);
        debug!("reading secret from {}", path.display());
        let raw = std::fs::read_to_string(&path).map_err(|source| SecretError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(SecretString::from(raw.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// `value` as a path segment that stays directly below its parent: exactly
/// one normal component, so no root, prefix, `.`, `..` or separator.
fn single_component<'a>(field: &'static str, value: &'a str) -> Result<&'a Path, SecretError> {
    let path = Path::new(value);
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(c)), None) if c == path.as_os_str() => Ok(path),
        _ => Err(SecretError::InvalidComponent {
            field,
            value: value.to_string(),
        }),
    }
}

/// Resolve the API token for a request.
///
/// The secret is always looked up in the namespace named by the trigger ID.
/// No reference means anonymous access (`Ok(None)`). A reference that
/// cannot be resolved is an error. A secret that resolves to an empty value
/// also means anonymous access.
pub fn resolve_token(
    getter: &dyn SecretGetter,
    secret: Option<&SecretRef>,
    trigger_id: &str,
) -> Result<Option<SecretString>, SecretError> {
    let Some(secret) = secret else {
        return Ok(None);
    };
    if secret.secret_key.is_empty() {
        return Err(SecretError::EmptyKey);
    }
    if secret.secret_name.is_empty() {
        return Err(SecretError::EmptyName);
    }
    let namespace = parse_trigger_id(trigger_id)
        .map(|(ns, _)| ns)
        .filter(|ns| !ns.is_empty())
        .ok_or_else(|| SecretError::MissingNamespace(secret.secret_name.clone()))?;
    let token = getter.get(namespace, secret)?;
    if token.expose_secret().is_empty() {
        warn!(
            "secret {namespace}/{} resolved to an empty value, using anonymous access",
            secret.secret_name
        );
        return Ok(None);
    }
    Ok(Some(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret_ref(name: &str, key: &str) -> SecretRef {
        SecretRef {
            secret_name: name.into(),
            secret_key: key.into(),
        }
    }

    fn mount(root: &Path, ns: &str, name: &str, key: &str, value: &str) {
        let dir = root.join(ns).join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(key), value).unwrap();
    }

    #[test]
    fn deserializes_tekton_style_reference() {
        let r: SecretRef =
            serde_json::from_str(r#"{"secretName": "gh", "secretKey": "token"}"#).unwrap();
        assert_eq!(r, secret_ref("gh", "token"));
        // a namespace in the reference is not honoured
        let r: SecretRef = serde_json::from_str(
            r#"{"name": "gh", "secretKey": "token", "namespace": "other"}"#,
        )
        .unwrap();
        assert_eq!(r, secret_ref("gh", "token"));
    }

    #[test]
    fn no_reference_is_anonymous() {
        let getter = FileSecretGetter::new("/nonexistent");
        assert!(resolve_token(&getter, None, "").unwrap().is_none());
    }

    #[test]
    fn empty_key_rejected() {
        let getter = FileSecretGetter::new("/nonexistent");
        let err = resolve_token(&getter, Some(&secret_ref("gh", "")), "namespace/ci/triggers/t")
            .unwrap_err();
        assert!(matches!(err, SecretError::EmptyKey));
    }

    #[test]
    fn namespace_from_trigger_id() {
        let root = tempfile::tempdir().unwrap();
        mount(root.path(), "ci", "gh", "token", "s3cret\n");
        let getter = FileSecretGetter::new(root.path());
        let token = resolve_token(
            &getter,
            Some(&secret_ref("gh", "token")),
            "namespace/ci/triggers/owners",
        )
        .unwrap()
        .unwrap();
        assert_eq!(token.expose_secret(), "s3cret");
    }

    #[test]
    fn namespace_in_reference_cannot_redirect_lookup() {
        let root = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        mount(elsewhere.path(), "victim", "gh", "token", "OTHER_NS_TOKEN");
        let getter = FileSecretGetter::new(root.path());
        let r: SecretRef = serde_json::from_value(serde_json::json!({
            "secretName": "gh",
            "secretKey": "token",
            "namespace": elsewhere.path().join("victim"),
        }))
        .unwrap();
        let err = resolve_token(&getter, Some(&r), "namespace/ci/triggers/owners").unwrap_err();
        assert!(matches!(err, SecretError::Read { .. }));
    }

    #[test]
    fn key_cannot_walk_out_of_root() {
        let root = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        mount(elsewhere.path(), "victim", "gh", "token", "OTHER_NS_TOKEN");
        let getter = FileSecretGetter::new(root.path());
        let escape = format!(
            "../../../../{}/victim/gh/token",
            elsewhere.path().display()
        );
        let err = resolve_token(
            &getter,
            Some(&secret_ref("gh", &escape)),
            "namespace/ci/triggers/owners",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SecretError::InvalidComponent {
                field: "secretRef.secretKey",
                ..
            }
        ));
    }

    #[test]
    fn absolute_name_rejected() {
        let root = tempfile::tempdir().unwrap();
        let getter = FileSecretGetter::new(root.path());
        let err = getter
            .get("ci", &secret_ref("/etc", "passwd"))
            .unwrap_err();
        assert!(matches!(
            err,
            SecretError::InvalidComponent {
                field: "secretRef.secretName",
                ..
            }
        ));
    }

    #[test]
    fn dot_segments_rejected() {
        let getter = FileSecretGetter::new("/nonexistent");
        for bad in ["..", ".", "a/b", "gh/"] {
            assert!(
                matches!(
                    getter.get("ci", &secret_ref(bad, "token")),
                    Err(SecretError::InvalidComponent { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
        assert!(matches!(
            getter.get("..", &secret_ref("gh", "token")),
            Err(SecretError::InvalidComponent {
                field: "namespace",
                ..
            })
        ));
    }

    #[test]
    fn malformed_trigger_id_has_no_namespace() {
        let getter = FileSecretGetter::new("/nonexistent");
        let err = resolve_token(&getter, Some(&secret_ref("gh", "token")), "ci/owners")
            .unwrap_err();
        assert!(matches!(err, SecretError::MissingNamespace(_)));
    }

    #[test]
    fn unreadable_secret_is_error() {
        let root = tempfile::tempdir().unwrap();
        let getter = FileSecretGetter::new(root.path());
        let err = resolve_token(
            &getter,
            Some(&secret_ref("gh", "token")),
            "namespace/ci/triggers/owners",
        )
        .unwrap_err();
        assert!(matches!(err, SecretError::Read { .. }));
    }

    #[test]
    fn empty_secret_is_anonymous() {
        let root = tempfile::tempdir().unwrap();
        mount(root.path(), "ci", "gh", "token", "\n");
        let getter = FileSecretGetter::new(root.path());
        let token = resolve_token(
            &getter,
            Some(&secret_ref("gh", "token")),
            "namespace/ci/triggers/owners",
        )
        .unwrap();
        assert!(token.is_none());
    }
}
