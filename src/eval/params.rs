use serde::Deserialize;

use crate::secret::SecretRef;

/// Caller-supplied switches controlling which membership checks run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorizationParams {
    pub secret_ref: Option<SecretRef>,
    /// Grant access to public members of the repository owner's organization.
    pub org_public_member_allowed: bool,
    /// Grant access to repository collaborators.
    #[serde(alias = "reviewersAllowed")]
    pub repo_member_allowed: bool,
}

impl AuthorizationParams {
    pub fn from_map(
        params: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(params.clone()))
    }
}
