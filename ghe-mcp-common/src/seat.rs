//! Consumed-license seat records.
//!
//! The consumed-licenses API is loose about which fields it returns for a
//! seat: older enterprises report a single `github_com_enterprise_role`,
//! newer ones a `github_com_enterprise_roles` list, and some report both.
//! [`RawSeat`] keeps the record exactly as received and [`CanonicalSeat`] is
//! the normalized shape everything downstream works with.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder used when a seat carries no license type.
pub const UNKNOWN_LICENSE_TYPE: &str = "Unknown";

/// One seat exactly as returned by the API.
///
/// Decoding never fails: anything that is not a JSON object becomes an empty
/// seat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct RawSeat(Map<String, Value>);

impl RawSeat {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    fn string(&self, key: &str) -> Option<String> {
        self.0.get(key).and_then(Value::as_str).map(str::to_string)
    }

    fn flag(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    fn count(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    /// String list field. Numbers are kept in their decimal form, anything
    /// else in the list is skipped. A non-list value counts as absent.
    fn strings(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<RawSeat> for Value {
    fn from(seat: RawSeat) -> Self {
        Value::Object(seat.0)
    }
}

impl From<Value> for RawSeat {
    /// Non-object values become an empty seat.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self(fields),
            _ => Self::default(),
        }
    }
}

/// Normalized consumed-license seat.
///
/// Every optional field has a determinate value: lists default to empty and
/// scalars to `null`. The two enterprise-role representations are merged into
/// `enterprise_roles`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSeat {
    #[serde(rename = "github_com_login")]
    pub login: Option<String>,
    #[serde(rename = "github_com_name")]
    pub name: Option<String>,
    pub license_type: String,
    #[serde(rename = "github_com_profile")]
    pub profile_url: Option<String>,
    #[serde(rename = "github_com_verified_domain_emails")]
    pub verified_domain_emails: Vec<String>,
    #[serde(rename = "github_com_saml_name_id")]
    pub saml_name_id: Option<String>,
    #[serde(rename = "github_com_two_factor_auth")]
    pub two_factor_auth: Option<bool>,
    #[serde(rename = "github_com_user")]
    pub is_github_com_user: Option<bool>,
    #[serde(rename = "enterprise_server_user")]
    pub is_enterprise_server_user: Option<bool>,
    #[serde(rename = "visual_studio_subscription_user")]
    pub is_visual_studio_subscription_user: Option<bool>,
    pub enterprise_server_user_ids: Vec<String>,
    /// Organization membership in `org:role` form.
    #[serde(rename = "github_com_member_roles")]
    pub member_roles: Vec<String>,
    #[serde(rename = "github_com_enterprise_roles")]
    pub enterprise_roles: Vec<String>,
    #[serde(rename = "github_com_orgs_with_pending_invites")]
    pub orgs_with_pending_invites: Vec<String>,
    pub enterprise_server_emails: Vec<String>,
    pub visual_studio_license_status: Option<String>,
    pub visual_studio_subscription_email: Option<String>,
    pub total_user_accounts: Option<u64>,
}

/// Normalize one raw seat. Never fails.
pub fn normalize(raw: &RawSeat) -> CanonicalSeat {
    CanonicalSeat {
        login: raw.string("github_com_login"),
        name: raw.string("github_com_name"),
        license_type: raw
            .string("license_type")
            .unwrap_or_else(|| UNKNOWN_LICENSE_TYPE.to_string()),
        profile_url: raw.string("github_com_profile"),
        verified_domain_emails: raw.strings("github_com_verified_domain_emails"),
        saml_name_id: raw.string("github_com_saml_name_id"),
        two_factor_auth: raw.flag("github_com_two_factor_auth"),
        is_github_com_user: raw.flag("github_com_user"),
        is_enterprise_server_user: raw.flag("enterprise_server_user"),
        is_visual_studio_subscription_user: raw.flag("visual_studio_subscription_user"),
        enterprise_server_user_ids: raw.strings("enterprise_server_user_ids"),
        member_roles: raw.strings("github_com_member_roles"),
        enterprise_roles: unify_roles(
            raw.strings("github_com_enterprise_roles"),
            raw.string("github_com_enterprise_role"),
        ),
        orgs_with_pending_invites: raw.strings("github_com_orgs_with_pending_invites"),
        enterprise_server_emails: raw.strings("enterprise_server_emails"),
        visual_studio_license_status: raw.string("visual_studio_license_status"),
        visual_studio_subscription_email: raw.string("visual_studio_subscription_email"),
        total_user_accounts: raw.count("total_user_accounts"),
    }
}

/// Plural list first, in its original order, then the singular role if the
/// list does not already contain it.
fn unify_roles(mut plural: Vec<String>, single: Option<String>) -> Vec<String> {
    if let Some(role) = single {
        if !plural.contains(&role) {
            plural.push(role);
        }
    }
    plural
}
