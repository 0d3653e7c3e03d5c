//! Per-user views derived from the license aggregate.

use serde::{Deserialize, Serialize};

use crate::license::LicenseAggregate;
use crate::seat::CanonicalSeat;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("User not found: {0}")]
    UserNotFound(String),
}

/// An organization a seat belongs to, parsed from an `org:role` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOrganization {
    pub organization: String,
    pub role: String,
}

/// Organizations and enterprise roles of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccess {
    pub username: String,
    pub organizations: Vec<UserOrganization>,
    pub enterprise_roles: Vec<String>,
}

/// Split on the first `:`. Entries without one yield `None`.
pub fn parse_org_role(entry: &str) -> Option<UserOrganization> {
    entry
        .split_once(':')
        .map(|(organization, role)| UserOrganization {
            organization: organization.to_string(),
            role: role.to_string(),
        })
}

/// First seat whose login matches `username` exactly.
pub fn find_seat<'a>(
    aggregate: &'a LicenseAggregate,
    username: &str,
) -> Result<&'a CanonicalSeat, LookupError> {
    aggregate
        .seats
        .iter()
        .find(|seat| seat.login.as_deref() == Some(username))
        .ok_or_else(|| LookupError::UserNotFound(username.to_string()))
}

pub fn organizations_for(seat: &CanonicalSeat) -> Vec<UserOrganization> {
    seat.member_roles
        .iter()
        .filter_map(|entry| parse_org_role(entry))
        .collect()
}

pub fn enterprise_roles_for(seat: &CanonicalSeat) -> Vec<String> {
    seat.enterprise_roles.clone()
}

impl UserAccess {
    pub fn for_seat(username: &str, seat: &CanonicalSeat) -> Self {
        Self {
            username: username.to_string(),
            organizations: organizations_for(seat),
            enterprise_roles: enterprise_roles_for(seat),
        }
    }
}
