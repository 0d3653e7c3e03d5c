//! ghe-mcp Common Types
//!
//! I/O-free types shared by the server: consumed-license seats and their
//! normalization, the aggregated license document, per-user views, and
//! protocol messages.

pub mod license;
pub mod membership;
pub mod protocol;
pub mod seat;

pub use license::{ConsumedLicenses, LicenseAggregate, LicenseSummary, RawLicenseAggregate, RawLicensePage};
pub use membership::{
    enterprise_roles_for, find_seat, organizations_for, parse_org_role, LookupError, UserAccess,
    UserOrganization,
};
pub use protocol::{
    Content, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ResourceContents, ResourceDefinition,
    ResourceTemplate, ToolDefinition, ToolResult, PROTOCOL_VERSION,
};
pub use seat::{normalize, CanonicalSeat, RawSeat, UNKNOWN_LICENSE_TYPE};
