//! Endpoint facades.
//!
//! Each facade borrows a `NessusClient`, turns its arguments into a path and
//! body, and turns `NessusError::StatusCode` into the domain error that code
//! means for its resource.

mod agent_groups;
mod mail;
mod permissions;
mod server;
mod session;

pub use agent_groups::AgentGroupsApi;
pub use mail::MailApi;
pub use permissions::PermissionsApi;
pub use server::ServerApi;
pub use session::SessionApi;

use crate::error::NessusError;

/// Map the status codes shared by most endpoints; anything else passes
/// through unchanged.
pub(crate) fn map_status(err: NessusError, resource: impl FnOnce() -> String) -> NessusError {
    match err.status_code() {
        Some(401) => NessusError::Authentication(format!("not logged in ({})", resource())),
        Some(403) => NessusError::InsufficientPermissions(resource()),
        Some(404) => NessusError::NotFound(resource()),
        Some(500) => NessusError::InternalServer(resource()),
        _ => err,
    }
}
