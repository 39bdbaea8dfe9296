use serde_json::json;

use crate::client::NessusClient;
use crate::error::Result;
use crate::types::Permission;

/// Access control lists of scans, policies and other objects.
pub struct PermissionsApi<'a> {
    client: &'a NessusClient,
}

impl<'a> PermissionsApi<'a> {
    pub fn new(client: &'a NessusClient) -> Self {
        Self { client }
    }

    /// Replace the permissions of an object.
    pub fn change(&self, object_type: &str, object_id: u64, permissions: &[Permission]) -> Result<()> {
        self.client
            .put(
                &format!("/permissions/{object_type}/{object_id}"),
                &json!({ "acls": permissions }),
            )
            .map_err(|e| super::map_status(e, || format!("{object_type} (ID: {object_id})")))?;
        Ok(())
    }

    pub fn list(&self, object_type: &str, object_id: u64) -> Result<Vec<Permission>> {
        self.client
            .get(&format!("/permissions/{object_type}/{object_id}"))
            .map_err(|e| super::map_status(e, || format!("{object_type} (ID: {object_id})")))?
            .decode()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::api::tests::client;
    use crate::error::NessusError;
    use crate::http::testing::ScriptedTransport;
    use crate::http::HttpMethod;

    fn acl() -> Permission {
        Permission {
            kind: "user".to_string(),
            permissions: 64,
            id: Some(2),
            name: Some("analyst".to_string()),
            owner: None,
        }
    }

    #[test]
    fn change_puts_acls() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, ""));
        PermissionsApi::new(&client(&transport)).change("scan", 5, &[acl()]).unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(request.url, "https://127.0.0.1:8834/permissions/scan/5");
        assert_eq!(
            request.body.as_deref(),
            Some(r#"{"acls":[{"id":2,"name":"analyst","permissions":64,"type":"user"}]}"#)
        );
    }

    #[test]
    fn change_maps_forbidden_and_missing() {
        let transport = Arc::new(ScriptedTransport::new().respond(403, "").respond(404, ""));
        let c = client(&transport);
        let api = PermissionsApi::new(&c);
        assert!(matches!(
            api.change("scan", 5, &[acl()]).unwrap_err(),
            NessusError::InsufficientPermissions(_)
        ));
        match api.change("scan", 6, &[acl()]).unwrap_err() {
            NessusError::NotFound(what) => assert_eq!(what, "scan (ID: 6)"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn list_decodes_acls() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, r#"[{"type":"default","permissions":16},{"type":"user","permissions":128,"id":1,"name":"admin","owner":1}]"#),
        );
        let acls = PermissionsApi::new(&client(&transport)).list("scan", 5).unwrap();
        assert_eq!(acls.len(), 2);
        assert_eq!(acls[1].owner, Some(1));
    }
}
