use std::collections::BTreeSet;

use serde_json::json;

use crate::client::NessusClient;
use crate::error::Result;
use crate::http::HttpMethod;
use crate::types::{AgentGroup, AgentGroupList, BulkIds};

/// Agent groups live under a scanner; a standalone Nessus only has the
/// local one.
pub const LOCAL_SCANNER_ID: u64 = 1;

pub struct AgentGroupsApi<'a> {
    client: &'a NessusClient,
    scanner_id: u64,
}

impl<'a> AgentGroupsApi<'a> {
    pub fn new(client: &'a NessusClient) -> Self {
        Self::for_scanner(client, LOCAL_SCANNER_ID)
    }

    pub fn for_scanner(client: &'a NessusClient, scanner_id: u64) -> Self {
        Self { client, scanner_id }
    }

    fn path(&self, suffix: &str) -> String {
        format!("/scanners/{}/agent-groups{suffix}", self.scanner_id)
    }

    pub fn list(&self) -> Result<Vec<AgentGroup>> {
        let list: AgentGroupList = self
            .client
            .get(&self.path(""))
            .map_err(|e| super::map_status(e, || "agent groups".to_string()))?
            .decode()?;
        Ok(list.groups)
    }

    pub fn details(&self, group_id: u64) -> Result<AgentGroup> {
        self.client
            .get(&self.path(&format!("/{group_id}")))
            .map_err(|e| super::map_status(e, || group(group_id)))?
            .decode()
    }

    pub fn create(&self, name: &str) -> Result<AgentGroup> {
        self.client
            .post(&self.path(""), &json!({ "name": name }))
            .map_err(|e| super::map_status(e, || format!("agent group {name:?}")))?
            .decode()
    }

    /// Rename a group.
    pub fn configure(&self, group_id: u64, name: &str) -> Result<()> {
        self.client
            .put(&self.path(&format!("/{group_id}")), &json!({ "name": name }))
            .map_err(|e| super::map_status(e, || group(group_id)))?;
        Ok(())
    }

    pub fn delete_group(&self, group_id: u64) -> Result<()> {
        self.client
            .delete(&self.path(&format!("/{group_id}")))
            .map_err(|e| super::map_status(e, || group(group_id)))?;
        Ok(())
    }

    pub fn delete_groups(&self, group_ids: &BTreeSet<u64>) -> Result<()> {
        self.client
            .execute(
                HttpMethod::Delete,
                &self.path(""),
                &BulkIds { ids: group_ids },
            )
            .map_err(|e| super::map_status(e, || format!("agent groups {group_ids:?}")))?;
        Ok(())
    }

    pub fn add_agent(&self, group_id: u64, agent_id: u64) -> Result<()> {
        self.client
            .put(&self.path(&format!("/{group_id}/agents/{agent_id}")), &())
            .map_err(|e| super::map_status(e, || agent(group_id, agent_id)))?;
        Ok(())
    }

    pub fn add_agents(&self, group_id: u64, agent_ids: &BTreeSet<u64>) -> Result<()> {
        self.client
            .put(&self.path(&format!("/{group_id}/agents")), &BulkIds { ids: agent_ids })
            .map_err(|e| super::map_status(e, || group(group_id)))?;
        Ok(())
    }

    pub fn delete_agent(&self, group_id: u64, agent_id: u64) -> Result<()> {
        self.client
            .delete(&self.path(&format!("/{group_id}/agents/{agent_id}")))
            .map_err(|e| super::map_status(e, || agent(group_id, agent_id)))?;
        Ok(())
    }

    pub fn delete_agents(&self, group_id: u64, agent_ids: &BTreeSet<u64>) -> Result<()> {
        self.client
            .execute(
                HttpMethod::Delete,
                &self.path(&format!("/{group_id}/agents")),
                &BulkIds { ids: agent_ids },
            )
            .map_err(|e| super::map_status(e, || group(group_id)))?;
        Ok(())
    }
}

fn group(group_id: u64) -> String {
    format!("agent group (ID: {group_id})")
}

fn agent(group_id: u64, agent_id: u64) -> String {
    format!("agent (ID: {agent_id}) in agent group (ID: {group_id})")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::api::tests::client;
    use crate::error::NessusError;
    use crate::http::testing::ScriptedTransport;

    #[test]
    fn list_unwraps_groups() {
        let transport = Arc::new(
            ScriptedTransport::new().respond(200, r#"{"groups":[{"id":1,"name":"linux"},{"id":2,"name":"windows"}]}"#),
        );
        let groups = AgentGroupsApi::new(&client(&transport)).list().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].name, "windows");
        assert_eq!(
            transport.requests()[0].url,
            "https://127.0.0.1:8834/scanners/1/agent-groups"
        );
    }

    #[test]
    fn bulk_delete_sends_ids_in_body() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, ""));
        let ids = BTreeSet::from([4, 2, 4]);
        AgentGroupsApi::new(&client(&transport)).delete_groups(&ids).unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.method, HttpMethod::Delete);
        assert_eq!(request.body.as_deref(), Some(r#"{"ids":[2,4]}"#));
    }

    #[test]
    fn single_delete_has_no_body() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, ""));
        AgentGroupsApi::for_scanner(&client(&transport), 7)
            .delete_agent(3, 9)
            .unwrap();
        let request = &transport.requests()[0];
        assert_eq!(
            request.url,
            "https://127.0.0.1:8834/scanners/7/agent-groups/3/agents/9"
        );
        assert!(request.body.is_none());
    }

    #[test]
    fn status_codes_map_to_domain_errors() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(404, "")
                .respond(403, "")
                .respond(500, ""),
        );
        let c = client(&transport);
        let api = AgentGroupsApi::new(&c);
        match api.details(12).unwrap_err() {
            NessusError::NotFound(what) => assert_eq!(what, "agent group (ID: 12)"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            api.configure(12, "renamed").unwrap_err(),
            NessusError::InsufficientPermissions(_)
        ));
        assert!(matches!(
            api.create("new").unwrap_err(),
            NessusError::InternalServer(_)
        ));
    }
}
