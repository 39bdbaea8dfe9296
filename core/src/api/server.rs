use serde_json::Value;

use crate::client::NessusClient;
use crate::error::Result;
use crate::types::{RestartOptions, ServerStatus};

/// `/server` endpoints.
pub struct ServerApi<'a> {
    client: &'a NessusClient,
}

impl<'a> ServerApi<'a> {
    pub fn new(client: &'a NessusClient) -> Self {
        Self { client }
    }

    /// Server version, license and capabilities. Build and version numbers
    /// are only present with an established session.
    pub fn properties(&self) -> Result<Value> {
        self.client
            .get("/server/properties")
            .map_err(|e| super::map_status(e, || "server properties".to_string()))?
            .decode()
    }

    /// Works without a session.
    pub fn status(&self) -> Result<ServerStatus> {
        self.client
            .get("/server/status")
            .map_err(|e| super::map_status(e, || "server status".to_string()))?
            .decode()
    }

    pub fn restart(&self, options: &RestartOptions) -> Result<()> {
        self.client
            .post("/server/restart", options)
            .map_err(|e| super::map_status(e, || "server restart".to_string()))?;
        Ok(())
    }
}
