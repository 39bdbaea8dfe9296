//! Entry point bundling a client with its endpoint facades.

use crate::api::{AgentGroupsApi, MailApi, PermissionsApi, ServerApi, SessionApi};
use crate::auth::{AuthOptions, AuthOutcome, Authenticator, Credentials};
use crate::client::NessusClient;
use crate::config::ClientConfig;
use crate::error::Result;

/// A Nessus server.
///
/// ```no_run
/// use nessus_core::{AuthOptions, Credentials, Nessus};
///
/// let nessus = Nessus::new("https://127.0.0.1:8834")?;
/// nessus.authenticate(&Credentials::user_pass("admin", "secret"), AuthOptions::default())?;
/// println!("{}", nessus.server().status()?.status);
/// nessus.logout()?;
/// # Ok::<(), nessus_core::NessusError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Nessus {
    client: NessusClient,
}

impl Nessus {
    /// Default settings on the process-wide session.
    pub fn new(server_url: &str) -> Result<Self> {
        Ok(Self::from_client(NessusClient::new(server_url)?))
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::from_client(NessusClient::from_config(config))
    }

    pub fn from_client(client: NessusClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &NessusClient {
        &self.client
    }

    pub fn authenticate(&self, credentials: &Credentials, options: AuthOptions) -> Result<AuthOutcome> {
        Authenticator::new(&self.client).authenticate(credentials, options)
    }

    /// Destroy the session and reset the headers. Fails with
    /// `Authentication` when there is no session.
    pub fn logout(&self) -> Result<()> {
        self.session().destroy()
    }

    pub fn session(&self) -> SessionApi<'_> {
        SessionApi::new(&self.client)
    }

    pub fn server(&self) -> ServerApi<'_> {
        ServerApi::new(&self.client)
    }

    pub fn permissions(&self) -> PermissionsApi<'_> {
        PermissionsApi::new(&self.client)
    }

    pub fn mail(&self) -> MailApi<'_> {
        MailApi::new(&self.client)
    }

    pub fn agent_groups(&self) -> AgentGroupsApi<'_> {
        AgentGroupsApi::new(&self.client)
    }
}
