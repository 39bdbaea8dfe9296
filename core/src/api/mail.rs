use crate::client::NessusClient;
use crate::error::Result;
use crate::types::MailSettings;

/// SMTP settings used for scan notifications.
pub struct MailApi<'a> {
    client: &'a NessusClient,
}

impl<'a> MailApi<'a> {
    pub fn new(client: &'a NessusClient) -> Self {
        Self { client }
    }

    pub fn view(&self) -> Result<MailSettings> {
        self.client
            .get("/settings/network/mail")
            .map_err(|e| super::map_status(e, || "mail settings".to_string()))?
            .decode()
    }

    pub fn change(&self, settings: &MailSettings) -> Result<()> {
        self.client
            .put("/settings/network/mail", settings)
            .map_err(|e| super::map_status(e, || "mail settings".to_string()))?;
        Ok(())
    }
}
