//! Twilio SMS integration

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::{ChannelError, SmsSender, TwilioConfig};

/// Twilio Messages API client
pub struct TwilioSms {
    client: Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from: String,
}

impl TwilioSms {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from: from.into(),
        }
    }

    /// Build a client when SID, token and sender number are all present
    pub fn from_config(config: &TwilioConfig, client: Client) -> Option<Self> {
        let sid = config.account_sid.as_deref().filter(|s| !s.is_empty())?;
        let token = config.auth_token.as_deref().filter(|s| !s.is_empty())?;
        let from = config.phone_number.as_deref().filter(|s| !s.is_empty())?;
        Some(Self::new(client, config.base_url.clone(), sid, token, from))
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.account_sid
        )
    }
}

#[async_trait]
impl SmsSender for TwilioSms {
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), ChannelError> {
        let params = [("To", to), ("From", self.from.as_str()), ("Body", body)];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        info!("SMS sent to {}", to);
        Ok(())
    }
}
