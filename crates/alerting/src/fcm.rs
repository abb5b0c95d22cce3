//! Firebase Cloud Messaging (HTTP v1) integration

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::{ChannelError, FirebaseConfig, PushSender};

/// FCM client for high-priority alarm notifications
pub struct FcmPush {
    client: Client,
    base_url: String,
    project_id: String,
    access_token: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    message: Message<'a>,
}

#[derive(Serialize)]
struct Message<'a> {
    token: &'a str,
    notification: Notification<'a>,
    data: AlertData,
    android: AndroidConfig,
    apns: ApnsConfig,
}

#[derive(Serialize)]
struct Notification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Serialize)]
struct AlertData {
    #[serde(rename = "type")]
    kind: &'static str,
    priority: &'static str,
    sound: &'static str,
}

#[derive(Serialize)]
struct AndroidConfig {
    priority: &'static str,
    notification: AndroidNotification,
}

#[derive(Serialize)]
struct AndroidNotification {
    sound: &'static str,
    channel_id: &'static str,
}

#[derive(Serialize)]
struct ApnsConfig {
    payload: ApnsPayload,
}

#[derive(Serialize)]
struct ApnsPayload {
    aps: Aps,
}

#[derive(Serialize)]
struct Aps {
    sound: &'static str,
    badge: u32,
}

impl FcmPush {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            project_id: project_id.into(),
            access_token: access_token.into(),
        }
    }

    /// Build a client when project id and access token are present
    pub fn from_config(config: &FirebaseConfig, client: Client) -> Option<Self> {
        let project = config.project_id.as_deref().filter(|s| !s.is_empty())?;
        let token = config.access_token.as_deref().filter(|s| !s.is_empty())?;
        Some(Self::new(client, config.base_url.clone(), project, token))
    }

    fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.base_url.trim_end_matches('/'),
            self.project_id
        )
    }

    fn build_request<'a>(token: &'a str, title: &'a str, body: &'a str) -> SendRequest<'a> {
        SendRequest {
            message: Message {
                token,
                notification: Notification { title, body },
                data: AlertData {
                    kind: "weapon_detection",
                    priority: "high",
                    sound: "alarm.mp3",
                },
                android: AndroidConfig {
                    priority: "high",
                    notification: AndroidNotification {
                        sound: "alarm",
                        channel_id: "weapon_alerts",
                    },
                },
                apns: ApnsConfig {
                    payload: ApnsPayload {
                        aps: Aps {
                            sound: "alarm.aiff",
                            badge: 1,
                        },
                    },
                },
            },
        }
    }
}

#[async_trait]
impl PushSender for FcmPush {
    async fn send_push(&self, token: &str, title: &str, body: &str) -> Result<(), ChannelError> {
        let request = Self::build_request(token, title, body);

        let response = self
            .client
            .post(self.send_url())
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ChannelError::Provider {
                status: status.as_u16(),
                body: text,
            });
        }

        info!("Push notification sent: {}", text);
        Ok(())
    }
}
