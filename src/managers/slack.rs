use std::sync::Arc;

use async_trait::async_trait;
use fractic_server_error::ServerError;
use mockall::automock;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    context::SlackCtxView,
    errors::{SlackApiError, SlackCalloutError},
};

pub const SLACK_POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackNotificationPayload {
    pub text: String,
    pub channel: String,
}

/// Reply body of `chat.postMessage`. Slack answers HTTP 200 even for
/// rejected requests, signalling failure through `ok`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SlackPostMessageResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
}

#[automock]
#[async_trait]
pub trait SlackBackend: Send + Sync {
    async fn post_message(
        &self,
        token: String,
        payload: SlackNotificationPayload,
    ) -> Result<SlackPostMessageResponse, ServerError>;
}

#[async_trait]
impl SlackBackend for reqwest::Client {
    async fn post_message(
        &self,
        token: String,
        payload: SlackNotificationPayload,
    ) -> Result<SlackPostMessageResponse, ServerError> {
        self.post(SLACK_POST_MESSAGE_URL)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| SlackCalloutError::with_debug(&e))?
            .json::<SlackPostMessageResponse>()
            .await
            .map_err(|e| SlackCalloutError::with_debug(&e))
    }
}

#[derive(Clone)]
pub struct SlackManager {
    backend: Arc<dyn SlackBackend>,
    token: String,
}

impl SlackManager {
    pub async fn new(ctx: &impl SlackCtxView) -> Result<Self, ServerError> {
        Ok(Self::with_backend(
            Arc::new(reqwest::Client::new()),
            ctx.slack_bot_token().clone(),
        ))
    }

    pub fn with_backend(backend: Arc<dyn SlackBackend>, token: String) -> Self {
        Self { backend, token }
    }

    pub async fn send_notification(
        &self,
        payload: SlackNotificationPayload,
    ) -> Result<SlackPostMessageResponse, ServerError> {
        let channel = payload.channel.clone();
        let response = self
            .backend
            .post_message(self.token.clone(), payload)
            .await
            .map_err(|e| {
                error!(error = ?e, channel = %channel, "failed to send Slack notification");
                e
            })?;
        if !response.ok {
            let reason = response.error.as_deref().unwrap_or("unknown error");
            error!(reason, channel = %channel, "Slack rejected notification");
            return Err(SlackApiError::new(reason));
        }
        info!(channel = %channel, ts = ?response.ts, "Slack notification sent");
        Ok(response)
    }
}
