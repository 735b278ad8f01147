use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    error::{PlayerError, Result},
    facade::PlayerApi,
    target::PlaybackTarget,
    types::{GroupHandle, PlayerId, RepeatMode},
};

/// Facade implementation speaking JSON over HTTP to the external
/// device-control service.
///
/// Every command is one small POST; the service owns device transport,
/// announcement suspend/resume, and group synchronization.
pub struct HttpPlayerApi {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpPlayerApi {
    pub fn new(base_url: String, api_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        }
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// POST `body` to `path`, mapping non-2xx answers to `Command` errors.
    async fn post(&self, path: &str, target: &str, body: serde_json::Value) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "sending device command");
        let resp = self
            .apply_auth(self.client.post(&url).json(&body))
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            warn!(status, target = %target, body = %text, "device command rejected");
            return Err(PlayerError::Command {
                target: target.to_string(),
                reason: format!("HTTP {status}: {text}"),
            });
        }
        Ok(resp)
    }
}

#[derive(Deserialize)]
struct GroupResponse {
    group_id: String,
}

#[async_trait]
impl PlayerApi for HttpPlayerApi {
    async fn set_volume(&self, player: &PlayerId, volume: u8) -> Result<()> {
        self.post(
            &format!("/players/{player}/volume"),
            player.as_str(),
            json!({ "volume": volume }),
        )
        .await?;
        Ok(())
    }

    async fn group_players(
        &self,
        primary: &PlayerId,
        members: &[PlayerId],
    ) -> Result<GroupHandle> {
        let resp = self
            .post(
                &format!("/players/{primary}/group"),
                primary.as_str(),
                json!({ "members": members }),
            )
            .await?;
        let group: GroupResponse = resp
            .json()
            .await
            .map_err(|e| PlayerError::BadResponse(e.to_string()))?;
        Ok(GroupHandle(group.group_id))
    }

    async fn ungroup(&self, group: &GroupHandle) -> Result<()> {
        self.post(
            &format!("/groups/{group}/ungroup"),
            group.as_str(),
            json!({}),
        )
        .await?;
        Ok(())
    }

    async fn set_repeat(&self, target: &PlaybackTarget, mode: RepeatMode) -> Result<()> {
        self.post(
            &format!("/queues/{}/repeat", target.id()),
            target.id(),
            json!({ "repeat": mode }),
        )
        .await?;
        Ok(())
    }

    async fn set_shuffle(&self, target: &PlaybackTarget, shuffle: bool) -> Result<()> {
        self.post(
            &format!("/queues/{}/shuffle", target.id()),
            target.id(),
            json!({ "shuffle": shuffle }),
        )
        .await?;
        Ok(())
    }

    async fn enqueue_replace(&self, target: &PlaybackTarget, items: &[String]) -> Result<()> {
        self.post(
            &format!("/queues/{}/play", target.id()),
            target.id(),
            json!({ "items": items, "enqueue": "replace" }),
        )
        .await?;
        Ok(())
    }

    async fn stop(&self, target: &PlaybackTarget) -> Result<()> {
        self.post(
            &format!("/players/{}/stop", target.id()),
            target.id(),
            json!({}),
        )
        .await?;
        Ok(())
    }

    async fn play_announcement(&self, player: &PlayerId, asset_uri: &str) -> Result<()> {
        self.post(
            &format!("/players/{player}/announce"),
            player.as_str(),
            json!({ "url": asset_uri }),
        )
        .await?;
        Ok(())
    }
}
