//! Live class meetings through the Zoom server-to-server OAuth API.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::entity::ZoomSettings;

const OAUTH_URL: &str = "https://zoom.us/oauth/token";
const API_URL: &str = "https://api.zoom.us/v2";

#[derive(Debug, Error)]
pub enum MeetingError {
    #[error("meeting provider is not configured")]
    NotConfigured,
    #[error("meeting provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("meeting provider rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct MeetingSettings<'a> {
    auto_recording: &'a str,
    join_before_host: bool,
}

#[derive(Debug, Serialize)]
struct CreateMeetingRequest<'a> {
    topic: &'a str,
    /// 2 = scheduled meeting
    #[serde(rename = "type")]
    kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<String>,
    duration: i64,
    settings: MeetingSettings<'a>,
}

#[derive(Debug, Deserialize)]
struct CreateMeetingResponse {
    id: serde_json::Value,
    join_url: String,
}

/// Meeting created at the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meeting {
    pub meeting_id: String,
    pub join_url: String,
}

pub struct MeetingClient {
    client: Client,
    settings: ZoomSettings,
    oauth_url: String,
    api_url: String,
}

impl MeetingClient {
    pub fn new(settings: ZoomSettings) -> Result<Self, MeetingError> {
        if !settings.is_configured() {
            return Err(MeetingError::NotConfigured);
        }
        Ok(Self {
            client: Client::new(),
            settings,
            oauth_url: OAUTH_URL.to_string(),
            api_url: API_URL.to_string(),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn access_token(&self) -> Result<String, MeetingError> {
        let response = self
            .client
            .post(&self.oauth_url)
            .basic_auth(&self.settings.client_id, Some(&self.settings.client_secret))
            .query(&[
                ("grant_type", "account_credentials"),
                ("account_id", self.settings.account_id.as_str()),
            ])
            .send()
            .await?;

        let token: TokenResponse = Self::checked(response).await?.json().await?;
        Ok(token.access_token)
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, MeetingError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(MeetingError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_meeting(
        &self,
        topic: &str,
        start_time: Option<DateTime<Utc>>,
        duration_minutes: i64,
    ) -> Result<Meeting, MeetingError> {
        let token = self.access_token().await?;
        let request = meeting_request(
            topic,
            start_time,
            duration_minutes,
            self.settings.recording_enabled,
        );

        let response = self
            .client
            .post(format!("{}/users/me/meetings", self.api_url))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        let created: CreateMeetingResponse = Self::checked(response).await?.json().await?;
        let meeting_id = match created.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };

        tracing::info!(%meeting_id, "meeting created");
        Ok(Meeting {
            meeting_id,
            join_url: created.join_url,
        })
    }
}

fn meeting_request(
    topic: &str,
    start_time: Option<DateTime<Utc>>,
    duration_minutes: i64,
    recording_enabled: bool,
) -> CreateMeetingRequest<'_> {
    CreateMeetingRequest {
        topic,
        kind: 2,
        start_time: start_time.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        duration: duration_minutes.max(1),
        settings: MeetingSettings {
            auto_recording: if recording_enabled { "cloud" } else { "none" },
            join_before_host: false,
        },
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    fn settings(secret: &str) -> ZoomSettings {
        ZoomSettings {
            account_id: String::from("acc"),
            client_id: String::from("cid"),
            client_secret: secret.to_string(),
            recording_enabled: true,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unconfigured_provider_is_rejected() {
        assert!(matches!(MeetingClient::new(settings("")), Err(MeetingError::NotConfigured)));
        assert!(MeetingClient::new(settings("secret")).is_ok());
    }

    #[test]
    fn request_body_shape() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let body = serde_json::to_value(meeting_request("Kickoff", Some(start), 0, true)).unwrap();
        assert_eq!(body["type"], 2);
        assert_eq!(body["start_time"], "2025-03-01T09:30:00Z");
        assert_eq!(body["duration"], 1);
        assert_eq!(body["settings"]["auto_recording"], "cloud");

        let body = serde_json::to_value(meeting_request("Open", None, 45, false)).unwrap();
        assert!(body.get("start_time").is_none());
        assert_eq!(body["settings"]["auto_recording"], "none");
    }
}
