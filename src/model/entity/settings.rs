//! Singleton configuration rows editable by admins. Secrets are accepted on
//! update but never serialized back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::model::{DatabaseError, DatabaseResult, ModelManager, ResourceType, ResourceTyped};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct SmtpSettings {
    pub host: String,
    pub port: i32,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub sender_email: String,
    pub sender_name: String,
    pub use_tls: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SmtpSettingsUpdate {
    pub host: String,
    pub port: i32,
    #[serde(default)]
    pub username: String,
    /// Keeps the stored password when omitted.
    pub password: Option<String>,
    pub sender_email: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default = "default_true")]
    pub use_tls: bool,
}

fn default_true() -> bool {
    true
}

impl SmtpSettings {
    pub fn is_configured(&self) -> bool {
        !self.host.is_empty() && !self.sender_email.is_empty()
    }

    pub async fn get(mm: &ModelManager) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            "SELECT host, port, username, password, sender_email, sender_name, use_tls, updated_at FROM smtp_settings WHERE id = 1",
        )
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }

    pub async fn save(mm: &ModelManager, data: SmtpSettingsUpdate) -> DatabaseResult<Self> {
        if !(1..=65535).contains(&data.port) {
            return Err(DatabaseError::validation("port must be within 1..=65535"));
        }
        if !data.sender_email.is_empty() && !data.sender_email.contains('@') {
            return Err(DatabaseError::validation("sender_email is not an email address"));
        }

        let row = sqlx::query_as(
            r#"
            UPDATE smtp_settings
            SET host = $1, port = $2, username = $3, password = COALESCE($4, password),
                sender_email = $5, sender_name = $6, use_tls = $7, updated_at = now()
            WHERE id = 1
            RETURNING host, port, username, password, sender_email, sender_name, use_tls, updated_at
            "#,
        )
        .bind(data.host.trim())
        .bind(data.port)
        .bind(&data.username)
        .bind(&data.password)
        .bind(data.sender_email.trim())
        .bind(&data.sender_name)
        .bind(data.use_tls)
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    S3,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::S3 => "s3",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct StorageSettings {
    pub kind: String,
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    #[serde(skip_serializing, default)]
    pub secret_key: String,
    pub base_url: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StorageSettingsUpdate {
    pub kind: StorageKind,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub access_key: String,
    /// Keeps the stored secret when omitted.
    pub secret_key: Option<String>,
    #[serde(default)]
    pub base_url: String,
}

impl StorageSettings {
    pub async fn get(mm: &ModelManager) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            "SELECT kind, bucket, region, access_key, secret_key, base_url, updated_at FROM storage_settings WHERE id = 1",
        )
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }

    pub async fn save(mm: &ModelManager, data: StorageSettingsUpdate) -> DatabaseResult<Self> {
        if data.kind == StorageKind::S3 && (data.bucket.is_empty() || data.region.is_empty()) {
            return Err(DatabaseError::validation("s3 storage needs a bucket and a region"));
        }

        let row = sqlx::query_as(
            r#"
            UPDATE storage_settings
            SET kind = $1, bucket = $2, region = $3, access_key = $4,
                secret_key = COALESCE($5, secret_key), base_url = $6, updated_at = now()
            WHERE id = 1
            RETURNING kind, bucket, region, access_key, secret_key, base_url, updated_at
            "#,
        )
        .bind(data.kind.as_str())
        .bind(&data.bucket)
        .bind(&data.region)
        .bind(&data.access_key)
        .bind(&data.secret_key)
        .bind(&data.base_url)
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct ZoomSettings {
    pub account_id: String,
    pub client_id: String,
    #[serde(skip_serializing, default)]
    pub client_secret: String,
    pub recording_enabled: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ZoomSettingsUpdate {
    pub account_id: String,
    pub client_id: String,
    /// Keeps the stored secret when omitted.
    pub client_secret: Option<String>,
    #[serde(default)]
    pub recording_enabled: bool,
}

impl ZoomSettings {
    pub fn is_configured(&self) -> bool {
        !self.account_id.is_empty() && !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    pub async fn get(mm: &ModelManager) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            "SELECT account_id, client_id, client_secret, recording_enabled, updated_at FROM zoom_settings WHERE id = 1",
        )
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }

    pub async fn save(mm: &ModelManager, data: ZoomSettingsUpdate) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            UPDATE zoom_settings
            SET account_id = $1, client_id = $2, client_secret = COALESCE($3, client_secret),
                recording_enabled = $4, updated_at = now()
            WHERE id = 1
            RETURNING account_id, client_id, client_secret, recording_enabled, updated_at
            "#,
        )
        .bind(data.account_id.trim())
        .bind(data.client_id.trim())
        .bind(&data.client_secret)
        .bind(data.recording_enabled)
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }
}

impl ResourceTyped for SmtpSettings {
    fn get_resource_type() -> ResourceType {
        ResourceType::Settings
    }
}

impl ResourceTyped for StorageSettings {
    fn get_resource_type() -> ResourceType {
        ResourceType::Settings
    }
}

impl ResourceTyped for ZoomSettings {
    fn get_resource_type() -> ResourceType {
        ResourceType::Settings
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn secrets_are_not_serialized() {
        let smtp = SmtpSettings {
            host: String::from("smtp.example.com"),
            port: 587,
            username: String::from("mailer"),
            password: String::from("hunter2"),
            sender_email: String::from("noreply@example.com"),
            sender_name: String::from("Courses"),
            use_tls: true,
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&smtp).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["host"], "smtp.example.com");
        assert!(smtp.is_configured());

        let zoom = ZoomSettings {
            account_id: String::from("acc"),
            client_id: String::from("cid"),
            client_secret: String::from("secret"),
            recording_enabled: false,
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&zoom).unwrap();
        assert!(!json.contains("secret\""));
        assert!(!json.contains("client_secret"));
    }

    #[test]
    fn zoom_needs_all_credentials() {
        let zoom = ZoomSettings {
            account_id: String::from("acc"),
            client_id: String::new(),
            client_secret: String::from("secret"),
            recording_enabled: false,
            updated_at: Utc::now(),
        };
        assert!(!zoom.is_configured());
    }
}
