//! Outgoing notification mail over the configured SMTP relay.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;

use crate::model::entity::SmtpSettings;
use crate::model::{DatabaseError, ModelManager};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("smtp settings are not configured")]
    NotConfigured,
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("unable to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("mail task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

fn build_message(settings: &SmtpSettings, mail: &Mail) -> Result<Message, MailError> {
    let from = if settings.sender_name.is_empty() {
        settings.sender_email.clone()
    } else {
        format!("{} <{}>", settings.sender_name, settings.sender_email)
    };

    let message = Message::builder()
        .from(from.parse()?)
        .to(mail.to.parse()?)
        .subject(mail.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(mail.body.clone())?;
    Ok(message)
}

fn build_transport(settings: &SmtpSettings) -> Result<SmtpTransport, MailError> {
    let port = u16::try_from(settings.port).unwrap_or(587);
    let builder = if settings.use_tls {
        SmtpTransport::starttls_relay(&settings.host)?.port(port)
    } else {
        SmtpTransport::builder_dangerous(&settings.host).port(port)
    };
    let builder = if settings.username.is_empty() {
        builder
    } else {
        builder.credentials(Credentials::new(
            settings.username.clone(),
            settings.password.clone(),
        ))
    };
    Ok(builder.build())
}

/// Sends `mail` with the stored SMTP settings. The SMTP client blocks, so the
/// delivery runs on the blocking pool.
pub async fn send(mm: &ModelManager, mail: Mail) -> Result<(), MailError> {
    let settings = SmtpSettings::get(mm).await?;
    if !settings.is_configured() {
        return Err(MailError::NotConfigured);
    }

    let message = build_message(&settings, &mail)?;
    let transport = build_transport(&settings)?;
    tokio::task::spawn_blocking(move || transport.send(&message)).await??;

    tracing::info!(to = %mail.to, subject = %mail.subject, "mail sent");
    Ok(())
}

/// Fire and forget variant for notifications. Failures are logged only.
pub fn notify(mm: ModelManager, mail: Mail) {
    tokio::spawn(async move {
        match send(&mm, mail).await {
            Ok(()) => {}
            Err(MailError::NotConfigured) => {
                tracing::debug!("smtp is not configured, notification skipped");
            }
            Err(e) => tracing::warn!(error = %e, "unable to send notification mail"),
        }
    });
}

pub fn assignment_reviewed(to: String, lesson_title: &str, passed: bool, review: &str) -> Mail {
    let outcome = if passed { "passed" } else { "did not pass" };
    Mail {
        to,
        subject: format!("Your assignment \"{lesson_title}\" was reviewed"),
        body: format!(
            "Your submission for \"{lesson_title}\" was reviewed and {outcome}.\n\n{review}\n"
        ),
    }
}

pub fn certificate_issued(to: String, course_title: &str, number: &str) -> Mail {
    Mail {
        to,
        subject: format!("Certificate for \"{course_title}\""),
        body: format!(
            "Congratulations, you completed \"{course_title}\".\nYour certificate number is {number}.\n"
        ),
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;

    fn settings() -> SmtpSettings {
        SmtpSettings {
            host: String::from("smtp.example.com"),
            port: 587,
            username: String::new(),
            password: String::new(),
            sender_email: String::from("noreply@example.com"),
            sender_name: String::from("Course Hub"),
            use_tls: true,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn builds_message_with_sender_name() {
        let mail = certificate_issued(String::from("learner@example.com"), "Rust 101", "CERT-1");
        let message = build_message(&settings(), &mail).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Course Hub"));
        assert!(raw.contains("<noreply@example.com>"));
        assert!(raw.contains("CERT-1"));
    }

    #[test]
    fn rejects_invalid_recipient() {
        let mail = assignment_reviewed(String::from("not an address"), "Essay", true, "");
        assert!(matches!(build_message(&settings(), &mail), Err(MailError::Address(_))));
    }
}
