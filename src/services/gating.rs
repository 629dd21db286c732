//! Notification gating
//!
//! Decides from the recipient's stored preferences whether a like, comment or
//! follow sends an email, then sends at most one.
//!
//! A recipient with no stored value for the event's key gets the email
//! (`ENABLED_WHEN_UNSET`). Only an explicit value other than `"true"` turns
//! it off.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::AuthenticatedIdentity;
use crate::relay::{fetch_notification_settings, RelayClient};
use crate::services::mailer::{EmailMessage, MailError, Mailer};
use crate::types::{setting_path, GatehouseError, NotificationKind, NOTIFICATION_SETTING_TYPE};

/// Email is sent when the recipient never stored a preference
pub const ENABLED_WHEN_UNSET: bool = true;

impl NotificationKind {
    /// Preference key consulted for this kind of event
    pub fn setting_key(self) -> &'static str {
        match self {
            Self::Like => "send_email_on_like",
            Self::Comment => "send_email_on_comment_post",
            Self::Follow => "send_email_on_follow",
        }
    }

    /// Notification title shown to the recipient
    pub fn title(self, actor_display_name: &str) -> String {
        match self {
            Self::Like => format!("{} liked your post.", actor_display_name),
            Self::Comment => format!("{} added a comment on your post.", actor_display_name),
            Self::Follow => format!("{} now following you.", actor_display_name),
        }
    }
}

/// A domain action that may produce an email
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub actor_display_name: String,
    pub recipient_id: Uuid,
    pub recipient_email: Option<String>,
    pub target_id: Uuid,
    /// Link inside the web app
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Sent { title: String },
    /// The recipient turned this email off
    Disabled,
    /// Nowhere to send it
    NoRecipientEmail,
}

#[derive(Debug, thiserror::Error)]
pub enum GatingError {
    #[error("failed to fetch recipient settings: {0}")]
    Settings(#[source] GatehouseError),

    #[error("failed to send email: {0}")]
    Mail(#[from] MailError),
}

impl GatingError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Settings(e) => e.code(),
            Self::Mail(_) => "gating/sendEmail",
        }
    }
}

pub struct NotificationGate {
    relay: RelayClient,
    mailer: Arc<dyn Mailer>,
    app_name: String,
    web_domain: String,
}

impl NotificationGate {
    pub fn new(
        relay: RelayClient,
        mailer: Arc<dyn Mailer>,
        app_name: impl Into<String>,
        web_domain: impl Into<String>,
    ) -> Self {
        Self {
            relay,
            mailer,
            app_name: app_name.into(),
            web_domain: web_domain.into(),
        }
    }

    /// Email subject for a title
    pub fn subject(&self, title: &str) -> String {
        format!("{} Notification - {}", self.app_name, title)
    }

    /// Run the gate for one event on behalf of `caller`
    pub async fn process(
        &self,
        event: &NotificationEvent,
        caller: &AuthenticatedIdentity,
    ) -> Result<GateOutcome, GatingError> {
        let Some(to) = event.recipient_email.as_deref().filter(|e| !e.trim().is_empty()) else {
            debug!(recipient = %event.recipient_id, "No recipient email, skipping gate");
            return Ok(GateOutcome::NoRecipientEmail);
        };

        let key = event.kind.setting_key();
        let settings = fetch_notification_settings(&self.relay, vec![event.recipient_id], caller)
            .await
            .map_err(GatingError::Settings)?;

        let stored = settings.get(&setting_path(event.recipient_id, NOTIFICATION_SETTING_TYPE, key));
        if !is_enabled(stored.map(String::as_str)) {
            debug!(recipient = %event.recipient_id, key, "Email disabled by recipient");
            return Ok(GateOutcome::Disabled);
        }

        let title = event.kind.title(&event.actor_display_name);
        let message = EmailMessage {
            to: to.to_string(),
            subject: self.subject(&title),
            body: format!(
                "{}\n\n{}/{}",
                title,
                self.web_domain.trim_end_matches('/'),
                event.url.trim_start_matches('/')
            ),
        };

        self.mailer.send(message).await?;
        info!(recipient = %event.recipient_id, kind = ?event.kind, "Notification email sent");
        Ok(GateOutcome::Sent { title })
    }
}

/// Interpret a stored preference value
pub fn is_enabled(stored: Option<&str>) -> bool {
    match stored {
        None => ENABLED_WHEN_UNSET,
        Some(value) => value.trim().eq_ignore_ascii_case("true"),
    }
}
