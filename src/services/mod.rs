//! Services layer for Gatehouse
//!
//! - **Gating**: recipient preferences decide whether an event sends an email
//! - **Mailer**: email delivery collaborator (log-only or HTTP mail API)
//! - **Setup**: first-run index creation recorded in settings

pub mod gating;
pub mod mailer;
pub mod setup;

pub use gating::{
    is_enabled, GateOutcome, GatingError, NotificationEvent, NotificationGate, ENABLED_WHEN_UNSET,
};
pub use mailer::{EmailMessage, HttpMailer, LogMailer, MailError, Mailer};
pub use setup::{run_setup, SetupOutcome};
