//! Outbound mail boundary.
//!
//! Delivery mechanics live behind the `Mailer` trait; the default
//! implementation only logs what would have been sent, the same way the
//! platform behaves without SMTP credentials. Staff alert subjects get the
//! platform prefix here so every implementation carries it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::MailError;

pub const ALERT_SUBJECT_PREFIX: &str = "[MindsHub Alert]";

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Confirmation to a participant after their registration is stored.
    async fn send_registration_confirmation(
        &self,
        to: &str,
        activity_title: &str,
        starts_at: DateTime<Utc>,
        location: &str,
    ) -> Result<(), MailError>;

    /// Threshold alert to the staff distribution list.
    async fn send_staff_alert(
        &self,
        to: &[String],
        subject: &str,
        message: &str,
    ) -> Result<(), MailError>;
}

/// Logs every would-be send at info level instead of delivering it.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_registration_confirmation(
        &self,
        to: &str,
        activity_title: &str,
        starts_at: DateTime<Utc>,
        location: &str,
    ) -> Result<(), MailError> {
        info!(
            to,
            subject = %format!("Registration Confirmed: {activity_title}"),
            starts_at = %starts_at.format("%A, %e %B %Y at %H:%M"),
            location,
            "mail not configured, skipping registration confirmation"
        );
        Ok(())
    }

    async fn send_staff_alert(
        &self,
        to: &[String],
        subject: &str,
        message: &str,
    ) -> Result<(), MailError> {
        info!(
            to = %to.join(", "),
            subject = %format!("{ALERT_SUBJECT_PREFIX} {subject}"),
            message,
            "mail not configured, skipping staff alert"
        );
        Ok(())
    }
}
