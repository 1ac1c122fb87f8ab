//! Outbound lifecycle events.
//!
//! The engine fires these after its state change has committed and only logs
//! failures: a lost message never undoes a submission or a decision.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::model::leave_request::LeaveStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaveSubmitted {
    pub employee_name: String,
    pub employee_email: String,
    pub leave_type: String,
    pub reason: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub decision_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaveDecided {
    pub employee_name: String,
    pub employee_email: String,
    pub leave_type: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub status: LeaveStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

#[async_trait]
pub trait NotificationTrigger: Send + Sync {
    async fn notify_submitted(&self, event: LeaveSubmitted) -> Result<(), NotifyError>;
    async fn notify_decided(&self, event: LeaveDecided) -> Result<(), NotifyError>;
}

/// Approve/reject URLs embedded in the approver's message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionLinks {
    pub approve: String,
    pub reject: String,
}

const REDACTED: &str = "<redacted>";

impl DecisionLinks {
    pub fn new(base_url: &str, token: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            approve: format!("{base}/leaves/approve?token={token}"),
            reject: format!("{base}/leaves/reject?token={token}"),
        }
    }

    /// Same URLs with the token masked; a readable token decides the request.
    pub fn redacted(base_url: &str) -> Self {
        Self::new(base_url, REDACTED)
    }
}

/// Renders each message and hands it to the structured log. Tokens are
/// masked in the info event; the usable links go out as a separate debug
/// event only when `expose_links` is set.
pub struct LogNotifier {
    base_url: String,
    approver_email: Option<String>,
    expose_links: bool,
}

impl LogNotifier {
    pub fn new(
        base_url: impl Into<String>,
        approver_email: Option<String>,
        expose_links: bool,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            approver_email,
            expose_links,
        }
    }
}

#[async_trait]
impl NotificationTrigger for LogNotifier {
    async fn notify_submitted(&self, event: LeaveSubmitted) -> Result<(), NotifyError> {
        let to = self
            .approver_email
            .as_deref()
            .ok_or_else(|| NotifyError::Transport("APPROVER_EMAIL is not configured".to_string()))?;
        let masked = DecisionLinks::redacted(&self.base_url);

        info!(
            to,
            subject = "New Leave Request",
            employee = %event.employee_name,
            employee_email = %event.employee_email,
            leave_type = %event.leave_type,
            reason = %event.reason,
            from = %event.from_date,
            till = %event.to_date,
            approve_link = %masked.approve,
            reject_link = %masked.reject,
            "Leave request notification"
        );

        if self.expose_links {
            let links = DecisionLinks::new(&self.base_url, &event.decision_token);
            debug!(
                to,
                approve_link = %links.approve,
                reject_link = %links.reject,
                "Leave decision links"
            );
        }
        Ok(())
    }

    async fn notify_decided(&self, event: LeaveDecided) -> Result<(), NotifyError> {
        info!(
            to = %event.employee_email,
            subject = %format!("Leave {}", event.status),
            employee = %event.employee_name,
            leave_type = %event.leave_type,
            from = %event.from_date,
            till = %event.to_date,
            "Leave decision notification"
        );
        Ok(())
    }
}
