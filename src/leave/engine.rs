//! Leave-request lifecycle: submission, decision and the ledger effects of
//! each.
//!
//! Ordering on submit is reserve, then create the request, then notify. The
//! reservation and the request commit as one storage unit, so a failed
//! creation never leaves days debited. Decisions from the in-app action and
//! from emailed links both funnel into [`LeaveEngine::decide`], whose storage
//! call is one atomic read-check-write, so racing channels yield one winner
//! and one `AlreadyDecided`.
//!
//! Storage writes are retried on transient errors. The decision token keys a
//! submission and a fresh attempt id keys each decision, so a retry after a
//! commit whose acknowledgement was lost returns the committed result.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use super::directory::EmployeeDirectory;
use super::error::LeaveError;
use super::notify::{LeaveDecided, LeaveSubmitted, NotificationTrigger};
use super::retry::RetryPolicy;
use super::store::{DecisionRecord, LeaveStore, Submission};
use super::token::DecisionTokenIssuer;
use crate::model::employee::EmployeeRecord;
use crate::model::leave_balance::{BalanceKey, LeaveBalance, day_count};
use crate::model::leave_request::{
    DecisionOutcome, LEAVE_TYPE_MAX_CHARS, LeaveRequest, NewLeaveRequest,
};

/// `decided_by` value recorded for decisions made through an emailed link.
pub const EMAIL_CHANNEL: &str = "EMAIL";

/// `decided_by` value for an in-app decision by user `user_id`.
pub fn approver_ref(user_id: u64) -> String {
    format!("user:{user_id}")
}

#[derive(Debug, Clone)]
pub struct SubmitLeave {
    pub employee_id: u64,
    pub leave_type: String,
    pub reason: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

/// A request with the requester's directory entry, for approver views.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaveWithRequester {
    #[serde(flatten)]
    pub request: LeaveRequest,
    pub requester: Option<EmployeeRecord>,
}

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// allowance given to a ledger row created on first use
    pub default_total: u32,
    pub retry: RetryPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_total: 20,
            retry: RetryPolicy::default(),
        }
    }
}

pub struct LeaveEngine {
    store: Arc<dyn LeaveStore>,
    directory: Arc<dyn EmployeeDirectory>,
    notifier: Arc<dyn NotificationTrigger>,
    tokens: DecisionTokenIssuer,
    settings: EngineSettings,
}

impl LeaveEngine {
    pub fn new(
        store: Arc<dyn LeaveStore>,
        directory: Arc<dyn EmployeeDirectory>,
        notifier: Arc<dyn NotificationTrigger>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            directory,
            notifier,
            tokens: DecisionTokenIssuer,
            settings,
        }
    }

    async fn employee(&self, employee_id: u64) -> Result<Option<EmployeeRecord>, LeaveError> {
        let found = self
            .settings
            .retry
            .run("employee_lookup", || self.directory.lookup(employee_id))
            .await?;
        Ok(found)
    }

    #[instrument(
        name = "leave_submit",
        skip(self, cmd),
        fields(employee_id = cmd.employee_id, leave_type = %cmd.leave_type)
    )]
    pub async fn submit(&self, cmd: SubmitLeave) -> Result<LeaveRequest, LeaveError> {
        // 1️⃣ employee must exist and be active
        let employee = self
            .employee(cmd.employee_id)
            .await?
            .ok_or(LeaveError::EmployeeNotFound(cmd.employee_id))?;
        if !employee.active {
            return Err(LeaveError::EmployeeInactive(cmd.employee_id));
        }

        // 2️⃣ validate input
        if cmd.from_date > cmd.to_date {
            return Err(LeaveError::InvalidDateRange {
                from: cmd.from_date,
                to: cmd.to_date,
            });
        }
        let leave_type = cmd.leave_type.trim().to_string();
        let reason = cmd.reason.trim().to_string();
        if leave_type.is_empty() {
            return Err(LeaveError::MissingField("leave_type"));
        }
        if leave_type.chars().count() > LEAVE_TYPE_MAX_CHARS {
            return Err(LeaveError::FieldTooLong {
                field: "leave_type",
                max: LEAVE_TYPE_MAX_CHARS,
            });
        }
        if reason.is_empty() {
            return Err(LeaveError::MissingField("reason"));
        }

        // 3️⃣ reserve allowance and create the request in one unit
        let days = day_count(cmd.from_date, cmd.to_date);
        let key = BalanceKey::new(cmd.employee_id, &leave_type, cmd.from_date.year());
        let new = NewLeaveRequest {
            employee_id: cmd.employee_id,
            leave_type,
            reason,
            from_date: cmd.from_date,
            to_date: cmd.to_date,
            decision_token: self.tokens.issue(),
        };
        let submission = self
            .settings
            .retry
            .run("submit_request", || {
                self.store
                    .submit_request(&key, days, self.settings.default_total, new.clone())
            })
            .await?;
        let request = match submission {
            Submission::Created(request) => request,
            Submission::Insufficient { available } => {
                info!(%key, days, available, "Leave rejected: insufficient balance");
                return Err(LeaveError::InsufficientBalance {
                    requested: days,
                    available,
                });
            }
        };

        info!(request_id = request.id, %key, days, "Leave request submitted");

        // 4️⃣ notify approver (non-fatal)
        let event = LeaveSubmitted {
            employee_name: employee.name,
            employee_email: employee.email,
            leave_type: request.leave_type.clone(),
            reason: request.reason.clone(),
            from_date: request.from_date,
            to_date: request.to_date,
            decision_token: new.decision_token,
        };
        if let Err(e) = self.notifier.notify_submitted(event).await {
            warn!(error = %e, request_id = request.id, "Failed to send leave request notification");
        }

        Ok(request)
    }

    #[instrument(name = "leave_decide", skip(self))]
    pub async fn decide(
        &self,
        id: u64,
        outcome: DecisionOutcome,
        decided_by: &str,
    ) -> Result<LeaveRequest, LeaveError> {
        let attempt = self.tokens.issue();
        let record = self
            .settings
            .retry
            .run("record_decision", || {
                self.store.record_decision(id, outcome, decided_by, &attempt)
            })
            .await?;

        let request = match record {
            DecisionRecord::Applied(request) => request,
            DecisionRecord::NotFound => return Err(LeaveError::NotFound(id)),
            DecisionRecord::AlreadyDecided(status) => {
                info!(%status, "Decision ignored: request already decided");
                return Err(LeaveError::AlreadyDecided { id, status });
            }
        };

        info!(status = %request.status, decided_by, "Leave request decided");
        self.announce_decision(&request).await;
        Ok(request)
    }

    /// Redeems an emailed link. A token only resolves while its request is
    /// pending, so any reuse after the first decision is `InvalidToken`.
    pub async fn decide_by_token(
        &self,
        token: &str,
        outcome: DecisionOutcome,
    ) -> Result<LeaveRequest, LeaveError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(LeaveError::InvalidToken);
        }

        let id = self
            .settings
            .retry
            .run("pending_by_token", || self.store.pending_by_token(token))
            .await?
            .ok_or(LeaveError::InvalidToken)?;

        self.decide(id, outcome, EMAIL_CHANNEL).await
    }

    async fn announce_decision(&self, request: &LeaveRequest) {
        let employee = match self.employee(request.employee_id).await {
            Ok(Some(employee)) => employee,
            Ok(None) => {
                warn!(request_id = request.id, "Requester missing from directory, decision not announced");
                return;
            }
            Err(e) => {
                warn!(error = %e, request_id = request.id, "Directory lookup failed, decision not announced");
                return;
            }
        };

        let event = LeaveDecided {
            employee_name: employee.name,
            employee_email: employee.email,
            leave_type: request.leave_type.clone(),
            from_date: request.from_date,
            to_date: request.to_date,
            status: request.status,
        };
        if let Err(e) = self.notifier.notify_decided(event).await {
            warn!(error = %e, request_id = request.id, "Failed to send leave decision notification");
        }
    }

    pub async fn get(&self, id: u64) -> Result<LeaveRequest, LeaveError> {
        self.settings
            .retry
            .run("fetch_request", || self.store.fetch_request(id))
            .await?
            .ok_or(LeaveError::NotFound(id))
    }

    /// Approver queue, oldest first.
    pub async fn pending_requests(&self) -> Result<Vec<LeaveWithRequester>, LeaveError> {
        let requests = self
            .settings
            .retry
            .run("pending_requests", || self.store.pending_requests())
            .await?;
        self.with_requesters(requests).await
    }

    /// Approved leave covering `date`, for requesters still active in the
    /// directory.
    pub async fn requests_on_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<LeaveWithRequester>, LeaveError> {
        let requests = self
            .settings
            .retry
            .run("approved_on", || self.store.approved_on(date))
            .await?;
        let mut leaves = self.with_requesters(requests).await?;
        leaves.retain(|leave| leave.requester.as_ref().is_some_and(|r| r.active));
        Ok(leaves)
    }

    /// Every request of one employee, newest first.
    pub async fn history_for(&self, employee_id: u64) -> Result<Vec<LeaveRequest>, LeaveError> {
        let requests = self
            .settings
            .retry
            .run("history_for", || self.store.history_for(employee_id))
            .await?;
        Ok(requests)
    }

    pub async fn balances(
        &self,
        employee_id: u64,
        year: i32,
    ) -> Result<Vec<LeaveBalance>, LeaveError> {
        let rows = self
            .settings
            .retry
            .run("snapshot", || self.store.snapshot(employee_id, year))
            .await?;
        Ok(rows)
    }

    async fn with_requesters(
        &self,
        requests: Vec<LeaveRequest>,
    ) -> Result<Vec<LeaveWithRequester>, LeaveError> {
        let mut out = Vec::with_capacity(requests.len());
        for request in requests {
            let requester = self.employee(request.employee_id).await?;
            out.push(LeaveWithRequester { request, requester });
        }
        Ok(out)
    }
}
