use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::leave_balance::{BalanceKey, day_count};

/// Lifecycle state of a leave request. Anything but `Pending` is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LeaveStatus::Pending)
    }
}

/// What an approver decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    Approve,
    Reject,
}

impl DecisionOutcome {
    /// Status a pending request moves to under this outcome.
    pub fn target_status(&self) -> LeaveStatus {
        match self {
            DecisionOutcome::Approve => LeaveStatus::Approved,
            DecisionOutcome::Reject => LeaveStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "leave_type": "Sick",
    "reason": "Flu",
    "from_date": "2024-03-01",
    "to_date": "2024-03-01",
    "status": "PENDING",
    "decided_by": null,
    "created_at": "2024-02-27T09:00:00Z",
    "decided_at": null
}))]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type: String,
    pub reason: String,
    #[schema(format = "date", value_type = String)]
    pub from_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub to_date: NaiveDate,
    pub status: LeaveStatus,
    /// Only held while pending; never exposed over the API.
    #[serde(skip)]
    pub decision_token: Option<String>,
    pub decided_by: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub decided_at: Option<DateTime<Utc>>,
}

impl LeaveRequest {
    /// Days this request holds against its balance.
    pub fn days(&self) -> u32 {
        day_count(self.from_date, self.to_date)
    }

    /// Ledger row the request is charged against (year of `from_date`).
    pub fn balance_key(&self) -> BalanceKey {
        BalanceKey::new(self.employee_id, &self.leave_type, self.from_date.year())
    }

    /// Whether the request covers `date` (both ends inclusive).
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.from_date <= date && date <= self.to_date
    }
}

/// Width of the `leave_type` columns.
pub const LEAVE_TYPE_MAX_CHARS: usize = 64;

/// Fields needed to persist a freshly submitted request.
#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub employee_id: u64,
    pub leave_type: String,
    pub reason: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub decision_token: String,
}

/// Row shape of `leave_requests`; status is stored as text.
#[derive(Debug, sqlx::FromRow)]
pub struct LeaveRequestRow {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type: String,
    pub reason: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub status: String,
    pub decision_token: Option<String>,
    pub decided_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl TryFrom<LeaveRequestRow> for LeaveRequest {
    type Error = strum::ParseError;

    fn try_from(row: LeaveRequestRow) -> Result<Self, Self::Error> {
        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            leave_type: row.leave_type,
            reason: row.reason,
            from_date: row.from_date,
            to_date: row.to_date,
            status: row.status.parse()?,
            decision_token: row.decision_token,
            decided_by: row.decided_by,
            created_at: row.created_at,
            decided_at: row.decided_at,
        })
    }
}
