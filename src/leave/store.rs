//! Durable storage seam for the ledger and the request log.
//!
//! Every method is one all-or-nothing unit. Implementations must make
//! `submit_request` and `record_decision` atomic per ledger row / request
//! row; unrelated rows may proceed in parallel. Writes are keyed so that
//! repeating one after an unacknowledged commit returns the first outcome
//! instead of applying it twice.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::model::leave_balance::{BalanceKey, LeaveBalance};
use crate::model::leave_request::{DecisionOutcome, LeaveRequest, LeaveStatus, NewLeaveRequest};

/// MySQL error numbers worth retrying: lock wait timeout, deadlock.
const ER_LOCK_WAIT_TIMEOUT: u16 = 1205;
const ER_LOCK_DEADLOCK: u16 = 1213;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Contention, timeout or a dropped connection. The write may or may not
    /// have committed; repeating it is safe.
    #[error("transient storage failure: {0}")]
    Transient(String),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let transient = match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
            sqlx::Error::Database(db_err) => {
                db_err.code().as_deref() == Some("40001")
                    || db_err
                        .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                        .is_some_and(|e| {
                            matches!(e.number(), ER_LOCK_WAIT_TIMEOUT | ER_LOCK_DEADLOCK)
                        })
            }
            _ => false,
        };

        if transient {
            StoreError::Transient(err.to_string())
        } else {
            StoreError::Storage(err.to_string())
        }
    }
}

impl From<strum::ParseError> for StoreError {
    fn from(err: strum::ParseError) -> Self {
        StoreError::Storage(format!("corrupt status column: {err}"))
    }
}

/// Result of the reserve-and-create unit behind a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Days debited and the request stored, or found already stored under
    /// the same decision token.
    Created(LeaveRequest),
    /// Nothing written.
    Insufficient { available: u32 },
}

/// Result of the atomic read-check-write behind a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionRecord {
    /// The request left `Pending`; carries the updated row.
    Applied(LeaveRequest),
    NotFound,
    AlreadyDecided(LeaveStatus),
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    /// Creates the row for `key` with `total` unless one already exists.
    /// Returns whether a row was created.
    async fn ensure_balance(&self, key: &BalanceKey, total: u32) -> Result<bool, StoreError>;

    async fn snapshot(&self, employee_id: u64, year: i32) -> Result<Vec<LeaveBalance>, StoreError>;

    /// Reads-or-creates the ledger row for `key` (with `default_total`),
    /// debits `days` if the row can cover them and stores `new`, all in one
    /// unit. A request already holding `new.decision_token` is returned as
    /// is, without a second debit.
    async fn submit_request(
        &self,
        key: &BalanceKey,
        days: u32,
        default_total: u32,
        new: NewLeaveRequest,
    ) -> Result<Submission, StoreError>;

    async fn fetch_request(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError>;

    /// Id of the pending request currently holding `token`, if any.
    async fn pending_by_token(&self, token: &str) -> Result<Option<u64>, StoreError>;

    /// Loads the request, checks it is pending, credits the ledger on reject,
    /// then writes status, decider and clears the token, all in one unit.
    /// `attempt` identifies the caller's decision; a request already decided
    /// under the same `attempt` is reported as `Applied`.
    async fn record_decision(
        &self,
        id: u64,
        outcome: DecisionOutcome,
        decided_by: &str,
        attempt: &str,
    ) -> Result<DecisionRecord, StoreError>;

    /// Pending requests, oldest first.
    async fn pending_requests(&self) -> Result<Vec<LeaveRequest>, StoreError>;

    /// Approved requests covering `date`, by start date.
    async fn approved_on(&self, date: NaiveDate) -> Result<Vec<LeaveRequest>, StoreError>;

    /// All requests of one employee, newest first.
    async fn history_for(&self, employee_id: u64) -> Result<Vec<LeaveRequest>, StoreError>;
}
