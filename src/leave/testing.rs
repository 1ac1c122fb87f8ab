//! Test doubles for the directory, the notification trigger and a store
//! that loses acknowledgements.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::directory::EmployeeDirectory;
use super::memory::InMemoryLeaveStore;
use super::notify::{LeaveDecided, LeaveSubmitted, NotificationTrigger, NotifyError};
use super::store::{DecisionRecord, LeaveStore, StoreError, Submission};
use crate::model::employee::EmployeeRecord;
use crate::model::leave_balance::{BalanceKey, LeaveBalance};
use crate::model::leave_request::{DecisionOutcome, LeaveRequest, NewLeaveRequest};

#[derive(Default)]
pub struct StaticDirectory {
    employees: HashMap<u64, EmployeeRecord>,
}

impl StaticDirectory {
    pub fn with(mut self, id: u64, name: &str, active: bool) -> Self {
        let email = format!("{}@company.com", name.split_whitespace().next().unwrap_or("staff").to_lowercase());
        self.employees.insert(
            id,
            EmployeeRecord {
                id,
                name: name.to_string(),
                email,
                active,
            },
        );
        self
    }
}

#[async_trait]
impl EmployeeDirectory for StaticDirectory {
    async fn lookup(&self, employee_id: u64) -> Result<Option<EmployeeRecord>, StoreError> {
        Ok(self.employees.get(&employee_id).cloned())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    submitted: Mutex<Vec<LeaveSubmitted>>,
    decided: Mutex<Vec<LeaveDecided>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    /// Every later call records nothing and returns a transport error.
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn submitted(&self) -> Vec<LeaveSubmitted> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn decided(&self) -> Vec<LeaveDecided> {
        self.decided.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("smtp down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationTrigger for RecordingNotifier {
    async fn notify_submitted(&self, event: LeaveSubmitted) -> Result<(), NotifyError> {
        self.check()?;
        self.submitted.lock().unwrap().push(event);
        Ok(())
    }

    async fn notify_decided(&self, event: LeaveDecided) -> Result<(), NotifyError> {
        self.check()?;
        self.decided.lock().unwrap().push(event);
        Ok(())
    }
}

/// Commits through the wrapped store, then reports the next `n` writes of a
/// kind as a transient failure, like a connection reset after `COMMIT`.
pub struct LostAckStore {
    inner: Arc<InMemoryLeaveStore>,
    submit_acks_to_drop: AtomicU32,
    decision_acks_to_drop: AtomicU32,
}

impl LostAckStore {
    pub fn new(inner: Arc<InMemoryLeaveStore>) -> Self {
        Self {
            inner,
            submit_acks_to_drop: AtomicU32::new(0),
            decision_acks_to_drop: AtomicU32::new(0),
        }
    }

    pub fn drop_submit_acks(self, n: u32) -> Self {
        self.submit_acks_to_drop.store(n, Ordering::SeqCst);
        self
    }

    pub fn drop_decision_acks(self, n: u32) -> Self {
        self.decision_acks_to_drop.store(n, Ordering::SeqCst);
        self
    }

    fn lose_ack(counter: &AtomicU32) -> Result<(), StoreError> {
        let dropped = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if dropped {
            return Err(StoreError::Transient("connection reset after commit".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LeaveStore for LostAckStore {
    async fn ensure_balance(&self, key: &BalanceKey, total: u32) -> Result<bool, StoreError> {
        self.inner.ensure_balance(key, total).await
    }

    async fn snapshot(&self, employee_id: u64, year: i32) -> Result<Vec<LeaveBalance>, StoreError> {
        self.inner.snapshot(employee_id, year).await
    }

    async fn submit_request(
        &self,
        key: &BalanceKey,
        days: u32,
        default_total: u32,
        new: NewLeaveRequest,
    ) -> Result<Submission, StoreError> {
        let submission = self.inner.submit_request(key, days, default_total, new).await?;
        Self::lose_ack(&self.submit_acks_to_drop)?;
        Ok(submission)
    }

    async fn fetch_request(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        self.inner.fetch_request(id).await
    }

    async fn pending_by_token(&self, token: &str) -> Result<Option<u64>, StoreError> {
        self.inner.pending_by_token(token).await
    }

    async fn record_decision(
        &self,
        id: u64,
        outcome: DecisionOutcome,
        decided_by: &str,
        attempt: &str,
    ) -> Result<DecisionRecord, StoreError> {
        let record = self.inner.record_decision(id, outcome, decided_by, attempt).await?;
        Self::lose_ack(&self.decision_acks_to_drop)?;
        Ok(record)
    }

    async fn pending_requests(&self) -> Result<Vec<LeaveRequest>, StoreError> {
        self.inner.pending_requests().await
    }

    async fn approved_on(&self, date: NaiveDate) -> Result<Vec<LeaveRequest>, StoreError> {
        self.inner.approved_on(date).await
    }

    async fn history_for(&self, employee_id: u64) -> Result<Vec<LeaveRequest>, StoreError> {
        self.inner.history_for(employee_id).await
    }
}
