//! In-memory `LeaveStore` for tests.
//!
//! A single mutex guards both tables, which is coarser than the per-row
//! locking of the MySQL store but gives the same atomicity per call.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use super::store::{DecisionRecord, LeaveStore, StoreError, Submission};
use crate::model::leave_balance::{BalanceKey, LeaveBalance, Reservation};
use crate::model::leave_request::{DecisionOutcome, LeaveRequest, LeaveStatus, NewLeaveRequest};

#[derive(Default)]
struct Tables {
    balances: HashMap<BalanceKey, LeaveBalance>,
    requests: BTreeMap<u64, LeaveRequest>,
    /// decision attempt that moved each request out of pending
    attempts: HashMap<u64, String>,
    next_id: u64,
}

#[derive(Default)]
pub struct InMemoryLeaveStore {
    tables: Mutex<Tables>,
    fail_submissions: AtomicBool,
}

impl InMemoryLeaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `submit_request` fail with a storage error
    /// after the debit, which is then rolled back with the rest of the unit.
    pub fn fail_submissions(&self, fail: bool) {
        self.fail_submissions.store(fail, Ordering::SeqCst);
    }

    /// Seeds a balance row with explicit numbers.
    pub fn set_balance(&self, key: &BalanceKey, total: u32, used: u32) {
        let mut balance = LeaveBalance::fresh(&key.leave_type, key.year, total);
        balance.used = used;
        self.lock().balances.insert(key.clone(), balance);
    }

    pub fn balance(&self, key: &BalanceKey) -> Option<LeaveBalance> {
        self.lock().balances.get(key).cloned()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn debit(tables: &mut Tables, key: &BalanceKey, days: u32, default_total: u32) -> Reservation {
    let current = tables
        .balances
        .get(key)
        .cloned()
        .unwrap_or_else(|| LeaveBalance::fresh(&key.leave_type, key.year, default_total));
    if current.used.saturating_add(days) > current.total {
        return Reservation::Insufficient {
            available: current.available(),
        };
    }

    let mut updated = current;
    updated.used += days;
    tables.balances.insert(key.clone(), updated);
    Reservation::Reserved
}

fn credit(tables: &mut Tables, key: &BalanceKey, days: u32) {
    if let Some(balance) = tables.balances.get_mut(key) {
        balance.used = balance.used.saturating_sub(days);
    }
}

#[async_trait]
impl LeaveStore for InMemoryLeaveStore {
    async fn ensure_balance(&self, key: &BalanceKey, total: u32) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        if tables.balances.contains_key(key) {
            return Ok(false);
        }
        tables
            .balances
            .insert(key.clone(), LeaveBalance::fresh(&key.leave_type, key.year, total));
        Ok(true)
    }

    async fn snapshot(&self, employee_id: u64, year: i32) -> Result<Vec<LeaveBalance>, StoreError> {
        let mut rows: Vec<LeaveBalance> = self
            .lock()
            .balances
            .iter()
            .filter(|(key, _)| key.employee_id == employee_id && key.year == year)
            .map(|(_, balance)| balance.clone())
            .collect();
        rows.sort_by(|a, b| a.leave_type.cmp(&b.leave_type));
        Ok(rows)
    }

    async fn submit_request(
        &self,
        key: &BalanceKey,
        days: u32,
        default_total: u32,
        new: NewLeaveRequest,
    ) -> Result<Submission, StoreError> {
        let mut tables = self.lock();
        let existing = tables
            .requests
            .values()
            .find(|r| r.decision_token.as_deref() == Some(new.decision_token.as_str()))
            .cloned();
        if let Some(request) = existing {
            return Ok(Submission::Created(request));
        }

        let ledger_before = tables.balances.get(key).cloned();
        if let Reservation::Insufficient { available } = debit(&mut tables, key, days, default_total) {
            return Ok(Submission::Insufficient { available });
        }
        if self.fail_submissions.load(Ordering::SeqCst) {
            match ledger_before {
                Some(balance) => tables.balances.insert(key.clone(), balance),
                None => tables.balances.remove(key),
            };
            return Err(StoreError::Storage("insert rejected".to_string()));
        }

        tables.next_id += 1;
        let request = LeaveRequest {
            id: tables.next_id,
            employee_id: new.employee_id,
            leave_type: new.leave_type,
            reason: new.reason,
            from_date: new.from_date,
            to_date: new.to_date,
            status: LeaveStatus::Pending,
            decision_token: Some(new.decision_token),
            decided_by: None,
            created_at: Utc::now(),
            decided_at: None,
        };
        tables.requests.insert(request.id, request.clone());
        Ok(Submission::Created(request))
    }

    async fn fetch_request(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        Ok(self.lock().requests.get(&id).cloned())
    }

    async fn pending_by_token(&self, token: &str) -> Result<Option<u64>, StoreError> {
        Ok(self
            .lock()
            .requests
            .values()
            .find(|r| r.status == LeaveStatus::Pending && r.decision_token.as_deref() == Some(token))
            .map(|r| r.id))
    }

    async fn record_decision(
        &self,
        id: u64,
        outcome: DecisionOutcome,
        decided_by: &str,
        attempt: &str,
    ) -> Result<DecisionRecord, StoreError> {
        let mut tables = self.lock();
        let Some(request) = tables.requests.get(&id).cloned() else {
            return Ok(DecisionRecord::NotFound);
        };
        if request.status.is_terminal() {
            if tables.attempts.get(&id).map(String::as_str) == Some(attempt) {
                return Ok(DecisionRecord::Applied(request));
            }
            return Ok(DecisionRecord::AlreadyDecided(request.status));
        }

        if outcome == DecisionOutcome::Reject {
            credit(&mut tables, &request.balance_key(), request.days());
        }

        let mut decided = request;
        decided.status = outcome.target_status();
        decided.decided_by = Some(decided_by.to_string());
        decided.decided_at = Some(Utc::now());
        decided.decision_token = None;
        tables.requests.insert(id, decided.clone());
        tables.attempts.insert(id, attempt.to_string());
        Ok(DecisionRecord::Applied(decided))
    }

    async fn pending_requests(&self) -> Result<Vec<LeaveRequest>, StoreError> {
        // BTreeMap order is id order, which is creation order
        Ok(self
            .lock()
            .requests
            .values()
            .filter(|r| r.status == LeaveStatus::Pending)
            .cloned()
            .collect())
    }

    async fn approved_on(&self, date: NaiveDate) -> Result<Vec<LeaveRequest>, StoreError> {
        let mut rows: Vec<LeaveRequest> = self
            .lock()
            .requests
            .values()
            .filter(|r| r.status == LeaveStatus::Approved && r.covers(date))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.from_date, r.id));
        Ok(rows)
    }

    async fn history_for(&self, employee_id: u64) -> Result<Vec<LeaveRequest>, StoreError> {
        Ok(self
            .lock()
            .requests
            .values()
            .rev()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> BalanceKey {
        BalanceKey::new(1, "Sick", 2024)
    }

    fn new_request(token: &str) -> NewLeaveRequest {
        NewLeaveRequest {
            employee_id: 1,
            leave_type: "Sick".to_string(),
            reason: "flu".to_string(),
            from_date: "2024-03-01".parse().unwrap(),
            to_date: "2024-03-02".parse().unwrap(),
            decision_token: token.to_string(),
        }
    }

    #[actix_web::test]
    async fn submission_creates_row_lazily_with_default_total() {
        let store = InMemoryLeaveStore::new();
        let submission = store.submit_request(&key(), 2, 20, new_request("t1")).await.unwrap();
        assert!(matches!(submission, Submission::Created(_)));
        let balance = store.balance(&key()).unwrap();
        assert_eq!((balance.total, balance.used), (20, 2));
    }

    #[actix_web::test]
    async fn insufficient_submission_writes_nothing() {
        let store = InMemoryLeaveStore::new();
        store.set_balance(&key(), 5, 4);
        assert_eq!(
            store.submit_request(&key(), 2, 20, new_request("t1")).await.unwrap(),
            Submission::Insufficient { available: 1 }
        );
        assert_eq!(store.balance(&key()).unwrap().used, 4);
        assert_eq!(store.request_count(), 0);
    }

    #[actix_web::test]
    async fn same_token_is_stored_and_debited_once() {
        let store = InMemoryLeaveStore::new();
        let first = store.submit_request(&key(), 2, 20, new_request("t1")).await.unwrap();
        let again = store.submit_request(&key(), 2, 20, new_request("t1")).await.unwrap();
        assert_eq!(first, again);
        assert_eq!(store.balance(&key()).unwrap().used, 2);
        assert_eq!(store.request_count(), 1);
    }

    #[actix_web::test]
    async fn failed_submission_rolls_back_a_lazy_row() {
        let store = InMemoryLeaveStore::new();
        store.fail_submissions(true);
        assert!(store.submit_request(&key(), 2, 20, new_request("t1")).await.is_err());
        assert!(store.balance(&key()).is_none());
    }

    #[actix_web::test]
    async fn reject_restore_is_floored_at_zero() {
        let store = InMemoryLeaveStore::new();
        let Submission::Created(request) =
            store.submit_request(&key(), 2, 20, new_request("t1")).await.unwrap()
        else {
            panic!("expected a created request");
        };
        store.set_balance(&key(), 20, 1);

        store
            .record_decision(request.id, DecisionOutcome::Reject, "user:1", "a1")
            .await
            .unwrap();
        assert_eq!(store.balance(&key()).unwrap().used, 0);
    }

    #[actix_web::test]
    async fn decision_replays_only_for_the_same_attempt() {
        let store = InMemoryLeaveStore::new();
        let Submission::Created(request) =
            store.submit_request(&key(), 2, 20, new_request("t1")).await.unwrap()
        else {
            panic!("expected a created request");
        };

        store
            .record_decision(request.id, DecisionOutcome::Reject, "user:1", "a1")
            .await
            .unwrap();
        let replay = store
            .record_decision(request.id, DecisionOutcome::Reject, "user:1", "a1")
            .await
            .unwrap();
        let other = store
            .record_decision(request.id, DecisionOutcome::Reject, "user:1", "a2")
            .await
            .unwrap();

        assert!(matches!(replay, DecisionRecord::Applied(_)));
        assert_eq!(other, DecisionRecord::AlreadyDecided(LeaveStatus::Rejected));
        assert_eq!(store.balance(&key()).unwrap().used, 0);
    }

    #[actix_web::test]
    async fn ensure_balance_keeps_existing_rows() {
        let store = InMemoryLeaveStore::new();
        store.set_balance(&key(), 12, 7);
        assert!(!store.ensure_balance(&key(), 20).await.unwrap());
        assert_eq!(store.balance(&key()).unwrap().total, 12);
        assert!(store.ensure_balance(&BalanceKey::new(1, "Paid", 2024), 20).await.unwrap());
    }
}
