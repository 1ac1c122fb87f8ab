use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::debug;

use super::store::{DecisionRecord, LeaveStore, StoreError, Submission};
use crate::model::leave_balance::{BalanceKey, LeaveBalance, Reservation};
use crate::model::leave_request::{
    DecisionOutcome, LeaveRequest, LeaveRequestRow, LeaveStatus, NewLeaveRequest,
};

const REQUEST_COLUMNS: &str = r#"
    id, employee_id, leave_type, reason, from_date, to_date, status,
    decision_token, decided_by, created_at, decided_at
"#;

/// `LeaveStore` over the `leave_balances` / `leave_requests` tables.
#[derive(Clone)]
pub struct MySqlLeaveStore {
    pool: MySqlPool,
}

impl MySqlLeaveStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_many(
        &self,
        filter: &str,
        order: &str,
        binds: &[BindValue],
    ) -> Result<Vec<LeaveRequest>, StoreError> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests {filter} ORDER BY {order}");
        let mut query = sqlx::query_as::<_, LeaveRequestRow>(&sql);
        for bind in binds {
            query = match bind {
                BindValue::U64(v) => query.bind(*v),
                BindValue::Date(d) => query.bind(*d),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| LeaveRequest::try_from(row).map_err(StoreError::from))
            .collect()
    }
}

// Helper enum for typed SQLx binding
enum BindValue {
    U64(u64),
    Date(NaiveDate),
}

/// Debits `days` from `key` inside an open transaction, creating the row
/// with `default_total` on first use.
///
/// The upsert puts an exclusive lock on the row before anything reads it,
/// so concurrent reservations on one key queue behind each other rather than
/// each holding a shared lock and waiting to upgrade it.
async fn reserve_in(
    tx: &mut Transaction<'_, MySql>,
    key: &BalanceKey,
    days: u32,
    default_total: u32,
) -> Result<Reservation, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO leave_balances (employee_id, leave_type, year, total, used)
        VALUES (?, ?, ?, ?, 0)
        ON DUPLICATE KEY UPDATE total = total
        "#,
    )
    .bind(key.employee_id)
    .bind(&key.leave_type)
    .bind(key.year)
    .bind(default_total)
    .execute(&mut **tx)
    .await?;

    let (total, used) = sqlx::query_as::<_, (u32, u32)>(
        r#"
        SELECT total, used FROM leave_balances
        WHERE employee_id = ? AND leave_type = ? AND year = ?
        FOR UPDATE
        "#,
    )
    .bind(key.employee_id)
    .bind(&key.leave_type)
    .bind(key.year)
    .fetch_one(&mut **tx)
    .await?;

    if used.saturating_add(days) > total {
        return Ok(Reservation::Insufficient {
            available: total.saturating_sub(used),
        });
    }

    sqlx::query(
        r#"
        UPDATE leave_balances
        SET used = used + ?
        WHERE employee_id = ? AND leave_type = ? AND year = ?
        "#,
    )
    .bind(days)
    .bind(key.employee_id)
    .bind(&key.leave_type)
    .bind(key.year)
    .execute(&mut **tx)
    .await?;

    Ok(Reservation::Reserved)
}

/// Credits `days` inside an open transaction. `used` is unsigned, so the
/// floor at zero is done in SQL rather than by subtraction.
async fn restore_in(
    tx: &mut Transaction<'_, MySql>,
    key: &BalanceKey,
    days: u32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE leave_balances
        SET used = IF(used > ?, used - ?, 0)
        WHERE employee_id = ? AND leave_type = ? AND year = ?
        "#,
    )
    .bind(days)
    .bind(days)
    .bind(key.employee_id)
    .bind(&key.leave_type)
    .bind(key.year)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl LeaveStore for MySqlLeaveStore {
    async fn ensure_balance(&self, key: &BalanceKey, total: u32) -> Result<bool, StoreError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO leave_balances (employee_id, leave_type, year, total, used)
            VALUES (?, ?, ?, ?, 0)
            "#,
        )
        .bind(key.employee_id)
        .bind(&key.leave_type)
        .bind(key.year)
        .bind(total)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn snapshot(&self, employee_id: u64, year: i32) -> Result<Vec<LeaveBalance>, StoreError> {
        let rows = sqlx::query_as::<_, LeaveBalance>(
            r#"
            SELECT leave_type, year, total, used
            FROM leave_balances
            WHERE employee_id = ? AND year = ?
            ORDER BY leave_type
            "#,
        )
        .bind(employee_id)
        .bind(year)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn submit_request(
        &self,
        key: &BalanceKey,
        days: u32,
        default_total: u32,
        new: NewLeaveRequest,
    ) -> Result<Submission, StoreError> {
        let mut tx = self.pool.begin().await?;

        // 1️⃣ an earlier attempt may have committed before its ack was lost
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE decision_token = ?");
        let existing = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(&new.decision_token)
            .fetch_optional(&mut *tx)
            .await?;
        if let Some(row) = existing {
            tx.rollback().await?;
            let request = LeaveRequest::try_from(row)?;
            debug!(request_id = request.id, "Submission already committed");
            return Ok(Submission::Created(request));
        }

        // 2️⃣ debit the ledger
        if let Reservation::Insufficient { available } =
            reserve_in(&mut tx, key, days, default_total).await?
        {
            tx.rollback().await?;
            return Ok(Submission::Insufficient { available });
        }

        // 3️⃣ store the request in the same unit
        let created_at = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, leave_type, reason, from_date, to_date, status, decision_token, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.employee_id)
        .bind(&new.leave_type)
        .bind(&new.reason)
        .bind(new.from_date)
        .bind(new.to_date)
        .bind(LeaveStatus::Pending.as_ref())
        .bind(&new.decision_token)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Submission::Created(LeaveRequest {
            id: result.last_insert_id(),
            employee_id: new.employee_id,
            leave_type: new.leave_type,
            reason: new.reason,
            from_date: new.from_date,
            to_date: new.to_date,
            status: LeaveStatus::Pending,
            decision_token: Some(new.decision_token),
            decided_by: None,
            created_at,
            decided_at: None,
        }))
    }

    async fn fetch_request(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ?");
        let row = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(LeaveRequest::try_from)
            .transpose()
            .map_err(StoreError::from)
    }

    async fn pending_by_token(&self, token: &str) -> Result<Option<u64>, StoreError> {
        let id = sqlx::query_scalar::<_, u64>(
            r#"
            SELECT id FROM leave_requests
            WHERE decision_token = ? AND status = ?
            "#,
        )
        .bind(token)
        .bind(LeaveStatus::Pending.as_ref())
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn record_decision(
        &self,
        id: u64,
        outcome: DecisionOutcome,
        decided_by: &str,
        attempt: &str,
    ) -> Result<DecisionRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        // row lock serializes racing decisions on the same request
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ? FOR UPDATE");
        let row = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(DecisionRecord::NotFound);
        };
        let mut request = LeaveRequest::try_from(row)?;

        if request.status.is_terminal() {
            let decided_under = sqlx::query_scalar::<_, Option<String>>(
                "SELECT decision_attempt FROM leave_requests WHERE id = ?",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            tx.rollback().await?;

            // same attempt: our own earlier commit whose ack was lost
            if decided_under.as_deref() == Some(attempt) {
                return Ok(DecisionRecord::Applied(request));
            }
            return Ok(DecisionRecord::AlreadyDecided(request.status));
        }

        if outcome == DecisionOutcome::Reject {
            restore_in(&mut tx, &request.balance_key(), request.days()).await?;
        }

        let status = outcome.target_status();
        let decided_at = Utc::now();
        sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, decided_by = ?, decided_at = ?, decision_attempt = ?,
                decision_token = NULL
            WHERE id = ?
            "#,
        )
        .bind(status.as_ref())
        .bind(decided_by)
        .bind(decided_at)
        .bind(attempt)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(request_id = id, status = %status, "Decision committed");

        request.status = status;
        request.decided_by = Some(decided_by.to_string());
        request.decided_at = Some(decided_at);
        request.decision_token = None;
        Ok(DecisionRecord::Applied(request))
    }

    async fn pending_requests(&self) -> Result<Vec<LeaveRequest>, StoreError> {
        self.fetch_many("WHERE status = 'PENDING'", "created_at ASC, id ASC", &[])
            .await
    }

    async fn approved_on(&self, date: NaiveDate) -> Result<Vec<LeaveRequest>, StoreError> {
        self.fetch_many(
            "WHERE status = 'APPROVED' AND from_date <= ? AND to_date >= ?",
            "from_date ASC, id ASC",
            &[BindValue::Date(date), BindValue::Date(date)],
        )
        .await
    }

    async fn history_for(&self, employee_id: u64) -> Result<Vec<LeaveRequest>, StoreError> {
        self.fetch_many(
            "WHERE employee_id = ?",
            "created_at DESC, id DESC",
            &[BindValue::U64(employee_id)],
        )
        .await
    }
}
