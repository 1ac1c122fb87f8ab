use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Inclusive day count between two dates: a single-day request costs 1.
///
/// Callers validate `from <= to` first; an inverted range counts as zero.
pub fn day_count(from: NaiveDate, to: NaiveDate) -> u32 {
    let span = (to - from).num_days() + 1;
    u32::try_from(span).unwrap_or(0)
}

/// Ledger row identity: one allowance per employee, leave type and year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
#[display(fmt = "{}/{}/{}", employee_id, leave_type, year)]
pub struct BalanceKey {
    pub employee_id: u64,
    pub leave_type: String,
    pub year: i32,
}

impl BalanceKey {
    pub fn new(employee_id: u64, leave_type: &str, year: i32) -> Self {
        Self {
            employee_id,
            leave_type: leave_type.to_string(),
            year,
        }
    }
}

/// Result of a reservation attempt against one ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Reserved,
    Insufficient { available: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[schema(example = json!({
    "leave_type": "Sick",
    "year": 2024,
    "total": 20,
    "used": 3
}))]
pub struct LeaveBalance {
    #[schema(example = "Sick")]
    pub leave_type: String,
    #[schema(example = 2024)]
    pub year: i32,
    /// allowance in days
    #[schema(example = 20)]
    pub total: u32,
    /// days consumed by approved or pending requests
    #[schema(example = 3)]
    pub used: u32,
}

impl LeaveBalance {
    pub fn fresh(leave_type: &str, year: i32, total: u32) -> Self {
        Self {
            leave_type: leave_type.to_string(),
            year,
            total,
            used: 0,
        }
    }

    pub fn available(&self) -> u32 {
        self.total.saturating_sub(self.used)
    }
}
