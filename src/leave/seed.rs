use anyhow::Result;
use futures_util::StreamExt;
use sqlx::MySqlPool;
use tracing::{debug, info};

use super::store::LeaveStore;
use crate::model::leave_balance::BalanceKey;

/// Makes sure every active employee has a ledger row for each `leave_types`
/// entry in `year`. Existing rows are left as they are.
pub async fn seed_leave_balances(
    pool: &MySqlPool,
    store: &dyn LeaveStore,
    leave_types: &[String],
    year: i32,
    total: u32,
) -> Result<()> {
    if leave_types.is_empty() {
        debug!("No leave types configured for seeding");
        return Ok(());
    }

    let mut stream = sqlx::query_scalar::<_, u64>(
        r#"
        SELECT id
        FROM employees
        WHERE status = 'active'
        ORDER BY id
        "#,
    )
    .fetch(pool);

    let mut employees = 0usize;
    let mut created = 0usize;
    let mut skipped = 0usize;

    while let Some(row) = stream.next().await {
        let employee_id = row?;
        employees += 1;

        for leave_type in leave_types {
            let key = BalanceKey::new(employee_id, leave_type, year);
            if store.ensure_balance(&key, total).await? {
                created += 1;
            } else {
                skipped += 1;
            }
        }
    }

    info!(
        employees,
        created,
        skipped,
        year,
        "Leave balance seeding complete"
    );

    Ok(())
}
