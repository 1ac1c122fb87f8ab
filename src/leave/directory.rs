use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use sqlx::MySqlPool;

use super::store::StoreError;
use crate::model::employee::{EmployeeRecord, EmployeeRow};

/// Employee lookups the leave workflow depends on.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn lookup(&self, employee_id: u64) -> Result<Option<EmployeeRecord>, StoreError>;
}

/// Reads `employees`, keeping hits in a short-lived cache so the approver
/// queue does not query once per row.
pub struct MySqlEmployeeDirectory {
    pool: MySqlPool,
    cache: Cache<u64, EmployeeRecord>,
}

impl MySqlEmployeeDirectory {
    pub fn new(pool: MySqlPool, ttl: Duration) -> Self {
        Self {
            pool,
            cache: Cache::builder()
                .max_capacity(50_000) // tune based on memory
                .time_to_live(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl EmployeeDirectory for MySqlEmployeeDirectory {
    async fn lookup(&self, employee_id: u64) -> Result<Option<EmployeeRecord>, StoreError> {
        if let Some(hit) = self.cache.get(&employee_id).await {
            return Ok(Some(hit));
        }

        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, first_name, last_name, email, status
            FROM employees
            WHERE id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        let record = row.map(EmployeeRecord::from);
        if let Some(record) = &record {
            self.cache.insert(employee_id, record.clone()).await;
        }
        Ok(record)
    }
}
