use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Directory view of an employee: just what the leave workflow needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "John Doe",
        "email": "john.doe@company.com",
        "active": true
    })
)]
pub struct EmployeeRecord {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "John Doe")]
    pub name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = true)]
    pub active: bool,
}

/// Columns read from `employees`.
#[derive(Debug, sqlx::FromRow)]
pub struct EmployeeRow {
    pub id: u64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub status: Option<String>,
}

impl From<EmployeeRow> for EmployeeRecord {
    fn from(row: EmployeeRow) -> Self {
        let name = match row.last_name.as_deref().map(str::trim) {
            Some(last) if !last.is_empty() => format!("{} {}", row.first_name, last),
            _ => row.first_name,
        };

        EmployeeRecord {
            id: row.id,
            name,
            email: row.email,
            active: row
                .status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("active")),
        }
    }
}
