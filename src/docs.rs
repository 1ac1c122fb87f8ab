use crate::api::leave_request::CreateLeave;
use crate::leave::engine::LeaveWithRequester;
use crate::model::employee::EmployeeRecord;
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Ledger API",
        version = "1.0.0",
        description = r#"
## Leave Request Lifecycle & Balance Ledger

Employees request time off against a yearly allowance per leave type; approvers decide.

### 🔹 Key Features
- **Submission**
  - Days are reserved against the balance the moment a request is filed
- **Decisions**
  - In-app approve/reject for HR/Admin
  - Single-use emailed approve/reject links
  - Rejection returns the reserved days
- **Queries**
  - Pending queue, approved leave on a date, history, balances

### 🔐 Security
`/api` endpoints use **JWT Bearer authentication**.
`/leaves/approve` and `/leaves/reject` are authorized by their one-time token.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_request::create_leave,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::approve_by_token,
        crate::api::leave_request::reject_by_token,
        crate::api::leave_request::pending_leaves,
        crate::api::leave_request::leaves_by_date,
        crate::api::leave_request::my_history,
        crate::api::leave_request::employee_history,
        crate::api::leave_request::leave_balances
    ),
    components(
        schemas(
            CreateLeave,
            LeaveRequest,
            LeaveStatus,
            LeaveWithRequester,
            LeaveBalance,
            EmployeeRecord
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave request and balance APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
