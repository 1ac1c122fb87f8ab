use crate::auth::auth::AuthUser;
use crate::leave::engine::{LeaveEngine, LeaveWithRequester, SubmitLeave, approver_ref};
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_request::{DecisionOutcome, LeaveRequest};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "Sick")]
    /// free-form leave type; the allowance is tracked per type
    pub leave_type: String,
    #[schema(example = "Seasonal flu")]
    pub reason: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub from_date: NaiveDate,
    #[schema(example = "2026-01-02", format = "date", value_type = String)]
    pub to_date: NaiveDate,
}

#[derive(Deserialize, IntoParams)]
pub struct TokenQuery {
    /// decision token from the emailed link
    pub token: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct DateQuery {
    /// calendar day, YYYY-MM-DD
    #[param(value_type = String, format = "date", example = "2026-01-01")]
    pub date: NaiveDate,
}

#[derive(Deserialize, IntoParams)]
pub struct BalanceQuery {
    /// defaults to the current year
    pub year: Option<i32>,
    /// HR/Admin only; defaults to the caller
    pub employee_id: Option<u64>,
}

/* =========================
Submit leave request (employee)
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = Object,
         example = json!({
            "message": "Leave request submitted for approval",
            "id": 1,
            "status": "PENDING"
         })
        ),
        (status = 400, description = "Invalid dates, missing or overlong field, or insufficient balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile or employee inactive")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let payload = payload.into_inner();

    let request = engine
        .submit(SubmitLeave {
            employee_id,
            leave_type: payload.leave_type,
            reason: payload.reason,
            from_date: payload.from_date,
            to_date: payload.to_date,
        })
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Leave request submitted for approval",
        "id": request.id,
        "status": request.status
    })))
}

/* =========================
Approve / reject leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved", body = LeaveRequest),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already decided"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    decide_in_app(auth, engine, path.into_inner(), DecisionOutcome::Approve).await
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected, reserved days released", body = LeaveRequest),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already decided"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    decide_in_app(auth, engine, path.into_inner(), DecisionOutcome::Reject).await
}

async fn decide_in_app(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    leave_id: u64,
    outcome: DecisionOutcome,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let request = engine
        .decide(leave_id, outcome, &approver_ref(auth.user_id))
        .await?;

    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Decision links (emailed, no session)
========================= */
#[utoipa::path(
    get,
    path = "/leaves/approve",
    params(TokenQuery),
    responses(
        (status = 200, description = "Leave approved", body = Object, example = json!({
            "message": "Leave approved successfully"
        })),
        (status = 404, description = "Invalid or expired token"),
        (status = 409, description = "Leave request already decided")
    ),
    tag = "Leave"
)]
pub async fn approve_by_token(
    engine: web::Data<LeaveEngine>,
    query: web::Query<TokenQuery>,
) -> actix_web::Result<impl Responder> {
    decide_by_link(engine, query.into_inner(), DecisionOutcome::Approve).await
}

#[utoipa::path(
    get,
    path = "/leaves/reject",
    params(TokenQuery),
    responses(
        (status = 200, description = "Leave rejected", body = Object, example = json!({
            "message": "Leave rejected successfully"
        })),
        (status = 404, description = "Invalid or expired token"),
        (status = 409, description = "Leave request already decided")
    ),
    tag = "Leave"
)]
pub async fn reject_by_token(
    engine: web::Data<LeaveEngine>,
    query: web::Query<TokenQuery>,
) -> actix_web::Result<impl Responder> {
    decide_by_link(engine, query.into_inner(), DecisionOutcome::Reject).await
}

async fn decide_by_link(
    engine: web::Data<LeaveEngine>,
    query: TokenQuery,
    outcome: DecisionOutcome,
) -> actix_web::Result<HttpResponse> {
    let token = query.token.unwrap_or_default();
    engine.decide_by_token(&token, outcome).await?;

    let message = match outcome {
        DecisionOutcome::Approve => "Leave approved successfully",
        DecisionOutcome::Reject => "Leave rejected successfully",
    };
    Ok(HttpResponse::Ok().json(json!({ "message": message })))
}

/* =========================
Read paths
========================= */
/// Approver queue, oldest first
#[utoipa::path(
    get,
    path = "/api/leave/pending",
    responses(
        (status = 200, description = "Pending leave requests", body = [LeaveWithRequester]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn pending_leaves(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let pending = engine.pending_requests().await?;
    Ok(HttpResponse::Ok().json(pending))
}

/// Approved leave covering a calendar day
#[utoipa::path(
    get,
    path = "/api/leave/by-date",
    params(DateQuery),
    responses(
        (status = 200, description = "Approved leave on the date", body = [LeaveWithRequester]),
        (status = 400, description = "Malformed date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leaves_by_date(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    query: web::Query<DateQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let leaves = engine.requests_on_date(query.date).await?;
    Ok(HttpResponse::Ok().json(leaves))
}

/// Caller's own leave history, newest first
#[utoipa::path(
    get,
    path = "/api/leave/history",
    responses(
        (status = 200, description = "Leave history", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_history(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let history = engine.history_for(employee_id).await?;
    Ok(HttpResponse::Ok().json(history))
}

#[utoipa::path(
    get,
    path = "/api/leave/history/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee whose history to list")
    ),
    responses(
        (status = 200, description = "Leave history", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn employee_history(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let history = engine.history_for(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(history))
}

#[utoipa::path(
    get,
    path = "/api/leave/balance",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Ledger rows for the year", body = [LeaveBalance]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_balances(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    query: web::Query<BalanceQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match query.employee_id {
        Some(id) => id,
        None => auth.require_employee()?,
    };
    if !auth.can_view_employee(employee_id) {
        return Err(actix_web::error::ErrorForbidden("HR/Admin only"));
    }

    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let balances = engine.balances(employee_id, year).await?;
    Ok(HttpResponse::Ok().json(balances))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request 1 not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request = engine.get(path.into_inner()).await?;
    if !auth.can_view_employee(request.employee_id) {
        return Err(actix_web::error::ErrorForbidden("HR/Admin only"));
    }
    Ok(HttpResponse::Ok().json(request))
}
