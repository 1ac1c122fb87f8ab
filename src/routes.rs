use crate::{api::leave_request, auth::middleware::auth_middleware, config::Config};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-scope limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let per_ms = (60_000 / requests_per_min as u64).max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .expect("per_millisecond and burst_size are non-zero");
        Governor::new(&cfg)
    }

    let decision_link_limiter = Arc::new(build_limiter(config.rate_decision_link_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes: emailed decision links carry their own credential
    cfg.service(
        web::scope("/leaves")
            .wrap(decision_link_limiter)
            .service(
                web::resource("/approve").route(web::get().to(leave_request::approve_by_token)),
            )
            .service(
                web::resource("/reject").route(web::get().to(leave_request::reject_by_token)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("").route(web::post().to(leave_request::create_leave)),
                    )
                    // fixed paths before /leave/{id}
                    .service(
                        web::resource("/pending")
                            .route(web::get().to(leave_request::pending_leaves)),
                    )
                    .service(
                        web::resource("/by-date")
                            .route(web::get().to(leave_request::leaves_by_date)),
                    )
                    .service(
                        web::resource("/balance")
                            .route(web::get().to(leave_request::leave_balances)),
                    )
                    .service(
                        web::resource("/history").route(web::get().to(leave_request::my_history)),
                    )
                    .service(
                        web::resource("/history/{employee_id}")
                            .route(web::get().to(leave_request::employee_history)),
                    )
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
                    // /leave/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    // /leave/{id}/reject
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    ),
            ),
    );
}

// SUBMIT
//  └─ POST /api/leave            (reserves days, emails approver)

// DECIDE
//  ├─ PUT /api/leave/{id}/approve|reject   (HR/Admin session)
//  └─ GET /leaves/approve|reject?token=    (emailed link, single use)
