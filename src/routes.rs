use crate::{
    api::{
        analytics, audit_log, department, employee, holiday, leave_application, leave_balance,
        notification, settings, team,
    },
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::anyhow;
use std::sync::Arc;

type Limiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-scope rate limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    protected: Arc<Limiter>,
    provision: Arc<Limiter>,
}

fn build_limiter(requests_per_min: u32) -> anyhow::Result<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit of {requests_per_min} requests per minute"))?;
    Ok(Governor::new(&cfg))
}

impl Limiters {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            protected: Arc::new(build_limiter(config.rate_protected_per_min)?),
            provision: Arc::new(build_limiter(config.rate_provision_per_min)?),
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .service(
                web::scope("/employee")
                    // /employee/provision
                    .service(
                        web::resource("/provision")
                            .wrap(limiters.provision.clone())
                            .route(web::post().to(employee::provision_employee)),
                    )
                    // /employee
                    .service(web::resource("").route(web::get().to(employee::list_employees)))
                    // /employee/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee)),
                    )
                    .service(
                        web::resource("/{id}/manager").route(web::put().to(employee::assign_manager)),
                    )
                    .service(web::resource("/{id}/role").route(web::put().to(employee::set_role))),
            )
            .service(
                web::scope("/departments")
                    .service(
                        web::resource("")
                            .route(web::get().to(department::list_departments))
                            .route(web::post().to(department::create_department)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(department::update_department))
                            .route(web::delete().to(department::delete_department)),
                    ),
            )
            .service(web::resource("/leave-types").route(web::get().to(leave_balance::list_leave_types)))
            .service(
                web::scope("/leave-balance")
                    .service(web::resource("").route(web::get().to(leave_balance::get_balances)))
                    .service(
                        web::resource("/{id}/adjustment").route(web::put().to(leave_balance::adjust)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_application::leave_history))
                            .route(web::post().to(leave_application::apply_leave)),
                    )
                    // /leave/pending, ahead of /leave/{id}
                    .service(
                        web::resource("/pending")
                            .route(web::get().to(leave_application::pending_for_action)),
                    )
                    .service(
                        web::resource("/{id}").route(web::get().to(leave_application::get_leave)),
                    )
                    .service(
                        web::resource("/{id}/decision")
                            .route(web::put().to(leave_application::decide_leave)),
                    )
                    .service(
                        web::resource("/{id}/cancel")
                            .route(web::put().to(leave_application::cancel_leave)),
                    ),
            )
            .service(
                web::scope("/team")
                    .service(web::resource("").route(web::get().to(team::members)))
                    .service(web::resource("/ids").route(web::get().to(team::member_ids)))
                    .service(web::resource("/stats").route(web::get().to(team::stats)))
                    .service(web::resource("/balances").route(web::get().to(team::balances)))
                    .service(web::resource("/is-manager").route(web::get().to(team::is_manager))),
            )
            .service(web::resource("/analytics").route(web::get().to(analytics::leave_analytics)))
            .service(web::resource("/dashboard").route(web::get().to(analytics::org_dashboard)))
            .service(
                web::scope("/holidays")
                    .service(
                        web::resource("")
                            .route(web::get().to(holiday::list_holidays))
                            .route(web::post().to(holiday::create_holiday)),
                    )
                    .service(web::resource("/import").route(web::post().to(holiday::import_holidays)))
                    .service(web::resource("/opt-ins").route(web::get().to(holiday::my_opt_ins)))
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(holiday::update_holiday))
                            .route(web::delete().to(holiday::delete_holiday)),
                    )
                    .service(
                        web::resource("/{id}/opt-in")
                            .route(web::post().to(holiday::opt_in))
                            .route(web::delete().to(holiday::opt_out)),
                    ),
            )
            .service(
                web::scope("/notifications")
                    .service(web::resource("").route(web::get().to(notification::list_notifications)))
                    .service(
                        web::resource("/unread-count").route(web::get().to(notification::unread_count)),
                    )
                    .service(
                        web::resource("/read-all").route(web::put().to(notification::mark_all_read)),
                    )
                    .service(web::resource("/{id}/read").route(web::put().to(notification::mark_read))),
            )
            .service(
                web::scope("/settings")
                    .service(
                        web::resource("/organization")
                            .route(web::get().to(settings::get_organization))
                            .route(web::put().to(settings::update_organization)),
                    )
                    .service(
                        web::resource("/notification-preferences")
                            .route(web::get().to(settings::get_preferences))
                            .route(web::put().to(settings::update_preferences)),
                    )
                    .service(
                        web::resource("/banners")
                            .route(web::get().to(settings::list_banners))
                            .route(web::put().to(settings::upsert_banner)),
                    )
                    .service(
                        web::resource("/banners/active").route(web::get().to(settings::active_banners)),
                    ),
            )
            .service(web::resource("/audit-logs").route(web::get().to(audit_log::list_audit_logs))),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test as actix_test, web::Data};

    #[test]
    fn limiter_config_survives_extreme_rates() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(1).is_ok());
        assert!(build_limiter(1_000_000).is_ok());
    }

    #[actix_web::test]
    async fn protected_scope_requires_a_token() {
        let config = Config::for_tests();
        let limiters = Limiters::from_config(&config).unwrap();
        let app = actix_test::init_service(
            App::new()
                .app_data(Data::new(config.clone()))
                .configure(|cfg| configure(cfg, &config, &limiters)),
        )
        .await;

        for uri in ["/api/leave", "/api/team/stats", "/api/holidays", "/api/audit-logs"] {
            let req = actix_test::TestRequest::get()
                .uri(uri)
                .peer_addr("127.0.0.1:40000".parse().unwrap())
                .to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }
}
