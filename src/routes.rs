use crate::{
    api::{requests, tax, users},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        60_000 / requests_per_min as u64
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("non-zero period and burst size");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let submit_limiter = build_limiter(config.rate_submit_per_min);
    let admin_limiter = build_limiter(config.rate_admin_per_min);
    let tax_limiter = build_limiter(config.rate_tax_per_min);
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    // Every route needs a session
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/requests")
                    // /requests/{kind}/form
                    .service(
                        web::resource("/{kind}/form").route(web::get().to(requests::get_form)),
                    )
                    // /requests/{kind}
                    .service(
                        web::resource("/{kind}")
                            .wrap(submit_limiter)
                            .route(web::post().to(requests::submit))
                            .route(web::get().to(requests::list_requests)),
                    ),
            )
            .service(
                web::scope("/admin")
                    .wrap(admin_limiter)
                    // /admin/users
                    .service(
                        web::resource("/users")
                            .route(web::post().to(users::create_user))
                            .route(web::put().to(users::edit_user)),
                    ),
            )
            .service(
                web::resource("/tax/lookup")
                    .wrap(tax_limiter)
                    .route(web::post().to(tax::lookup)),
            ),
    );
}

// IDENTITY PROVIDER
//  └─ issues access token (HS256, shared JWT_SECRET)

// API REQUEST
//  └─ Authorization: Bearer access_token
//       └─ auth_middleware builds Session
