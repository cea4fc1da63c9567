use actix_web::web;

pub mod health;
pub mod schedule;

/// Mount every route on `cfg`; handlers expect `web::Data<AppState>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/api").service(
                web::scope("/schedule")
                    .route("/gaps", web::post().to(schedule::gaps))
                    .route("/regenerate", web::post().to(schedule::regenerate))
                    .route("/rain-risk", web::post().to(schedule::rain_risk))
                    .route("/forecast", web::post().to(schedule::forecast)),
            ),
        );
}
