use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use replan_api::{config::AppConfig, db, routes, state::AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    env_logger::init_from_env(Env::default().default_filter_or("info"));
    log::info!("Application starting...");

    let config = AppConfig::from_env();

    let mongo = match &config.mongo_uri {
        Some(uri) => match db::mongo::create_mongo_client(uri).await {
            Ok(client) => Some(client),
            Err(e) => {
                log::error!("Failed to create MongoDB client: {}", e);
                None
            }
        },
        None => None,
    };

    let state = web::Data::new(AppState::from_config(&config, mongo));

    log::info!("Starting HTTP server on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().limit(1 << 20))
            .configure(routes::configure)
    })
    .bind((config.host.clone(), config.port))?
    .run()
    .await
}
