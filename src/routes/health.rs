use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use std::collections::HashMap;
use std::env;

use crate::db::mongo::ping;
use crate::state::AppState;

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        environment: env::var("RUST_ENV").unwrap_or("development".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let mongo_result = check_mongodb(&state).await;
    health
        .services
        .insert("mongodb".to_string(), mongo_result.clone());

    let weather_result = check_weather(&state);
    health
        .services
        .insert("weather".to_string(), weather_result.clone());

    // Degraded rather than down: both collaborators have fallbacks
    if mongo_result.status != "ok" || weather_result.status != "ok" {
        health.status = "degraded".to_string();
    }

    HttpResponse::Ok().json(health)
}

async fn check_mongodb(state: &AppState) -> ServiceStatus {
    let Some(client) = &state.mongo else {
        return ServiceStatus {
            status: "disabled".to_string(),
            details: Some("MONGODB_URI not set, using in-memory places".to_string()),
        };
    };

    match ping(client).await {
        Ok(_) => ServiceStatus {
            status: "ok".to_string(),
            details: None,
        },
        Err(e) => ServiceStatus {
            status: "error".to_string(),
            details: Some(format!("MongoDB ping failed: {}", e)),
        },
    }
}

fn check_weather(state: &AppState) -> ServiceStatus {
    if state.weather_configured {
        ServiceStatus {
            status: "ok".to_string(),
            details: None,
        }
    } else {
        ServiceStatus {
            status: "disabled".to_string(),
            details: Some("KMA_SERVICE_KEY not set, forecasts fall back".to_string()),
        }
    }
}
