use actix_web::{web, HttpResponse, Responder};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use crate::models::schedule::{validate_schedule, ScheduleEntry, ScheduleEntryPayload};
use crate::services::weather_risk_service::check_trip_days;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GapsRequest {
    pub schedule: Vec<ScheduleEntryPayload>,
    pub day: u32,
}

#[derive(Debug, Deserialize)]
pub struct RegenerateRequest {
    pub schedule: Vec<ScheduleEntryPayload>,
    pub day: u32,
    pub theme: String,
}

#[derive(Debug, Deserialize)]
pub struct RainRiskRequest {
    pub schedule: Vec<ScheduleEntryPayload>,
    pub trip_start_date: String,
}

fn bad_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({ "error": message }))
}

fn parse_schedule(
    payload: Vec<ScheduleEntryPayload>,
) -> Result<Vec<ScheduleEntry>, HttpResponse> {
    validate_schedule(payload).map_err(|e| {
        log::debug!("Rejected schedule: {}", e);
        bad_request(e.to_string())
    })
}

fn parse_trip_start(value: &str) -> Result<NaiveDate, HttpResponse> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        bad_request(format!(
            "Invalid trip_start_date '{}', expected YYYY-MM-DD",
            value
        ))
    })
}

fn parse_trip(request: RainRiskRequest) -> Result<(Vec<ScheduleEntry>, NaiveDate), HttpResponse> {
    let schedule = parse_schedule(request.schedule)?;
    let trip_start = parse_trip_start(&request.trip_start_date)?;
    check_trip_days(&schedule, trip_start).map_err(|e| {
        log::debug!("Rejected schedule: {}", e);
        bad_request(e.to_string())
    })?;
    Ok((schedule, trip_start))
}

/*
    /api/schedule/gaps
*/
pub async fn gaps(state: web::Data<AppState>, input: web::Json<GapsRequest>) -> impl Responder {
    let request = input.into_inner();
    let schedule = match parse_schedule(request.schedule) {
        Ok(schedule) => schedule,
        Err(response) => return response,
    };
    if request.day == 0 {
        return bad_request("day must be 1 or greater".to_string());
    }

    HttpResponse::Ok().json(state.replan.gaps_for_day(&schedule, request.day))
}

/*
    /api/schedule/regenerate
*/
pub async fn regenerate(
    state: web::Data<AppState>,
    input: web::Json<RegenerateRequest>,
) -> impl Responder {
    let request = input.into_inner();
    let schedule = match parse_schedule(request.schedule) {
        Ok(schedule) => schedule,
        Err(response) => return response,
    };
    if request.day == 0 {
        return bad_request("day must be 1 or greater".to_string());
    }
    if request.theme.trim().is_empty() {
        return bad_request("theme is required".to_string());
    }

    let regenerated = state
        .replan
        .regenerate_day(&schedule, request.day, request.theme.trim())
        .await;

    HttpResponse::Ok().json(json!({ "schedule": regenerated }))
}

/*
    /api/schedule/rain-risk
*/
pub async fn rain_risk(
    state: web::Data<AppState>,
    input: web::Json<RainRiskRequest>,
) -> impl Responder {
    let (schedule, trip_start) = match parse_trip(input.into_inner()) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    HttpResponse::Ok().json(state.rain_risk.check_rain_risk(&schedule, trip_start).await)
}

/*
    /api/schedule/forecast
*/
pub async fn forecast(
    state: web::Data<AppState>,
    input: web::Json<RainRiskRequest>,
) -> impl Responder {
    let (schedule, trip_start) = match parse_trip(input.into_inner()) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    HttpResponse::Ok().json(state.rain_risk.assess(&schedule, trip_start).await)
}
