pub mod gap_analysis_service;
pub mod grid_projection_service;
pub mod place_service;
pub mod proximity_service;
pub mod replan_service;
pub mod weather_risk_service;
pub mod weather_service;
