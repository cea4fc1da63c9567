//! Lambert Conformal Conic projection onto the forecast provider's 5 km grid.
//!
//! The provider keys every short-term forecast by an integer (x, y) cell, so this
//! has to reproduce the provider's own conversion exactly. Two standard parallels
//! at 30°N and 60°N, origin at 126°E / 38°N placed on cell (43, 136).

use std::f64::consts::PI;

use crate::models::forecast::GridCell;

const EARTH_RADIUS_KM: f64 = 6371.00877;
const GRID_SPACING_KM: f64 = 5.0;
const STANDARD_PARALLEL_1: f64 = 30.0;
const STANDARD_PARALLEL_2: f64 = 60.0;
const ORIGIN_LON: f64 = 126.0;
const ORIGIN_LAT: f64 = 38.0;
const ORIGIN_X: f64 = 43.0;
const ORIGIN_Y: f64 = 136.0;

const DEG_TO_RAD: f64 = PI / 180.0;

struct Projection {
    re: f64,
    sn: f64,
    sf: f64,
    ro: f64,
    olon: f64,
}

impl Projection {
    fn new() -> Self {
        let re = EARTH_RADIUS_KM / GRID_SPACING_KM;
        let slat1 = STANDARD_PARALLEL_1 * DEG_TO_RAD;
        let slat2 = STANDARD_PARALLEL_2 * DEG_TO_RAD;
        let olon = ORIGIN_LON * DEG_TO_RAD;
        let olat = ORIGIN_LAT * DEG_TO_RAD;

        // cone constant
        let sn = (PI * 0.25 + slat2 * 0.5).tan() / (PI * 0.25 + slat1 * 0.5).tan();
        let sn = (slat1.cos() / slat2.cos()).ln() / sn.ln();

        let sf = (PI * 0.25 + slat1 * 0.5).tan();
        let sf = sf.powf(sn) * slat1.cos() / sn;

        let ro = (PI * 0.25 + olat * 0.5).tan();
        let ro = re * sf / ro.powf(sn);

        Self {
            re,
            sn,
            sf,
            ro,
            olon,
        }
    }

    fn to_grid(&self, lat: f64, lng: f64) -> GridCell {
        let ra = (PI * 0.25 + lat * DEG_TO_RAD * 0.5).tan();
        let ra = self.re * self.sf / ra.powf(self.sn);

        let mut theta = lng * DEG_TO_RAD - self.olon;
        if theta > PI {
            theta -= 2.0 * PI;
        }
        if theta < -PI {
            theta += 2.0 * PI;
        }
        theta *= self.sn;

        GridCell {
            x: (ra * theta.sin() + ORIGIN_X + 0.5).floor() as i32,
            y: (self.ro - ra * theta.cos() + ORIGIN_Y + 0.5).floor() as i32,
        }
    }
}

/// Convert a latitude/longitude pair into the forecast grid cell that contains it.
///
/// Never fails. Coordinates far outside the provider's coverage still produce a
/// cell, it just won't mean anything to the provider.
pub fn project(lat: f64, lng: f64) -> GridCell {
    Projection::new().to_grid(lat, lng)
}
