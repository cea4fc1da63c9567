pub mod forecast;
pub mod place;
pub mod schedule;
