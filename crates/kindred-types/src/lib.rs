pub mod api;
pub mod params;
