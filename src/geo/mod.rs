mod client;
mod error;
mod schema;

pub use client::{GeoClient, IpGeolocator};
pub use error::LookupError;
pub use schema::{parse_body, GeoInfo, GeoResponse};
