pub mod api;
pub mod clock;
pub mod config;
pub mod flags;
pub mod geo;
pub mod metrics;
pub mod rows;
pub mod validation;

pub use api::{create_router, AppError, AppState};
pub use clock::{OffsetClock, SharedNow, UtcOffset};
pub use config::AppConfig;
pub use geo::{GeoClient, GeoInfo, IpGeolocator, LookupError};
pub use metrics::init_metrics;
pub use rows::{RowController, RowRegistry, RowSnapshot, RowView};
pub use validation::{parse_ip, ValidationError};
