use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flags::{flag_urls, FlagUrls};
use crate::geo::GeoInfo;
use crate::rows::{RowId, RowView};

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub country_code: String,
    pub time_zone: String,
}

impl From<GeoInfo> for LookupResponse {
    fn from(info: GeoInfo) -> Self {
        Self {
            country_code: info.country_code,
            time_zone: info.utc_offset,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RowResponse {
    pub id: RowId,
    pub index: usize,
    pub is_loading: bool,
    pub error: Option<String>,
    pub country_code: Option<String>,
    pub flag: Option<FlagUrls>,
    pub utc_offset: Option<String>,
    pub time: Option<String>,
}

impl From<RowView> for RowResponse {
    fn from(view: RowView) -> Self {
        let flag = view.snapshot.country_code.as_deref().map(flag_urls);
        Self {
            id: view.id,
            index: view.index,
            is_loading: view.snapshot.is_loading,
            error: view.snapshot.error,
            country_code: view.snapshot.country_code,
            flag,
            utc_offset: view.snapshot.utc_offset,
            time: view.time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RowsResponse {
    pub rows: Vec<RowResponse>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAddressRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}
