use serde::Deserialize;

use super::error::LookupError;

/// Wire shape of a successful geolocation response. The upstream API returns
/// many more fields; only these two are consumed, the rest are ignored.
#[derive(Debug, Deserialize)]
pub struct GeoResponse {
    pub country_code: String,
    pub time_zone: String,
}

/// A validated lookup result: lowercase two-letter country code plus the raw
/// signed `HH:MM` offset reported for the address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoInfo {
    pub country_code: String,
    pub utc_offset: String,
}

/// Parse and validate a response body. Malformed bodies are rejected before
/// they can be surfaced as success.
pub fn parse_body(body: &str) -> Result<GeoInfo, LookupError> {
    let response: GeoResponse = serde_json::from_str(body)
        .map_err(|e| LookupError::MalformedResponse(e.to_string()))?;
    validate(response)
}

fn validate(response: GeoResponse) -> Result<GeoInfo, LookupError> {
    let code = response.country_code;
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(LookupError::MalformedResponse(format!(
            "country_code must be a two-letter code, got {:?}",
            code
        )));
    }
    Ok(GeoInfo {
        country_code: code.to_ascii_lowercase(),
        utc_offset: response.time_zone,
    })
}
