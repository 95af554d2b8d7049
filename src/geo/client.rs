use std::net::IpAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info, warn};

use crate::config::LookupConfig;
use crate::metrics;

use super::error::LookupError;
use super::schema::{parse_body, GeoInfo};

/// The lookup collaborator seam. Row controllers depend on this trait rather
/// than on the HTTP client, so tests can substitute a stub.
#[async_trait]
pub trait IpGeolocator: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> Result<GeoInfo, LookupError>;
}

pub struct GeoClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeoClient {
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn build_url(&self, ip: IpAddr) -> String {
        format!(
            "{}?key={}&ip={}&format=json",
            self.base_url, self.api_key, ip
        )
    }
}

#[async_trait]
impl IpGeolocator for GeoClient {
    #[tracing::instrument(skip(self), fields(ip = %ip))]
    async fn lookup(&self, ip: IpAddr) -> Result<GeoInfo, LookupError> {
        let start = Instant::now();
        metrics::record_lookup_attempt("started");

        let url = self.build_url(ip);
        debug!("Resolving address against geolocation API");

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        let result = match status.as_u16() {
            200..=299 => {
                let body = response.text().await?;
                parse_body(&body)
            }
            429 => {
                warn!("Geolocation API rate limited the request");
                Err(LookupError::RateLimited)
            }
            code => {
                let body = response.text().await.unwrap_or_default();
                error!(status = code, body = %body, "Geolocation API request failed");
                Err(LookupError::Status(code))
            }
        };

        metrics::record_lookup_duration(start.elapsed());
        match &result {
            Ok(info) => {
                metrics::record_lookup_attempt("success");
                info!(
                    country_code = %info.country_code,
                    utc_offset = %info.utc_offset,
                    "Resolved address"
                );
            }
            Err(e) => {
                metrics::record_lookup_error(e.kind());
            }
        }

        result
    }
}
