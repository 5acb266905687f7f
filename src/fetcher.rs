use crate::config::SourceConfig;
use crate::error::{AppError, Result};
use crate::models::StationRecord;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Point of interest as returned by the Open Charge Map `poi` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Poi {
    #[serde(rename = "ID")]
    pub id: Option<i64>,
    #[serde(default)]
    pub address_info: Option<AddressInfo>,
    #[serde(default)]
    pub operator_info: Option<OperatorInfo>,
    #[serde(default)]
    pub connections: Option<Vec<Connection>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressInfo {
    pub title: Option<String>,
    pub address_line1: Option<String>,
    pub town: Option<String>,
    pub postcode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OperatorInfo {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Connection {
    #[serde(rename = "PowerKW")]
    pub power_kw: Option<f64>,
}

pub struct Fetcher {
    client: Client,
    base_url: String,
    api_key: String,
    country_code: String,
    max_results: u32,
    max_retries: u32,
    backoff_base: Duration,
}

impl Fetcher {
    pub fn new(source: &SourceConfig) -> Result<Self> {
        let api_key = source.require_api_key()?.to_string();

        let client = Client::builder()
            .user_agent(concat!("chargemap-ingest/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(source.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: source.base_url.trim_end_matches('/').to_string(),
            api_key,
            country_code: source.country_code.to_uppercase(),
            max_results: source.max_results,
            max_retries: source.max_retries,
            backoff_base: Duration::from_secs(1),
        })
    }

    /// Override the first retry delay; later retries double it.
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    pub fn request_url(&self) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| AppError::Config(format!("Invalid base_url '{}': {}", self.base_url, e)))?;

        url.query_pairs_mut()
            .append_pair("countrycode", &self.country_code)
            .append_pair("maxresults", &self.max_results.to_string())
            .append_pair("compact", "true")
            .append_pair("verbose", "false")
            .append_pair("output", "json");

        Ok(url)
    }

    /// Download every charging point for the configured country.
    pub async fn fetch_pois(&self) -> Result<Vec<Poi>> {
        let url = self.request_url()?;
        info!("Fetching charging stations for {}", self.country_code);

        let pois = retry_with_backoff(self.max_retries, self.backoff_base, || async {
            debug!("GET {}", url.path());
            let response = self
                .client
                .get(url.clone())
                .header("X-API-Key", &self.api_key)
                .send()
                .await?
                .error_for_status()?;

            let pois = response.json::<Vec<Poi>>().await?;
            Ok(pois)
        })
        .await?;

        info!("Found {} charging stations", pois.len());
        Ok(pois)
    }

    /// Fetch and flatten in one step.
    pub async fn fetch_stations(&self, fetched_at: &str) -> Result<Vec<StationRecord>> {
        let pois = self.fetch_pois().await?;
        Ok(flatten_pois(&pois, fetched_at))
    }
}

/// Flatten API points of interest into station records.
///
/// The point count is the number of connections and the total power is the sum
/// of the connections that report one.
pub fn flatten_pois(pois: &[Poi], fetched_at: &str) -> Vec<StationRecord> {
    pois.iter().map(|poi| flatten_poi(poi, fetched_at)).collect()
}

fn flatten_poi(poi: &Poi, fetched_at: &str) -> StationRecord {
    let address = poi.address_info.as_ref();
    let connections = poi.connections.as_deref().unwrap_or(&[]);
    let total_power: f64 = connections.iter().filter_map(|c| c.power_kw).sum();

    StationRecord {
        id: poi.id.map(Value::from),
        name: text(address.and_then(|a| a.title.as_deref())),
        operator: text(poi.operator_info.as_ref().and_then(|o| o.title.as_deref())),
        address: text(address.and_then(|a| a.address_line1.as_deref())),
        city: text(address.and_then(|a| a.town.as_deref())),
        postal_code: text(address.and_then(|a| a.postcode.as_deref())),
        latitude: address.and_then(|a| a.latitude).map(Value::from),
        longitude: address.and_then(|a| a.longitude).map(Value::from),
        number_of_points: Some(Value::from(connections.len())),
        total_power_kw: Some(Value::from(total_power)),
        last_update: Some(Value::from(fetched_at)),
    }
}

fn text(value: Option<&str>) -> Option<Value> {
    value.map(Value::from)
}

/// Retry a future with exponential backoff
async fn retry_with_backoff<F, Fut, T>(max_retries: u32, base: Duration, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut retries = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                retries += 1;

                if retries > max_retries {
                    return Err(e);
                }

                let should_retry = match &e {
                    AppError::Http(reqwest_err) => {
                        // Connection errors, timeouts and 5xx are transient
                        reqwest_err.is_timeout()
                            || reqwest_err.is_connect()
                            || reqwest_err
                                .status()
                                .map(|s| s.is_server_error())
                                .unwrap_or(false)
                    }
                    AppError::Io(_) => true,
                    _ => false,
                };

                if !should_retry {
                    return Err(e);
                }

                let delay = base * 2u32.pow(retries.saturating_sub(1));
                warn!(
                    "Request failed (attempt {}/{}): {}. Retrying in {:?}...",
                    retries, max_retries, e, delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
