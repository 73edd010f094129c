use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::configuration::ProviderSettings;
use crate::dates::date_stamp;
use crate::error::{Error, Result};
use crate::models::{Allergen, Concentration, ConcentrationId, Location, LocationId, RawMeasurement};

/// Source of pollen reference data and measurements.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn fetch_allergens(&self) -> Result<Vec<Allergen>>;

    async fn fetch_locations(&self) -> Result<Vec<Location>>;

    /// Measurements for `location` dated on or after `date_after`. There is
    /// at most one record per date and days without sampling are absent.
    async fn fetch_raw_measurements(
        &self,
        location: LocationId,
        date_after: NaiveDate,
    ) -> Result<Vec<RawMeasurement>>;

    async fn fetch_concentration(&self, id: ConcentrationId) -> Result<Concentration>;
}

#[derive(serde::Deserialize)]
struct Page<T> {
    results: Vec<T>,
}

/// The pollen open-data REST API.
pub struct HttpProvider {
    client: Client,
    base_url: String,
}

impl HttpProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::unavailable(&settings.base_url, e))?;
        Ok(HttpProvider {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn measurements_url(&self, location: LocationId, date_after: NaiveDate) -> String {
        self.url(&format!(
            "pollens/?date_after={}&location_ids={}",
            date_stamp(date_after),
            location
        ))
    }

    fn concentration_url(&self, id: ConcentrationId) -> String {
        self.url(&format!("concentrations/{}/", id))
    }

    async fn get(&self, url: &str) -> Result<Response> {
        debug!("GET {}", url);
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::unavailable(url, e))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.get(url)
            .await?
            .error_for_status()
            .map_err(|e| Error::unavailable(url, e))?
            .json()
            .await
            .map_err(|e| Error::unavailable(url, e))
    }
}

#[async_trait]
impl DataProvider for HttpProvider {
    async fn fetch_allergens(&self) -> Result<Vec<Allergen>> {
        self.get_json(&self.url("allergens/")).await
    }

    async fn fetch_locations(&self) -> Result<Vec<Location>> {
        self.get_json(&self.url("locations/")).await
    }

    async fn fetch_raw_measurements(
        &self,
        location: LocationId,
        date_after: NaiveDate,
    ) -> Result<Vec<RawMeasurement>> {
        let page: Page<RawMeasurement> = self
            .get_json(&self.measurements_url(location, date_after))
            .await?;
        Ok(page.results)
    }

    async fn fetch_concentration(&self, id: ConcentrationId) -> Result<Concentration> {
        let response = self.get(&self.concentration_url(id)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::ResolutionFailure {
                id,
                reason: format!("upstream answered {}", status),
            });
        }
        response.json().await.map_err(|e| Error::ResolutionFailure {
            id,
            reason: e.to_string(),
        })
    }
}
