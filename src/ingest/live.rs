//! Current conditions from OpenWeatherMap, turned into LIVE measurements.

use crate::ingest::error::LiveDataError;
use crate::types::into_timestamp::IntoTimestamp;
use crate::types::measurement::Measurement;
use crate::types::source::Source;
use crate::utils::round1;
use bon::bon;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_OWM_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Current conditions at one location, as reported by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveObservation {
    /// °C
    pub temperature: f64,
    /// mm in the last hour
    pub precipitation_1h: f64,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub cloud_cover_percent: f64,
}

impl LiveObservation {
    /// Reads the provider's "current weather" JSON.
    ///
    /// Missing rain counts as 0 mm and missing cloud cover as fully overcast.
    ///
    /// # Errors
    ///
    /// Returns [`LiveDataError::Provider`] with the provider's `message` when the response has
    /// no temperature, which is how unknown locations and bad keys are reported.
    pub fn from_provider_json(location: &str, data: &Value) -> Result<Self, LiveDataError> {
        let Some(temperature) = data.pointer("/main/temp").and_then(Value::as_f64) else {
            let message = data
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("No temperature in response")
                .to_string();
            return Err(LiveDataError::Provider {
                location: location.to_string(),
                message,
            });
        };
        let timestamp = |pointer: &str| {
            data.pointer(pointer)
                .and_then(Value::as_i64)
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
        };

        Ok(Self {
            temperature,
            precipitation_1h: data
                .pointer("/rain/1h")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            sunrise: timestamp("/sys/sunrise"),
            sunset: timestamp("/sys/sunset"),
            cloud_cover_percent: data
                .pointer("/clouds/all")
                .and_then(Value::as_f64)
                .unwrap_or(100.0),
        })
    }

    /// Day length between sunrise and sunset in hours; 0 when either is unknown.
    pub fn day_length_hours(&self) -> f64 {
        match (self.sunrise, self.sunset) {
            (Some(rise), Some(set)) => (set - rise).num_seconds() as f64 / 3600.0,
            _ => 0.0,
        }
    }

    /// Estimated sunshine: the cloud-free share of the day length, at least 0, one decimal.
    pub fn sunshine_hours(&self) -> f64 {
        let clear = 1.0 - self.cloud_cover_percent / 100.0;
        round1((clear * self.day_length_hours()).max(0.0))
    }

    pub fn into_measurement(self, location: &str, now: impl IntoTimestamp) -> Measurement {
        if self.sunrise.is_none() || self.sunset.is_none() {
            warn!("No sunrise/sunset for {}; sunshine recorded as 0", location);
        }
        Measurement::builder()
            .timestamp(now)
            .temperature(self.temperature)
            .precipitation(self.precipitation_1h)
            .sunshine_hours(self.sunshine_hours())
            .source(Source::Live)
            .location(location.trim())
            .build()
    }
}

/// Blocking client for the OpenWeatherMap current-weather endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[bon]
impl OpenWeatherClient {
    /// # Errors
    ///
    /// Returns [`LiveDataError::MissingApiKey`] for an empty key and
    /// [`LiveDataError::HttpClient`] if the HTTP client cannot be built.
    #[builder]
    pub fn new(
        #[builder(into)] api_key: String,
        #[builder(into, default = DEFAULT_OWM_BASE_URL.to_string())] base_url: String,
        #[builder(default = DEFAULT_TIMEOUT)] timeout: Duration,
    ) -> Result<Self, LiveDataError> {
        if api_key.trim().is_empty() {
            return Err(LiveDataError::MissingApiKey);
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LiveDataError::HttpClient)?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl OpenWeatherClient {
    /// Raw provider JSON for `location`, whatever the HTTP status; the provider reports errors
    /// in the body.
    pub fn fetch_raw(&self, location: &str) -> Result<Value, LiveDataError> {
        let url = format!("{}/weather", self.base_url);
        debug!("Requesting current weather for {}", location);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", "de"),
            ])
            .send()
            .map_err(|e| LiveDataError::NetworkRequest(url.clone(), e))?;
        let body = response
            .text()
            .map_err(|e| LiveDataError::NetworkRequest(url, e))?;
        serde_json::from_str(&body).map_err(|e| LiveDataError::Decode {
            location: location.to_string(),
            source: e,
        })
    }

    /// Current conditions at `location`.
    pub fn current(&self, location: &str) -> Result<LiveObservation, LiveDataError> {
        LiveObservation::from_provider_json(location, &self.fetch_raw(location)?)
    }
}
