//! Event service adapter over the remote HTTP API.
//!
//! # Endpoints
//!
//! - `GET {base}/events/nearby?latitude=&longitude=&radiusKm=&from=&to=`
//!   returns a JSON array of events (camelCase fields).
//! - `POST {base}/users/me/location` with `{"latitude":..,"longitude":..}`.
//!
//! Every request carries the bearer token when one is configured. Events
//! with out-of-range coordinates are dropped at this boundary so the
//! geometry code only ever sees valid points.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use minyan_core::{ApiConfig, EventQueryService, ServiceError};
use minyan_geo::validate_event;
use minyan_types::{EventId, GeoPoint, MinyanEvent};

use crate::error::EngineError;

/// An event as the API encodes it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    id: EventId,
    latitude: f64,
    longitude: f64,
    date: DateTime<Utc>,
    capacity: u32,
    current_count: u32,
}

impl From<WireEvent> for MinyanEvent {
    fn from(wire: WireEvent) -> Self {
        Self {
            id: wire.id,
            latitude: wire.latitude,
            longitude: wire.longitude,
            date: wire.date,
            capacity: wire.capacity,
            current_count: wire.current_count,
        }
    }
}

/// Keep the events whose coordinates are valid, logging the rest.
fn into_valid_events(wire: Vec<WireEvent>) -> Vec<MinyanEvent> {
    wire.into_iter()
        .map(MinyanEvent::from)
        .filter(|event| match validate_event(event) {
            Ok(()) => true,
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "dropping event with invalid coordinates");
                false
            }
        })
        .collect()
}

/// [`EventQueryService`] backed by the remote HTTP API.
pub struct HttpEventService {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpEventService {
    /// Build a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| EngineError::Http {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            access_token: config.access_token.clone(),
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl EventQueryService for HttpEventService {
    async fn list_nearby(
        &self,
        point: GeoPoint,
        radius_km: f64,
        on_or_after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<MinyanEvent>, ServiceError> {
        let url = format!("{}/events/nearby", self.base_url);
        let query = [
            ("latitude", point.latitude.to_string()),
            ("longitude", point.longitude.to_string()),
            ("radiusKm", radius_km.to_string()),
            ("from", on_or_after.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ("to", before.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ];

        let response = self
            .authorized(self.client.get(&url).query(&query))
            .send()
            .await
            .map_err(|e| ServiceError::Network(format!("event query failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Network(format!("event query returned {status}")));
        }

        let wire: Vec<WireEvent> = response
            .json()
            .await
            .map_err(|e| ServiceError::Network(format!("event query response parse failed: {e}")))?;
        let received = wire.len();
        let events = into_valid_events(wire);
        debug!(received, kept = events.len(), radius_km, "nearby events fetched");
        Ok(events)
    }

    async fn report_location(&self, point: GeoPoint) -> Result<(), ServiceError> {
        let url = format!("{}/users/me/location", self.base_url);
        let body = serde_json::json!({
            "latitude": point.latitude,
            "longitude": point.longitude,
        });

        let response = self
            .authorized(self.client.post(&url).json(&body))
            .send()
            .await
            .map_err(|e| ServiceError::Network(format!("location report failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Network(format!("location report returned {status}")));
        }
        Ok(())
    }
}
