//! Calendar booking — events-insert over HTTP.
//!
//! The scheduling engine books meetings through the [`CalendarBooker`]
//! trait; the production backend speaks the Google Calendar v3 events
//! API (any compatible server works via `CALENDAR_API_URL`).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

// ── Configuration ───────────────────────────────────────────────────

/// Calendar backend configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub api_url: String,
    pub api_token: secrecy::SecretString,
    pub calendar_id: String,
}

impl CalendarConfig {
    /// Build config from environment variables.
    /// Returns `None` if `CALENDAR_API_TOKEN` is not set.
    pub fn from_env() -> Option<Self> {
        let api_token = std::env::var("CALENDAR_API_TOKEN").ok()?;

        let api_url = std::env::var("CALENDAR_API_URL")
            .unwrap_or_else(|_| "https://www.googleapis.com/calendar/v3".to_string());

        let calendar_id =
            std::env::var("CALENDAR_ID").unwrap_or_else(|_| "primary".to_string());

        Some(Self {
            api_url,
            api_token: secrecy::SecretString::from(api_token),
            calendar_id,
        })
    }
}

// ── Trait ───────────────────────────────────────────────────────────

/// Trait for calendar backends — pure I/O, no business logic.
#[async_trait]
pub trait CalendarBooker: Send + Sync {
    /// Book a meeting with one attendee. Returns an external event
    /// reference on success.
    async fn book(
        &self,
        attendee: &str,
        summary: &str,
        start: DateTime<Utc>,
        duration: Duration,
    ) -> Result<String, CalendarError>;
}

// ── HTTP backend ────────────────────────────────────────────────────

// API request/response types (Google Calendar JSON shapes)

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventInsertRequest {
    summary: String,
    start: EventDateTime,
    end: EventDateTime,
    attendees: Vec<EventAttendee>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventAttendee {
    email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventInsertResponse {
    id: String,
    #[serde(default)]
    html_link: Option<String>,
}

/// Calendar bookings over the events-insert HTTP API.
pub struct HttpCalendar {
    client: reqwest::Client,
    config: CalendarConfig,
}

impl HttpCalendar {
    pub fn new(config: CalendarConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl CalendarBooker for HttpCalendar {
    async fn book(
        &self,
        attendee: &str,
        summary: &str,
        start: DateTime<Utc>,
        duration: Duration,
    ) -> Result<String, CalendarError> {
        let end = start + chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::hours(1));

        let request = EventInsertRequest {
            summary: summary.to_string(),
            start: EventDateTime {
                date_time: start.to_rfc3339(),
            },
            end: EventDateTime {
                date_time: end.to_rfc3339(),
            },
            attendees: vec![EventAttendee {
                email: attendee.to_string(),
            }],
        };

        let url = format!(
            "{}/calendars/{}/events",
            self.config.api_url, self.config.calendar_id
        );

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_token.expose_secret()),
            )
            .json(&request)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CalendarError::AuthFailed(
                "calendar API rejected the token".into(),
            ));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CalendarError::BookingFailed(format!(
                "events insert returned {status}: {body}"
            )));
        }

        let event: EventInsertResponse = response
            .json()
            .await
            .map_err(|e| CalendarError::BookingFailed(format!("invalid event response: {e}")))?;

        tracing::info!(
            attendee = %attendee,
            event_id = %event.id,
            "Meeting booked"
        );

        Ok(event.html_link.unwrap_or(event.id))
    }
}

// ── Disabled backend ────────────────────────────────────────────────

/// Backend used when no calendar is configured. Every booking fails
/// with a clear error, which the scheduling engine records on the
/// meeting instead of raising — the run completes, the artifact shows
/// what could not be booked.
pub struct DisabledCalendar;

#[async_trait]
impl CalendarBooker for DisabledCalendar {
    async fn book(
        &self,
        attendee: &str,
        _summary: &str,
        _start: DateTime<Utc>,
        _duration: Duration,
    ) -> Result<String, CalendarError> {
        tracing::debug!(attendee = %attendee, "Calendar not configured; booking recorded as failed");
        Err(CalendarError::BookingFailed(
            "calendar not configured (CALENDAR_API_TOKEN unset)".into(),
        ))
    }
}
