use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::types::{ApiConfig, CacheConfig};
use crate::domain::booking::{Booking, BookingDraft, CreateBookingRequest};
use crate::domain::date_range::DateRange;
use crate::domain::room::Room;
use crate::domain::session::{AuthResponse, Credentials, Registration, Session};
use crate::error::{BookingError, Result};
use crate::ports::cache::ResponseCache;
use crate::ports::hotel_api::HotelApi;

use super::response;

#[derive(Deserialize)]
struct AvailabilityResponse {
    available: bool,
}

/// `HotelApi` over HTTP with reqwest.
///
/// Only the room catalogue goes through the cache. Nothing is retried: a failed
/// booking must never be submitted twice behind the user's back.
pub struct HotelApiClient {
    http: Client,
    base_url: Url,
    cache: Arc<dyn ResponseCache>,
    cache_config: CacheConfig,
}

impl HotelApiClient {
    pub fn new(
        config: &ApiConfig,
        cache_config: CacheConfig,
        cache: Arc<dyn ResponseCache>,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let base_url = Url::parse(&config.base_url)?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(BookingError::Config(format!(
                "api.base_url must be an http(s) URL, got '{}'",
                config.base_url
            )));
        }

        Ok(Self {
            http,
            base_url,
            cache,
            cache_config,
        })
    }

    /// Build `{base}/{segments..}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send a request and return the body of a 2xx response.
    async fn execute(
        &self,
        request: RequestBuilder,
        room_id: Option<&str>,
    ) -> Result<(StatusCode, String)> {
        let reply = request.send().await.map_err(|e| {
            warn!(error = %e, "Hotel API request failed");
            BookingError::Network(e)
        })?;
        let status = reply.status();
        let body = reply.text().await?;
        trace!(%status, body = %body, "Hotel API raw response");

        if status.is_success() {
            Ok((status, body))
        } else {
            warn!(%status, "Hotel API returned an error status");
            Err(response::error_for_status(status, &body, room_id))
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        session: Option<&Session>,
        room_id: Option<&str>,
    ) -> Result<T> {
        debug!(url = %url, "GET");
        let mut request = self.http.get(url);
        if let Some(session) = session {
            request = request.bearer_auth(&session.token);
        }
        let (status, body) = self.execute(request, room_id).await?;
        response::decode(status, &body)
    }

    async fn post_json<B: serde::Serialize + Sync, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
        session: Option<&Session>,
    ) -> Result<T> {
        debug!(url = %url, "POST");
        let mut request = self.http.post(url).json(body);
        if let Some(session) = session {
            request = request.bearer_auth(&session.token);
        }
        let (status, text) = self.execute(request, None).await?;
        response::decode(status, &text)
    }

    /// Catalogue GET served from the cache when fresh.
    async fn cached_get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        ttl_secs: u64,
        room_id: Option<&str>,
    ) -> Result<T> {
        let url = self.endpoint(segments);
        let cache_key = url.path().to_string();
        if let Some(cached) = self.cache.get(&cache_key)
            && let Ok(value) = serde_json::from_str::<T>(&cached)
        {
            debug!(key = %cache_key, "Cache hit");
            return Ok(value);
        }

        debug!(url = %url, "GET");
        let (status, body) = self.execute(self.http.get(url), room_id).await?;
        let value = response::decode(status, &body)?;
        self.cache
            .set(&cache_key, &body, Duration::from_secs(ttl_secs));
        Ok(value)
    }
}

#[async_trait]
impl HotelApi for HotelApiClient {
    async fn list_rooms(&self) -> Result<Vec<Room>> {
        self.cached_get(&["rooms"], self.cache_config.rooms_ttl_secs, None)
            .await
    }

    async fn get_room(&self, id: &str) -> Result<Room> {
        self.cached_get(&["rooms", id], self.cache_config.room_ttl_secs, Some(id))
            .await
    }

    async fn check_availability(&self, room_id: &str, range: &DateRange) -> Result<bool> {
        let mut url = self.endpoint(&["rooms", room_id, "availability"]);
        url.query_pairs_mut()
            .append_pair("checkInDate", &range.check_in_iso())
            .append_pair("checkOutDate", &range.check_out_iso());
        let answer: AvailabilityResponse = self.get_json(url, None, Some(room_id)).await?;
        debug!(room_id, %range, available = answer.available, "Availability answered");
        Ok(answer.available)
    }

    async fn create_booking(&self, session: &Session, draft: &BookingDraft) -> Result<Booking> {
        let body = CreateBookingRequest::from(draft);
        let booking: Booking = self
            .post_json(self.endpoint(&["bookings"]), &body, Some(session))
            .await?;
        debug!(booking_id = %booking.id, status = %booking.status, "Booking created");
        Ok(booking)
    }

    async fn list_user_bookings(&self, session: &Session) -> Result<Vec<Booking>> {
        self.get_json(self.endpoint(&["bookings"]), Some(session), None)
            .await
    }

    async fn register(&self, registration: &Registration) -> Result<Session> {
        let auth: AuthResponse = self
            .post_json(self.endpoint(&["users", "register"]), registration, None)
            .await?;
        Ok(auth.into_session(&registration.email))
    }

    async fn login(&self, credentials: &Credentials) -> Result<Session> {
        let auth: AuthResponse = self
            .post_json(self.endpoint(&["users", "login"]), credentials, None)
            .await?;
        Ok(auth.into_session(&credentials.email))
    }

    async fn save_favorite(&self, session: &Session, room_id: &str) -> Result<()> {
        if session.user.id.is_empty() {
            return Err(BookingError::Unauthorized {
                reason: "the session carries no user id; sign in again".into(),
            });
        }
        let url = self.endpoint(&["users", session.user.id.as_str(), "favorites"]);
        debug!(url = %url, "POST");
        let request = self
            .http
            .post(url)
            .bearer_auth(&session.token)
            .json(&serde_json::json!({ "roomId": room_id }));
        self.execute(request, None).await?;
        Ok(())
    }
}
