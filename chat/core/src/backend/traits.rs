//! Chat Backend Traits
//!
//! The session talks to the trainer service only through [`ChatBackend`], so
//! tests can script a reply without a network and the HTTP details stay in one
//! place.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ChatError;
use crate::events::ChatEvent;
use crate::messages::SessionId;

/// Update delivered for one streaming exchange
#[derive(Clone, Debug, PartialEq)]
pub enum StreamUpdate {
    /// A decoded event
    Event(ChatEvent),
    /// The response body ended normally
    Complete,
    /// The byte source failed; no further updates follow
    Error(String),
}

/// A point on the map, in degrees
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
}

impl GeoPoint {
    /// Create a point
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both coordinates are within range
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Body of a chat request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Server-side conversation key
    pub session_id: SessionId,
    /// The user's message
    pub user_message: String,
    /// User latitude, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// User longitude, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    /// Logged-in member, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_id: Option<i64>,
}

impl ChatRequest {
    /// Create a request for a session
    pub fn new(session_id: SessionId, user_message: impl Into<String>) -> Self {
        Self {
            session_id,
            user_message: user_message.into(),
            lat: None,
            lng: None,
            member_id: None,
        }
    }

    /// Attach the user's location
    #[must_use]
    pub fn with_location(mut self, location: Option<GeoPoint>) -> Self {
        self.lat = location.map(|p| p.lat);
        self.lng = location.map(|p| p.lng);
        self
    }

    /// Attach the member id
    #[must_use]
    pub fn with_member_id(mut self, member_id: Option<i64>) -> Self {
        self.member_id = member_id;
        self
    }
}

/// Chat backend trait
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Send a message and stream the reply
    ///
    /// Returns a channel receiver yielding events in arrival order, then
    /// exactly one `Complete` or `Error`. Dropping the receiver cancels the
    /// exchange and releases the response.
    async fn send_streaming(
        &self,
        request: &ChatRequest,
    ) -> Result<mpsc::Receiver<StreamUpdate>, ChatError>;

    /// Forget the server-side conversation for a session
    async fn reset_session(&self, session_id: &SessionId) -> Result<(), ChatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = ChatRequest::new(SessionId("s-1".to_string()), "운동 추천해줘")
            .with_location(Some(GeoPoint::new(37.5, 127.0)))
            .with_member_id(Some(42));

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "sessionId": "s-1",
                "userMessage": "운동 추천해줘",
                "lat": 37.5,
                "lng": 127.0,
                "memberId": 42,
            })
        );
    }

    #[test]
    fn test_request_omits_absent_fields() {
        let request = ChatRequest::new(SessionId("s-2".to_string()), "hi");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "sessionId": "s-2", "userMessage": "hi" })
        );
    }

    #[test]
    fn test_geo_point_validity() {
        assert!(GeoPoint::new(37.5, 127.0).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -181.0).is_valid());
    }
}
