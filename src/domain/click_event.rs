//! Click event model for analytics emission.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Request metadata captured when a short code is resolved.
///
/// All fields are optional to handle missing headers gracefully.
#[derive(Debug, Clone, Default)]
pub struct ClickContext {
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
    pub country: Option<String>,
}

impl ClickContext {
    /// Creates a click context from raw header values.
    pub fn new(
        client_ip: Option<String>,
        user_agent: Option<&str>,
        referrer: Option<&str>,
        country: Option<&str>,
    ) -> Self {
        Self {
            client_ip,
            user_agent: user_agent.map(|s| s.to_string()),
            referrer: referrer.map(|s| s.to_string()),
            country: country.map(|s| s.to_string()),
        }
    }
}

/// An analytics event emitted after a successful resolve.
///
/// # Usage Flow
///
/// 1. Built by [`crate::application::services::ResolverService::resolve`]
/// 2. Sent to a bounded channel (non-blocking, dropped when full)
/// 3. Delivered by [`crate::domain::analytics_worker::run_analytics_dispatcher`]
#[derive(Debug, Clone)]
pub struct ClickEvent {
    pub short_code: String,
    pub timestamp: DateTime<Utc>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
    pub country: Option<String>,
}

impl ClickEvent {
    /// Creates an event for `short_code` stamped with the current time.
    pub fn new(short_code: String, context: ClickContext) -> Self {
        Self {
            short_code,
            timestamp: Utc::now(),
            referrer: context.referrer,
            user_agent: context.user_agent,
            client_ip: context.client_ip,
            country: context.country,
        }
    }

    /// Wire payload for the analytics service.
    ///
    /// Missing metadata is sent as empty strings.
    pub fn payload(&self) -> ClickEventPayload {
        ClickEventPayload {
            short_url: self.short_code.clone(),
            timestamp: self.timestamp.to_rfc3339(),
            referrer: self.referrer.clone().unwrap_or_default(),
            user_agent: self.user_agent.clone().unwrap_or_default(),
            ip_address: self.client_ip.clone().unwrap_or_default(),
            country: self.country.clone().unwrap_or_default(),
        }
    }
}

/// JSON body posted to `{ANALYTICS_URL}/events/click`.
#[derive(Debug, Serialize)]
pub struct ClickEventPayload {
    pub short_url: String,
    pub timestamp: String,
    pub referrer: String,
    pub user_agent: String,
    pub ip_address: String,
    pub country: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_event_creation_full() {
        let context = ClickContext::new(
            Some("192.168.1.1".to_string()),
            Some("Mozilla/5.0"),
            Some("https://google.com"),
            Some("DE"),
        );
        let event = ClickEvent::new("abc123".to_string(), context);

        assert_eq!(event.short_code, "abc123");
        assert_eq!(event.client_ip, Some("192.168.1.1".to_string()));
        assert_eq!(event.user_agent, Some("Mozilla/5.0".to_string()));
        assert_eq!(event.referrer, Some("https://google.com".to_string()));
        assert_eq!(event.country, Some("DE".to_string()));
    }

    #[test]
    fn test_click_event_creation_minimal() {
        let event = ClickEvent::new("xyz".to_string(), ClickContext::default());

        assert_eq!(event.short_code, "xyz");
        assert!(event.client_ip.is_none());
        assert!(event.user_agent.is_none());
        assert!(event.referrer.is_none());
        assert!(event.country.is_none());
    }

    #[test]
    fn test_payload_fills_missing_fields_with_empty_strings() {
        let context = ClickContext::new(None, Some("Safari"), None, None);
        let payload = ClickEvent::new("code1".to_string(), context).payload();

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["short_url"], "code1");
        assert_eq!(value["user_agent"], "Safari");
        assert_eq!(value["referrer"], "");
        assert_eq!(value["ip_address"], "");
        assert_eq!(value["country"], "");
        assert!(value["timestamp"].as_str().unwrap().contains('T'));
    }
}
