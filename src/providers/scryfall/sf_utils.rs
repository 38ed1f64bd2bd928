use log::warn;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::SwipeConfig;

/// Construct the HTTP headers for Scryfall.
///
/// Scryfall rejects requests without a `User-Agent` and `Accept` header. The
/// `Authorization` header is only added when a client secret is configured.
pub fn build_http_header(config: &SwipeConfig) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("User-Agent".to_string(), config.user_agent.clone());
    headers.insert("Accept".to_string(), "application/json;q=0.9,*/*;q=0.8".to_string());

    match config.client_secret.as_deref() {
        Some(client_secret) if !client_secret.trim().is_empty() => {
            headers.insert(
                "Authorization".to_string(),
                format!("Bearer {}", client_secret.trim()),
            );
            headers.insert("Connection".to_string(), "Keep-Alive".to_string());
        }
        Some(_) => warn!("Scryfall client_secret is blank. Defaulting to non-authorized mode"),
        None => {}
    }

    headers
}

/// `true` when the payload is Scryfall's `{"object": "error", ...}` shape
pub fn is_error_object(payload: &Value) -> bool {
    payload.get("object").and_then(|v| v.as_str()) == Some("error")
}

/// The `details` message of an error object, with a fallback for bare errors
pub fn error_details(payload: &Value) -> String {
    payload
        .get("details")
        .and_then(|v| v.as_str())
        .unwrap_or("Scryfall returned an error without details")
        .to_string()
}

/// Read a string field, treating JSON `null` the same as a missing key
pub fn str_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(|v| v.as_str())
}

/// The first entry of `card_faces`, if the card has faces at all
pub fn first_face(payload: &Value) -> Option<&Value> {
    payload
        .get("card_faces")
        .and_then(|v| v.as_array())
        .and_then(|faces| faces.first())
}
