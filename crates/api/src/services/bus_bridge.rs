//! HTTP bridge to the publish/subscribe bus.
//!
//! Alerts are POSTed to the broker's HTTP publish endpoint (for example an
//! MQTT broker's REST API), which forwards them to the topic the signal
//! controller subscribes to.

use std::time::Duration;

use async_trait::async_trait;
use domain::services::{AlertPublisher, PublishError};
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use sha2::Sha256;
use tracing::debug;

use crate::config::PublisherConfig;

/// Header carrying the HMAC-SHA256 signature of the request body.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Request body accepted by the broker publish endpoint.
#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    topic: &'a str,
    payload: &'a str,
    qos: u8,
}

/// Publisher that forwards alerts to a broker over HTTP.
///
/// Makes a single attempt per call; retrying is left to the dispatcher.
pub struct HttpBridgePublisher {
    client: Client,
    url: String,
    qos: u8,
    signing_secret: Option<String>,
}

impl HttpBridgePublisher {
    pub fn new(config: &PublisherConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            qos: config.qos,
            signing_secret: (!config.signing_secret.is_empty())
                .then(|| config.signing_secret.clone()),
        })
    }

    fn sign_body(&self, body: &str) -> Result<Option<String>, PublishError> {
        let Some(secret) = &self.signing_secret else {
            return Ok(None);
        };
        type HmacSha256 = Hmac<Sha256>;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| PublishError::Rejected(format!("signing failed: {}", e)))?;
        mac.update(body.as_bytes());
        Ok(Some(format!(
            "sha256={}",
            hex::encode(mac.finalize().into_bytes())
        )))
    }
}

/// Maps a broker response status onto the publish error taxonomy.
fn classify_status(status: StatusCode) -> Result<(), PublishError> {
    if status.is_success() {
        Ok(())
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Err(PublishError::Transient(format!("broker returned {}", status)))
    } else {
        Err(PublishError::Rejected(format!("broker returned {}", status)))
    }
}

#[async_trait]
impl AlertPublisher for HttpBridgePublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let payload = std::str::from_utf8(payload)
            .map_err(|e| PublishError::Rejected(format!("payload is not UTF-8: {}", e)))?;
        let body = serde_json::to_string(&PublishRequest {
            topic,
            payload,
            qos: self.qos,
        })
        .map_err(|e| PublishError::Rejected(e.to_string()))?;

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json");
        if let Some(signature) = self.sign_body(&body)? {
            request = request.header(SIGNATURE_HEADER, signature);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| PublishError::Transient(e.to_string()))?;

        let status = response.status();
        debug!(topic = %topic, status = status.as_u16(), "Bus bridge responded");
        classify_status(status)
    }
}
