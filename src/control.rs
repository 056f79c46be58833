//! HTTP command client for the thermostat controller.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::{Setpoint, Snapshot};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Could not reach thermostat controller: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Controller rejected request with status {status} {reason}, response: {body}")]
    Rejected {
        status: u16,
        reason: &'static str,
        body: String,
    },
    #[error("Controller response is missing the acState field")]
    MissingAcState,
}

pub type Result<T> = std::result::Result<T, ControlError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetpointRequest {
    desired_temp: f32,
}

/// Acknowledgement for an AC toggle. The controller echoes the state it
/// switched to; an echo without it is reported, never guessed around.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcToggleAck {
    #[serde(default)]
    pub ac_state: Option<bool>,
}

pub struct ControlClient {
    http: reqwest::Client,
    base_url: String,
}

impl ControlClient {
    pub fn new(addr: &str) -> ControlClient {
        // reqwest::Client::new() cannot fail, so fall back to it if the
        // builder does
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        ControlClient {
            http,
            base_url: format!("http://{}", addr),
        }
    }

    /// POST /desiredTemp. The controller echoes a JSON body on success; the
    /// push channel, not this echo, is the canonical confirmation path.
    pub async fn send_desired_temp(&self, setpoint: Setpoint) -> Result<serde_json::Value> {
        let response = self
            .http
            .post(format!("{}/desiredTemp", self.base_url))
            .json(&SetpointRequest {
                desired_temp: setpoint.value(),
            })
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    /// POST /acToggle with an empty body.
    pub async fn toggle_ac(&self) -> Result<AcToggleAck> {
        let response = self
            .http
            .post(format!("{}/acToggle", self.base_url))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    /// GET /data: the controller serves the push-frame shape on demand.
    pub async fn fetch_data(&self) -> Result<Snapshot> {
        let response = self
            .http
            .get(format!("{}/data", self.base_url))
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(ControlError::Rejected {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("unknown"),
            body: response.text().await.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setpoint_request_body_shape() {
        let body = serde_json::to_value(SetpointRequest { desired_temp: 23.0 }).unwrap();
        assert_eq!(body, serde_json::json!({ "desiredTemp": 23.0 }));
    }

    #[test]
    fn toggle_ack_with_state() {
        let ack: AcToggleAck = serde_json::from_str(r#"{"acState":true}"#).unwrap();
        assert_eq!(ack.ac_state, Some(true));
    }

    #[test]
    fn toggle_ack_without_state() {
        let ack: AcToggleAck = serde_json::from_str("{}").unwrap();
        assert_eq!(ack.ac_state, None);
    }

    #[test]
    fn unreachable_controller_reports_request_error() {
        // nothing listens on the discard port
        let client = ControlClient::new("127.0.0.1:9");
        let err = tokio_test::block_on(client.toggle_ac()).unwrap_err();
        assert!(matches!(err, ControlError::Request(_)));
    }

    #[test]
    fn rejection_reports_status_and_body() {
        let err = ControlError::Rejected {
            status: 400,
            reason: "Bad Request",
            body: r#"{"error":"Temperature out of range"}"#.to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("400"));
        assert!(message.contains("Bad Request"));
        assert!(message.contains("Temperature out of range"));
    }
}
