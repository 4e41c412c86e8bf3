use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Outgoing command envelope. The transaction id is assigned by the
/// connection right before the request hits the wire.
#[derive(Debug, Serialize)]
pub struct Request {
    #[serde(rename = "type")]
    kind: &'static str,
    pub cmd: &'static str,
    pub(crate) trans_id: String,
    pub data: Value,
}

impl Request {
    pub fn new(cmd: &'static str, data: Value) -> Request {
        Request {
            kind: "request",
            cmd,
            trans_id: String::new(),
            data,
        }
    }
}

/// Incoming message, classified by the `type` field. A message is either a
/// success payload or an error payload, never both. Anything else coming
/// from the server is skipped by the connection.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum Envelope {
    Response(ResponseBody),
    Error(ErrorResponse),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct ResponseBody {
    pub cmd: String,
    #[serde(default)]
    pub trans_id: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl ResponseBody {
    /// Extracts one named field from the `data` payload.
    pub fn field<T: DeserializeOwned>(&self, name: &'static str) -> Result<T> {
        let value = self
            .data
            .get(name)
            .ok_or(Error::MissingField(name))?
            .clone();
        Ok(serde_json::from_value(value)?)
    }

    /// Deserializes the whole `data` payload.
    pub fn parse<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.data)?)
    }
}

/// Full body of an error message, kept for caller inspection.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub cmd: Option<String>,
    #[serde(default)]
    pub trans_id: Option<String>,
    #[serde(default)]
    pub errorcode: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.cmd, &self.errorcode) {
            (Some(cmd), Some(code)) => write!(f, "{cmd} failed with {code}"),
            (None, Some(code)) => write!(f, "{code}"),
            (Some(cmd), None) => write!(f, "{cmd} failed"),
            (None, None) => write!(f, "unspecified error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, to_value};

    use super::*;

    #[test]
    fn test_request_envelope() {
        let request = Request::new("arc_commit", json!({ "device_id": "A1" }));

        let serialized = to_value(request).unwrap();
        assert_eq!(
            serialized,
            json!({
                "type": "request",
                "cmd": "arc_commit",
                "trans_id": "",
                "data": { "device_id": "A1" },
            })
        );
    }

    #[test]
    fn test_classify_response() {
        let envelope: Envelope = serde_json::from_value(json!({
            "type": "response",
            "cmd": "arc_get_main",
            "trans_id": "7",
            "data": { "value": true },
        }))
        .unwrap();

        match envelope {
            Envelope::Response(body) => {
                assert_eq!(body.cmd, "arc_get_main");
                assert_eq!(body.trans_id.as_deref(), Some("7"));
                assert!(body.field::<bool>("value").unwrap());
            }
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_error() {
        let envelope: Envelope = serde_json::from_value(json!({
            "type": "error",
            "cmd": "arc_set_main",
            "errorcode": "device_not_connected",
        }))
        .unwrap();

        match envelope {
            Envelope::Error(body) => {
                assert_eq!(body.errorcode.as_deref(), Some("device_not_connected"));
                assert_eq!(body.to_string(), "arc_set_main failed with device_not_connected");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_unknown() {
        let envelope: Envelope = serde_json::from_value(json!({
            "type": "information",
            "info": "otii server 3.5.4",
        }))
        .unwrap();

        assert!(matches!(envelope, Envelope::Unknown));
    }

    #[test]
    fn test_missing_field() {
        let body = ResponseBody {
            cmd: "arc_get_main".to_string(),
            trans_id: None,
            data: json!({}),
        };

        match body.field::<bool>("value") {
            Err(Error::MissingField("value")) => {}
            other => panic!("expected missing field, got {other:?}"),
        }
    }
}
