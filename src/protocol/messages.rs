use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ProtocolError;

/// Message sent by the client: `{"type": "...", "data": ...}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
}

impl InboundMessage {
    /// Parse a text frame
    ///
    /// Invalid JSON and a JSON value without both `type` and `data` are
    /// reported separately, the client sees a different error text for each.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text).map_err(|_| ProtocolError::Unparseable)?;

        let has_fields = value
            .as_object()
            .map(|obj| obj.contains_key("type") && obj.contains_key("data"))
            .unwrap_or(false);
        if !has_fields {
            return Err(ProtocolError::MalformedMessage);
        }

        serde_json::from_value(value).map_err(|_| ProtocolError::MalformedMessage)
    }
}

/// Outbound message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundKind {
    Acknowledge,
    End,
    Error,
    Start,
    Audio,
}

/// Message sent to the client: `{"type": "...", "data": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub kind: OutboundKind,
    pub data: Value,
}

impl OutboundMessage {
    pub fn new(kind: OutboundKind, data: impl Into<Value>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    pub fn acknowledge(message: impl Into<String>) -> Self {
        Self::new(OutboundKind::Acknowledge, message.into())
    }

    pub fn end(message: impl Into<String>) -> Self {
        Self::new(OutboundKind::End, message.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(OutboundKind::Error, message.into())
    }

    pub fn start(questions: &[String]) -> Self {
        Self::new(OutboundKind::Start, questions.to_vec())
    }

    pub fn audio(wav: &[u8]) -> Self {
        Self::new(
            OutboundKind::Audio,
            base64::engine::general_purpose::STANDARD.encode(wav),
        )
    }

    pub fn to_json(&self) -> String {
        // Serializing a string tag and a JSON value cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Decode the `data` of a `video` message into raw bytes
///
/// Accepted forms:
/// - array of byte values: `[0, 255, 17]`
/// - Node `Buffer` JSON: `{"type": "Buffer", "data": [0, 255, 17]}`
/// - string: its UTF-8 bytes, as they were sent
pub fn decode_video_payload(data: &Value) -> Result<Bytes, ProtocolError> {
    match data {
        Value::Array(items) => byte_array(items),
        Value::Object(obj) if obj.get("type").and_then(Value::as_str) == Some("Buffer") => {
            match obj.get("data") {
                Some(Value::Array(items)) => byte_array(items),
                _ => Err(ProtocolError::InvalidPayload),
            }
        }
        Value::String(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
        _ => Err(ProtocolError::InvalidPayload),
    }
}

fn byte_array(items: &[Value]) -> Result<Bytes, ProtocolError> {
    items
        .iter()
        .map(|item| {
            item.as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or(ProtocolError::InvalidPayload)
        })
        .collect::<Result<Vec<u8>, _>>()
        .map(Bytes::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid_message() {
        let msg = InboundMessage::parse(r#"{"type": "end", "data": null}"#).unwrap();
        assert_eq!(msg.kind, "end");
        assert_eq!(msg.data, Value::Null);
    }

    #[test]
    fn test_parse_rejects_bad_json() {
        assert_eq!(
            InboundMessage::parse("{not json").unwrap_err(),
            ProtocolError::Unparseable
        );
    }

    #[test]
    fn test_parse_requires_type_and_data() {
        for text in [r#"{"type": "video"}"#, r#"{"data": []}"#, "[1, 2]", r#""video""#] {
            assert_eq!(
                InboundMessage::parse(text).unwrap_err(),
                ProtocolError::MalformedMessage,
                "input: {}",
                text
            );
        }
    }

    #[test]
    fn test_parse_rejects_non_string_type() {
        assert_eq!(
            InboundMessage::parse(r#"{"type": 3, "data": []}"#).unwrap_err(),
            ProtocolError::MalformedMessage
        );
    }

    #[test]
    fn test_outbound_serialization() {
        let json = OutboundMessage::acknowledge("Video chunk received").to_json();
        assert_eq!(json, r#"{"type":"acknowledge","data":"Video chunk received"}"#);

        let start = OutboundMessage::start(&["q1".to_string(), "q2".to_string()]);
        assert_eq!(start.to_json(), r#"{"type":"start","data":["q1","q2"]}"#);
    }

    #[test]
    fn test_decode_video_payload_forms() {
        let expected = Bytes::from_static(&[0, 1, 255]);

        assert_eq!(decode_video_payload(&json!([0, 1, 255])).unwrap(), expected);
        assert_eq!(
            decode_video_payload(&json!({"type": "Buffer", "data": [0, 1, 255]})).unwrap(),
            expected
        );

        // Strings are stored byte for byte, not decoded
        assert_eq!(
            decode_video_payload(&json!("hello world")).unwrap(),
            Bytes::from_static(b"hello world")
        );
        assert_eq!(decode_video_payload(&json!("abcd")).unwrap().len(), 4);
        assert_eq!(
            decode_video_payload(&json!("h\u{e9}")).unwrap(),
            Bytes::from_static("hé".as_bytes())
        );
    }

    #[test]
    fn test_decode_video_payload_rejects_garbage() {
        assert!(decode_video_payload(&json!([256])).is_err());
        assert!(decode_video_payload(&json!([-1])).is_err());
        assert!(decode_video_payload(&json!(["a"])).is_err());
        assert!(decode_video_payload(&json!({"data": [1]})).is_err());
        assert!(decode_video_payload(&json!(42)).is_err());
    }
}
