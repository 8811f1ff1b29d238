//! Text-frame codec for the Taboo protocol.
//!
//! [`encode`] attaches the discriminant and serializes; it never checks game
//! rules. [`decode`] classifies failures so the caller can log a precise
//! diagnostic before dropping the frame.

use serde_json::Value;

use crate::error::{Result, TabooError};
use crate::protocol::{ClientMessage, ServerMessage};

/// Serialize an outgoing message to its JSON text frame.
///
/// # Errors
///
/// Returns [`TabooError::Serialization`] if serialization fails.
pub fn encode(message: &ClientMessage) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// Parse an inbound JSON text frame into a typed [`ServerMessage`].
///
/// # Errors
///
/// - [`TabooError::Serialization`] if the text is not JSON or the fields do
///   not match the declared kind
/// - [`TabooError::MissingMessageType`] if there is no string `type` field
/// - [`TabooError::UnknownMessageType`] if the kind is outside the vocabulary
pub fn decode(text: &str) -> Result<ServerMessage> {
    let value: Value = serde_json::from_str(text)?;
    let kind = match value.get("type").and_then(Value::as_str) {
        Some(kind) => kind.to_owned(),
        None => return Err(TabooError::MissingMessageType),
    };

    serde_json::from_value(value).map_err(|e| {
        if e.to_string().starts_with("unknown variant") {
            TabooError::UnknownMessageType(kind)
        } else {
            TabooError::Serialization(e)
        }
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::Team;

    #[test]
    fn encode_attaches_discriminant_and_camel_case_fields() {
        let json = encode(&ClientMessage::ChangeTeam {
            player_id: "p1".into(),
            team: Team::Blue,
        })
        .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "change_team");
        assert_eq!(value["playerId"], "p1");
        assert_eq!(value["team"], 1);
    }

    #[test]
    fn decode_accepts_known_frame() {
        let msg = decode(r#"{"type":"player_left","playerId":"p7"}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::PlayerLeft {
                player_id: "p7".into()
            }
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode("{not json"),
            Err(TabooError::Serialization(_))
        ));
    }

    #[test]
    fn decode_rejects_missing_type() {
        assert!(matches!(
            decode(r#"{"playerId":"p1"}"#),
            Err(TabooError::MissingMessageType)
        ));
        assert!(matches!(
            decode(r#"{"type":42}"#),
            Err(TabooError::MissingMessageType)
        ));
    }

    #[test]
    fn decode_reports_unknown_type() {
        let err = decode(r#"{"type":"teleport","playerId":"p1"}"#).unwrap_err();
        match err {
            TabooError::UnknownMessageType(kind) => assert_eq!(kind, "teleport"),
            other => panic!("expected UnknownMessageType, got {other:?}"),
        }
    }

    #[test]
    fn decode_reports_shape_errors_for_known_type() {
        let err = decode(r#"{"type":"team_changed","playerId":"p1","team":7}"#).unwrap_err();
        assert!(matches!(err, TabooError::Serialization(_)));
    }
}
