//! Inbound message decoding and length-prefixed framing.
//!
//! Messages arrive either as a bare token string (`"c10"`) or as a
//! structured object `{"button": 0, "type": 1, "buttonsDown": 1}`. Frames
//! carry a 4-byte native-endian length followed by that many bytes of JSON.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use crate::events::{Button, DecodeError, PrimitiveEvent};

/// Upper bound on a single inbound frame.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum InboundMessage {
    Token(String),
    Structured(StructuredEvent),
}

/// Structured form: `type` 1 = down, 2 = up, 3 = wheel up, 4 = wheel down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct StructuredEvent {
    pub button: u8,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(rename = "buttonsDown", default)]
    pub buttons_down: u8,
}

impl InboundMessage {
    pub fn from_json(bytes: &[u8]) -> Result<Self, DecodeError> {
        serde_json::from_slice(bytes)
            .map_err(|_| DecodeError::MalformedToken(String::from_utf8_lossy(bytes).into_owned()))
    }

    pub fn into_primitive(self) -> Result<PrimitiveEvent, DecodeError> {
        match self {
            InboundMessage::Token(token) => PrimitiveEvent::decode(&token),
            InboundMessage::Structured(event) => event.into_primitive(),
        }
    }
}

impl StructuredEvent {
    pub fn into_primitive(self) -> Result<PrimitiveEvent, DecodeError> {
        let malformed = || DecodeError::MalformedToken(format!("{:?}", self));
        let button = || {
            char::from_digit(u32::from(self.button), 10)
                .and_then(Button::from_code)
                .ok_or_else(malformed)
        };

        match self.kind {
            1 => Ok(PrimitiveEvent::ButtonDown(button()?)),
            2 => Ok(PrimitiveEvent::ButtonUp(button()?)),
            3 => Ok(PrimitiveEvent::ScrollUp),
            4 => Ok(PrimitiveEvent::ScrollDown),
            // Long presses are synthesized locally, never accepted from the wire.
            _ => Err(malformed()),
        }
    }
}

/// Reads one frame. Returns `Ok(None)` on a clean end of stream.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; 4];
    let mut filled = 0;
    while filled < len_bytes.len() {
        match reader.read(&mut len_bytes[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    let len = u32::from_ne_bytes(len_bytes) as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", len),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}

pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len as usize <= MAX_FRAME_LEN)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "frame too large"))?;
    writer.write_all(&len.to_ne_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_token_message() {
        let msg = InboundMessage::from_json(br#""c12""#).unwrap();
        assert_eq!(msg, InboundMessage::Token("c12".into()));
        assert_eq!(
            msg.into_primitive().unwrap(),
            PrimitiveEvent::ButtonDown(Button::Secondary)
        );
    }

    #[test]
    fn test_structured_message() {
        let msg = InboundMessage::from_json(br#"{"button":1,"type":2,"buttonsDown":0}"#).unwrap();
        assert_eq!(
            msg.into_primitive().unwrap(),
            PrimitiveEvent::ButtonUp(Button::Middle)
        );

        let wheel = InboundMessage::from_json(br#"{"button":0,"type":4}"#).unwrap();
        assert_eq!(wheel.into_primitive().unwrap(), PrimitiveEvent::ScrollDown);
    }

    #[test]
    fn test_rejects_long_press_and_unknown_kinds() {
        for json in [
            r#"{"button":0,"type":5}"#,
            r#"{"button":0,"type":0}"#,
            r#"{"button":7,"type":1}"#,
        ] {
            let msg = InboundMessage::from_json(json.as_bytes()).unwrap();
            assert!(msg.into_primitive().is_err(), "{}", json);
        }
        assert!(InboundMessage::from_json(b"{not json").is_err());
        assert!(InboundMessage::from_json(br#""c20""#).unwrap().into_primitive().is_err());
    }

    #[test]
    fn test_frames_back_to_back() {
        let mut buf = Vec::new();
        write_frame(&mut buf, br#""c10""#).unwrap();
        write_frame(&mut buf, br#""s1""#).unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_frame(&mut cursor).unwrap().unwrap(), br#""c10""#);
        assert_eq!(read_frame(&mut cursor).unwrap().unwrap(), br#""s1""#);
        assert!(read_frame(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_truncated_and_oversized_frames() {
        let mut cursor = Cursor::new(vec![5, 0]);
        assert!(read_frame(&mut cursor).is_err());

        let mut buf = Vec::new();
        buf.extend_from_slice(&8u32.to_ne_bytes());
        buf.extend_from_slice(b"abc");
        assert!(read_frame(&mut Cursor::new(buf)).is_err());

        let huge = ((MAX_FRAME_LEN + 1) as u32).to_ne_bytes();
        let err = read_frame(&mut Cursor::new(huge.to_vec())).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
