//! Datagram codec for the command link
//!
//! Each datagram carries exactly one message, so there is no framing:
//! ```text
//! outbound: [ ASCII command line ]          e.g. "flip f"
//! inbound:  [ UTF-8 reply text ]            e.g. "ok", "error Motor stop"
//! ```

use bytes::Bytes;
use thiserror::Error;

use crate::command::Command;
use crate::error::CommandError;
use crate::protocol::{MAX_DATAGRAM_SIZE, REPLY_ERROR_PREFIX, REPLY_OK};

/// Errors that can occur while decoding a reply datagram
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Empty reply datagram")]
    Empty,

    #[error("Reply too large: {0} bytes (max: {MAX_DATAGRAM_SIZE})")]
    TooLarge(usize),

    #[error("Reply is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

impl From<CodecError> for CommandError {
    fn from(err: CodecError) -> Self {
        CommandError::Decode(err.to_string())
    }
}

/// Encode a command into the payload of a single datagram
pub fn encode(command: &Command) -> Bytes {
    Bytes::from(command.encode())
}

/// Decode a reply datagram into its text
pub fn decode_reply(payload: &[u8]) -> Result<String, CodecError> {
    if payload.is_empty() {
        return Err(CodecError::Empty);
    }
    if payload.len() > MAX_DATAGRAM_SIZE {
        return Err(CodecError::TooLarge(payload.len()));
    }

    let text = std::str::from_utf8(payload)?;
    Ok(text.to_string())
}

/// Meaning of a decoded reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Command accepted
    Ok,
    /// Command rejected or failed, with the drone's explanation (may be empty)
    Error(String),
    /// Any other text, such as the answer to a read command
    Value(String),
}

impl Reply {
    /// Classify reply text, ignoring surrounding whitespace and line endings
    pub fn classify(text: &str) -> Self {
        let text = text.trim();

        if text.eq_ignore_ascii_case(REPLY_OK) {
            return Reply::Ok;
        }

        match text.get(..REPLY_ERROR_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(REPLY_ERROR_PREFIX) => {
                Reply::Error(text[REPLY_ERROR_PREFIX.len()..].trim().to_string())
            }
            _ => Reply::Value(text.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Reply::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Direction;

    #[test]
    fn test_encode_payload() {
        assert_eq!(&encode(&Command::Left(100))[..], b"left 100");
        assert_eq!(&encode(&Command::Flip(Direction::Forward))[..], b"flip f");
    }

    #[test]
    fn test_decode_reply_text() {
        assert_eq!(decode_reply(b"ok").unwrap(), "ok");
        assert_eq!(decode_reply(b"error\r\n").unwrap(), "error\r\n");
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let result = decode_reply(&[0x6f, 0xff, 0xfe]);
        assert!(matches!(result, Err(CodecError::InvalidUtf8(_))));

        let err: CommandError = result.unwrap_err().into();
        assert!(matches!(err, CommandError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_empty() {
        assert_eq!(decode_reply(b""), Err(CodecError::Empty));
    }

    #[test]
    fn test_classify_replies() {
        assert_eq!(Reply::classify("ok"), Reply::Ok);
        assert_eq!(Reply::classify("OK\r\n"), Reply::Ok);
        assert_eq!(
            Reply::classify("error Motor stop"),
            Reply::Error("Motor stop".into())
        );
        assert_eq!(Reply::classify("error"), Reply::Error(String::new()));
        assert_eq!(Reply::classify("87\r\n"), Reply::Value("87".into()));
        assert!(!Reply::classify("er").is_ok());
    }
}
