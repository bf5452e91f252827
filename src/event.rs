//! Event wire codec.
//!
//! Wire form is an ASCII text line, fields separated by `|`:
//! `sequence "|" type ( "|" senderId ( "|" recipientId ( "|" tail )? )? )?`
//!
//! Parsing and serialization are kept deliberately permissive to match the
//! upstream event source: extra trailing fields parse successfully but are
//! dropped on serialize, so round-trip only holds for inputs with four
//! fields or fewer.

use std::cmp::Ordering;
use std::fmt;
use std::num::ParseIntError;

const FIELD_DELIMITER: char = '|';

/// A single, immutable event ordered by [`Event::sequence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    sequence: u64,
    event_type: String,
    sender_id: Option<String>,
    recipient_id: Option<String>,
}

impl Event {
    /// Build an event directly, bypassing the wire codec. Useful for tests
    /// and for the emulator-style callers that construct events in memory.
    pub fn new(
        sequence: u64,
        event_type: impl Into<String>,
        sender_id: Option<String>,
        recipient_id: Option<String>,
    ) -> Self {
        Event {
            sequence,
            event_type: event_type.into(),
            sender_id,
            recipient_id,
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn sender_id(&self) -> &str {
        self.sender_id.as_deref().unwrap_or("")
    }

    pub fn recipient_id(&self) -> &str {
        self.recipient_id.as_deref().unwrap_or("")
    }

    /// Parse a single `\n`-stripped line in `sequence|type|sender|recipient`
    /// form. Fields beyond the fourth are accepted and ignored.
    pub fn parse(line: &str) -> Result<Event, EventParseError> {
        let mut parts = line.split(FIELD_DELIMITER);

        let sequence_str = parts.next().ok_or(EventParseError::Incomplete)?;
        let event_type = parts.next().ok_or(EventParseError::Incomplete)?;

        let sequence = sequence_str
            .parse::<u64>()
            .map_err(EventParseError::InvalidSequence)?;

        let sender_id = parts.next().map(str::to_owned).filter(|s| !s.is_empty());
        let recipient_id = parts.next().map(str::to_owned).filter(|s| !s.is_empty());
        // Any further fields are ignored on purpose; see module docs.

        Ok(Event {
            sequence,
            event_type: event_type.to_owned(),
            sender_id,
            recipient_id,
        })
    }

    /// Render back to wire form, without the trailing `\n`.
    pub fn serialize(&self) -> String {
        let mut parts = vec![self.sequence.to_string(), self.event_type.clone()];

        if let Some(sender_id) = &self.sender_id {
            parts.push(sender_id.clone());
        }

        if let Some(recipient_id) = &self.recipient_id {
            parts.push(recipient_id.clone());
        }

        parts.join(&FIELD_DELIMITER.to_string())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.serialize())
    }
}

/// Events order by [`Event::sequence`] alone.
impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence.cmp(&other.sequence)
    }
}

/// Errors raised while parsing a wire-form event line.
#[derive(Debug)]
pub enum EventParseError {
    /// Fewer than the required sequence + type fields were present.
    Incomplete,
    /// The sequence field was not a base-10 integer.
    InvalidSequence(ParseIntError),
}

impl fmt::Display for EventParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventParseError::Incomplete => {
                write!(f, "event is incomplete, expected at least sequence and type")
            }
            EventParseError::InvalidSequence(e) => write!(f, "invalid sequence: {}", e),
        }
    }
}

impl std::error::Error for EventParseError {}
