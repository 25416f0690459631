//! Alesis V49 SysEx framing
//!
//! Message structure:
//!   F0 [maker id 00 00 0E] [header 00 42] [command] [trailer 00 5D] [payload?] F7
//!
//! Everything here is pure and synchronous; the codec owns payload layout.

use crate::error::ProtocolError;
use crate::model::PAYLOAD_LEN;

pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;

pub const MAKER_ID: [u8; 3] = [0x00, 0x00, 0x0E];
pub const PRODUCT_HEADER: [u8; 2] = [0x00, 0x42];
pub const TRAILER: [u8; 2] = [0x00, 0x5D];

pub const CMD_SET: u8 = 0x61;
pub const CMD_QUERY: u8 = 0x62;
pub const CMD_REPLY: u8 = 0x63;

/// Start marker, identity, command and trailer
pub const HEADER_LEN: usize = 9;

/// Smallest possible envelope (header plus end marker)
pub const ENVELOPE_MIN_LEN: usize = HEADER_LEN + 1;

pub const QUERY_LEN: usize = ENVELOPE_MIN_LEN;
pub const SET_LEN: usize = ENVELOPE_MIN_LEN + PAYLOAD_LEN;

/// Command byte of a vendor envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Set,
    Query,
    Reply,
}

impl Command {
    pub fn as_byte(self) -> u8 {
        match self {
            Command::Set => CMD_SET,
            Command::Query => CMD_QUERY,
            Command::Reply => CMD_REPLY,
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            CMD_SET => Ok(Command::Set),
            CMD_QUERY => Ok(Command::Query),
            CMD_REPLY => Ok(Command::Reply),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }
}

/// A recognized envelope split into command and payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub command: Command,
    pub payload: &'a [u8],
}

fn header(command: Command) -> Vec<u8> {
    let mut frame = Vec::with_capacity(SET_LEN);
    frame.push(SYSEX_START);
    frame.extend_from_slice(&MAKER_ID);
    frame.extend_from_slice(&PRODUCT_HEADER);
    frame.push(command.as_byte());
    frame.extend_from_slice(&TRAILER);
    frame
}

/// Build the configuration query: `F0 00 00 0E 00 42 62 00 5D F7`
pub fn build_query() -> Vec<u8> {
    let mut frame = header(Command::Query);
    frame.push(SYSEX_END);
    frame
}

/// Build a SET frame carrying a full configuration payload
///
/// Fails fast when the payload is not exactly [`PAYLOAD_LEN`] bytes, since
/// the device would otherwise receive a malformed message.
pub fn build_set(payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if payload.len() != PAYLOAD_LEN {
        return Err(ProtocolError::PayloadLength {
            expected: PAYLOAD_LEN,
            actual: payload.len(),
        });
    }
    Ok(build_set_unchecked(payload))
}

/// Frame any payload as a SET message without checking its length
pub fn build_set_unchecked(payload: &[u8]) -> Vec<u8> {
    let mut frame = header(Command::Set);
    frame.extend_from_slice(payload);
    frame.push(SYSEX_END);
    frame
}

/// True for any SysEx-bounded buffer
pub fn is_frame(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == SYSEX_START && data[data.len() - 1] == SYSEX_END
}

/// True when the buffer carries the Alesis maker id and V49 product header
pub fn is_vendor_envelope(data: &[u8]) -> bool {
    data.len() >= ENVELOPE_MIN_LEN
        && data[1..4] == MAKER_ID
        && data[4..6] == PRODUCT_HEADER
}

pub fn extract_command(data: &[u8]) -> Result<u8, ProtocolError> {
    if !is_vendor_envelope(data) {
        return Err(ProtocolError::NotVendorEnvelope);
    }
    Ok(data[6])
}

/// Payload region of a QUERY or REPLY envelope
///
/// QUERY carries no payload. REPLY payload is everything between the
/// 9-byte header and the end marker.
pub fn extract_payload(data: &[u8]) -> Result<&[u8], ProtocolError> {
    match extract_command(data)? {
        CMD_QUERY => Ok(&[]),
        CMD_REPLY => Ok(&data[HEADER_LEN..data.len() - 1]),
        other => Err(ProtocolError::UnknownCommand(other)),
    }
}

/// Recognize a complete envelope in one pass
///
/// SET envelopes (our own messages echoed back by some interfaces) are
/// returned with their payload too.
pub fn parse_envelope(data: &[u8]) -> Result<Envelope<'_>, ProtocolError> {
    if !is_frame(data) {
        return Err(ProtocolError::NotVendorEnvelope);
    }
    let command = Command::try_from(extract_command(data)?)?;
    let payload = match command {
        Command::Set => &data[HEADER_LEN..data.len() - 1],
        Command::Query | Command::Reply => extract_payload(data)?,
    };
    Ok(Envelope { command, payload })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply_with(payload: &[u8]) -> Vec<u8> {
        let mut frame = header(Command::Reply);
        frame.extend_from_slice(payload);
        frame.push(SYSEX_END);
        frame
    }

    #[test]
    fn test_query_bytes() {
        assert_eq!(
            build_query(),
            vec![0xF0, 0x00, 0x00, 0x0E, 0x00, 0x42, 0x62, 0x00, 0x5D, 0xF7]
        );
        assert_eq!(build_query().len(), QUERY_LEN);
    }

    #[test]
    fn test_set_frame_layout() {
        let payload = [0x11u8; PAYLOAD_LEN];
        let frame = build_set(&payload).unwrap();

        assert_eq!(frame.len(), 103);
        assert_eq!(&frame[..9], &[0xF0, 0x00, 0x00, 0x0E, 0x00, 0x42, 0x61, 0x00, 0x5D]);
        assert_eq!(&frame[9..102], &payload[..]);
        assert_eq!(frame[102], SYSEX_END);
    }

    #[test]
    fn test_set_rejects_wrong_payload_length() {
        assert_eq!(
            build_set(&[0u8; 92]),
            Err(ProtocolError::PayloadLength { expected: 93, actual: 92 })
        );
        assert!(build_set(&[]).is_err());
    }

    #[test]
    fn test_unchecked_set_frames_anything() {
        // Permissive framing yields a frame the device would misread
        let frame = build_set_unchecked(&[1, 2, 3]);
        assert_eq!(frame.len(), 13);
        assert!(is_frame(&frame));
        assert!(is_vendor_envelope(&frame));
    }

    #[test]
    fn test_is_frame() {
        assert!(is_frame(&[0xF0, 0xF7]));
        assert!(!is_frame(&[0xF0]));
        assert!(!is_frame(&[]));
        assert!(!is_frame(&[0x90, 60, 100]));
        assert!(!is_frame(&[0xF0, 0x00, 0x00]));
    }

    #[test]
    fn test_short_buffers_are_not_envelopes() {
        let query = build_query();
        for len in 0..ENVELOPE_MIN_LEN {
            assert!(!is_vendor_envelope(&query[..len]), "len {}", len);
        }
        assert!(is_vendor_envelope(&query));
    }

    #[test]
    fn test_foreign_identity_is_not_envelope() {
        let mut other_maker = build_query();
        other_maker[3] = 0x66;
        assert!(is_frame(&other_maker));
        assert!(!is_vendor_envelope(&other_maker));

        let mut other_product = build_query();
        other_product[5] = 0x41;
        assert!(!is_vendor_envelope(&other_product));
    }

    #[test]
    fn test_extract_command() {
        assert_eq!(extract_command(&build_query()), Ok(CMD_QUERY));
        assert_eq!(
            extract_command(&[0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7]),
            Err(ProtocolError::NotVendorEnvelope)
        );
    }

    #[test]
    fn test_query_payload_is_empty() {
        assert_eq!(extract_payload(&build_query()), Ok(&[][..]));
    }

    #[test]
    fn test_reply_payload_bounds() {
        let payload: Vec<u8> = (0..PAYLOAD_LEN as u8).collect();
        let frame = reply_with(&payload);
        let len = frame.len();

        let extracted = extract_payload(&frame).unwrap();
        assert_eq!(extracted.len(), len - 10);
        assert_eq!(extracted, &frame[9..=len - 2]);
        assert_eq!(extracted, &payload[..]);
    }

    #[test]
    fn test_set_payload_is_unknown_for_extract() {
        let frame = build_set(&[0u8; PAYLOAD_LEN]).unwrap();
        assert_eq!(
            extract_payload(&frame),
            Err(ProtocolError::UnknownCommand(CMD_SET))
        );
    }

    #[test]
    fn test_parse_envelope() {
        let frame = reply_with(&[5u8; PAYLOAD_LEN]);
        let envelope = parse_envelope(&frame).unwrap();
        assert_eq!(envelope.command, Command::Reply);
        assert_eq!(envelope.payload.len(), PAYLOAD_LEN);

        let set = build_set(&[7u8; PAYLOAD_LEN]).unwrap();
        let envelope = parse_envelope(&set).unwrap();
        assert_eq!(envelope.command, Command::Set);
        assert_eq!(envelope.payload, &[7u8; PAYLOAD_LEN][..]);

        let mut bogus = build_query();
        bogus[6] = 0x10;
        assert_eq!(parse_envelope(&bogus), Err(ProtocolError::UnknownCommand(0x10)));
        assert_eq!(
            parse_envelope(&[0x90, 60, 100]),
            Err(ProtocolError::NotVendorEnvelope)
        );
    }

    #[test]
    fn test_command_round_trip() {
        for cmd in [Command::Set, Command::Query, Command::Reply] {
            assert_eq!(Command::try_from(cmd.as_byte()), Ok(cmd));
        }
    }
}
