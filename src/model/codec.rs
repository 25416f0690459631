//! Fixed-layout configuration codec
//!
//! Offset | Size | Component
//! -------|------|----------
//! 0      | 4    | Keys (base_note, octave, channel, velocity_curve)
//! 4      | 1    | PitchWheel (channel)
//! 5      | 4    | ModWheel (channel, cc, min, max)
//! 9      | 4    | Sustain (cc, min, max, channel)
//! 13     | 20   | Knobs (4 × 5 bytes: mode, cc, min, max, channel)
//! 33     | 40   | Pads (8 × 5 bytes: mode, note_or_cc, fixed_or_min, velocity_or_max, channel)
//! 73     | 20   | Buttons (4 × 5 bytes: mode, cc, on, off, channel)
//! Total: 93 bytes

use std::array;

use super::types::*;
use crate::error::CodecError;

pub const PAYLOAD_LEN: usize = 93;

pub const MAX_VALUE: u8 = 127;
pub const MAX_CHANNEL: u8 = 15;

/// Sequential reader that validates each byte as it is consumed
struct Reader<'a> {
    payload: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(payload: &'a [u8]) -> Self {
        Self { payload, offset: 0 }
    }

    fn raw(&mut self) -> u8 {
        let byte = self.payload[self.offset];
        self.offset += 1;
        byte
    }

    fn bounded(&mut self, field: &str, max: u8) -> Result<u8, CodecError> {
        let value = self.raw();
        if value > max {
            return Err(CodecError::OutOfRange {
                field: field.to_string(),
                value,
            });
        }
        Ok(value)
    }

    fn value(&mut self, field: &str) -> Result<u8, CodecError> {
        self.bounded(field, MAX_VALUE)
    }

    fn channel(&mut self, field: &str) -> Result<u8, CodecError> {
        self.bounded(field, MAX_CHANNEL)
    }

    fn mode<M: ModeByte>(&mut self, field: &str) -> Result<M, CodecError> {
        let value = self.raw();
        M::from_byte(value).ok_or_else(|| CodecError::InvalidMode {
            field: field.to_string(),
            value,
        })
    }
}

fn decode_knob(r: &mut Reader<'_>, n: usize) -> Result<KnobConfig, CodecError> {
    Ok(KnobConfig {
        mode: r.mode(&format!("knob{n}.mode"))?,
        cc: r.value(&format!("knob{n}.cc"))?,
        min: r.value(&format!("knob{n}.min"))?,
        max: r.value(&format!("knob{n}.max"))?,
        channel: r.channel(&format!("knob{n}.channel"))?,
    })
}

fn decode_pad(r: &mut Reader<'_>, n: usize) -> Result<PadConfig, CodecError> {
    Ok(PadConfig {
        mode: r.mode(&format!("pad{n}.mode"))?,
        note_or_cc: r.value(&format!("pad{n}.note_or_cc"))?,
        fixed_or_min: r.value(&format!("pad{n}.fixed_or_min"))?,
        velocity_or_max: r.value(&format!("pad{n}.velocity_or_max"))?,
        channel: r.channel(&format!("pad{n}.channel"))?,
    })
}

fn decode_button(r: &mut Reader<'_>, n: usize) -> Result<ButtonConfig, CodecError> {
    Ok(ButtonConfig {
        mode: r.mode(&format!("button{n}.mode"))?,
        cc: r.value(&format!("button{n}.cc"))?,
        on: r.value(&format!("button{n}.on"))?,
        off: r.value(&format!("button{n}.off"))?,
        channel: r.channel(&format!("button{n}.channel"))?,
    })
}

/// Build a fixed-size array, stopping at the first failing element
fn decode_array<T: Copy + Default, const N: usize>(
    r: &mut Reader<'_>,
    decode_one: fn(&mut Reader<'_>, usize) -> Result<T, CodecError>,
) -> Result<[T; N], CodecError> {
    let mut items = [T::default(); N];
    for (i, item) in items.iter_mut().enumerate() {
        *item = decode_one(r, i + 1)?;
    }
    Ok(items)
}

/// Decode a 93-byte REPLY payload
pub fn decode(payload: &[u8]) -> Result<Configuration, CodecError> {
    if payload.len() != PAYLOAD_LEN {
        return Err(CodecError::WrongLength {
            expected: PAYLOAD_LEN,
            actual: payload.len(),
        });
    }

    let mut r = Reader::new(payload);

    let keys = KeysConfig {
        base_note: r.value("keys.base_note")?,
        octave: r.raw(),
        channel: r.channel("keys.channel")?,
        velocity_curve: r.raw(),
    };

    let pitch_wheel = PitchWheelConfig {
        channel: r.channel("pitch_wheel.channel")?,
    };

    let mod_wheel = ModWheelConfig {
        channel: r.channel("mod_wheel.channel")?,
        cc: r.value("mod_wheel.cc")?,
        min: r.value("mod_wheel.min")?,
        max: r.value("mod_wheel.max")?,
    };

    let sustain = SustainConfig {
        cc: r.value("sustain.cc")?,
        min: r.value("sustain.min")?,
        max: r.value("sustain.max")?,
        channel: r.channel("sustain.channel")?,
    };

    let knobs = decode_array(&mut r, decode_knob)?;
    let pads = decode_array(&mut r, decode_pad)?;
    let buttons = decode_array(&mut r, decode_button)?;

    debug_assert_eq!(r.offset, PAYLOAD_LEN);

    Ok(Configuration {
        keys,
        pitch_wheel,
        mod_wheel,
        sustain,
        knobs,
        pads,
        buttons,
    })
}

/// Encode a configuration into the 93-byte SET payload
pub fn encode(config: &Configuration) -> [u8; PAYLOAD_LEN] {
    let knobs = config
        .knobs
        .iter()
        .flat_map(|k| [k.mode.to_byte(), k.cc, k.min, k.max, k.channel]);
    let pads = config.pads.iter().flat_map(|p| {
        [
            p.mode.to_byte(),
            p.note_or_cc,
            p.fixed_or_min,
            p.velocity_or_max,
            p.channel,
        ]
    });
    let buttons = config
        .buttons
        .iter()
        .flat_map(|b| [b.mode.to_byte(), b.cc, b.on, b.off, b.channel]);

    let mut bytes = [
        config.keys.base_note,
        config.keys.octave,
        config.keys.channel,
        config.keys.velocity_curve,
        config.pitch_wheel.channel,
        config.mod_wheel.channel,
        config.mod_wheel.cc,
        config.mod_wheel.min,
        config.mod_wheel.max,
        config.sustain.cc,
        config.sustain.min,
        config.sustain.max,
        config.sustain.channel,
    ]
    .into_iter()
    .chain(knobs)
    .chain(pads)
    .chain(buttons);

    let payload: [u8; PAYLOAD_LEN] = array::from_fn(|_| bytes.next().unwrap_or_default());
    debug_assert!(bytes.next().is_none());
    payload
}

impl Configuration {
    /// Check every field against the wire range rules
    pub fn validate(&self) -> Result<(), CodecError> {
        decode(&encode(self)).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_config() -> Configuration {
        let mut config = Configuration::default();
        config.keys = KeysConfig {
            base_note: 36,
            octave: 0xFE,
            channel: 1,
            velocity_curve: 3,
        };
        config.pitch_wheel.channel = 2;
        config.mod_wheel = ModWheelConfig {
            channel: 3,
            cc: 1,
            min: 0,
            max: 127,
        };
        config.sustain = SustainConfig {
            cc: 64,
            min: 0,
            max: 127,
            channel: 4,
        };
        config.knobs[1] = KnobConfig {
            mode: KnobMode::Aftertouch,
            cc: 21,
            min: 5,
            max: 120,
            channel: 15,
        };
        config.pads[7] = PadConfig {
            mode: PadMode::MomentaryCc,
            note_or_cc: 44,
            fixed_or_min: 0,
            velocity_or_max: 127,
            channel: 9,
        };
        config.buttons[3] = ButtonConfig {
            mode: ButtonMode::Momentary,
            cc: 50,
            on: 127,
            off: 0,
            channel: 0,
        };
        config
    }

    #[test]
    fn test_zero_payload_decodes_to_default() {
        let config = decode(&[0u8; PAYLOAD_LEN]).unwrap();
        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn test_offsets() {
        let bytes = encode(&sample_config());

        assert_eq!(&bytes[0..4], &[36, 0xFE, 1, 3]);
        assert_eq!(bytes[4], 2);
        assert_eq!(&bytes[5..9], &[3, 1, 0, 127]);
        assert_eq!(&bytes[9..13], &[64, 0, 127, 4]);
        // Knob 2 starts at 13 + 5
        assert_eq!(&bytes[18..23], &[0x01, 21, 5, 120, 15]);
        // Pad 8 starts at 33 + 35
        assert_eq!(&bytes[68..73], &[0x02, 44, 0, 127, 9]);
        // Button 4 starts at 73 + 15
        assert_eq!(&bytes[88..93], &[0x01, 50, 127, 0, 0]);
    }

    #[test]
    fn test_round_trip_sample() {
        let config = sample_config();
        assert_eq!(decode(&encode(&config)).unwrap(), config);
    }

    #[test]
    fn test_wrong_length() {
        for len in [0usize, 1, 92, 94, 103] {
            let payload = vec![0u8; len];
            assert_eq!(
                decode(&payload),
                Err(CodecError::WrongLength {
                    expected: PAYLOAD_LEN,
                    actual: len
                })
            );
        }
    }

    #[test]
    fn test_out_of_range_value() {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[0] = 128;
        assert_eq!(
            decode(&payload),
            Err(CodecError::OutOfRange {
                field: "keys.base_note".to_string(),
                value: 128
            })
        );

        let mut payload = [0u8; PAYLOAD_LEN];
        payload[13 + 1] = 0xFF;
        assert_eq!(
            decode(&payload),
            Err(CodecError::OutOfRange {
                field: "knob1.cc".to_string(),
                value: 0xFF
            })
        );
    }

    #[test]
    fn test_out_of_range_channel() {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[33 + 5 * 2 + 4] = 16;
        assert_eq!(
            decode(&payload),
            Err(CodecError::OutOfRange {
                field: "pad3.channel".to_string(),
                value: 16
            })
        );
    }

    #[test]
    fn test_raw_fields_accept_any_byte() {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[1] = 0xFF;
        payload[3] = 0x80;
        let config = decode(&payload).unwrap();
        assert_eq!(config.keys.octave, 0xFF);
        assert_eq!(config.keys.velocity_curve, 0x80);
    }

    #[test]
    fn test_invalid_modes() {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[13] = 0x02;
        assert_eq!(
            decode(&payload),
            Err(CodecError::InvalidMode {
                field: "knob1.mode".to_string(),
                value: 0x02
            })
        );

        let mut payload = [0u8; PAYLOAD_LEN];
        payload[33] = 0x03;
        assert!(matches!(decode(&payload), Err(CodecError::InvalidMode { .. })));

        let mut payload = [0u8; PAYLOAD_LEN];
        payload[73 + 5] = 0x02;
        assert_eq!(
            decode(&payload),
            Err(CodecError::InvalidMode {
                field: "button2.mode".to_string(),
                value: 0x02
            })
        );
    }

    #[test]
    fn test_validate_flags_bad_edit() {
        let mut config = sample_config();
        assert_eq!(config.validate(), Ok(()));

        config.sustain.channel = 16;
        assert_eq!(
            config.validate(),
            Err(CodecError::OutOfRange {
                field: "sustain.channel".to_string(),
                value: 16
            })
        );
    }

    /// Byte strategy for one 5-byte control block with the given mode count
    fn block(modes: u8) -> impl Strategy<Value = Vec<u8>> {
        (0..modes, 0..=127u8, 0..=127u8, 0..=127u8, 0..=15u8)
            .prop_map(|(m, a, b, c, ch)| vec![m, a, b, c, ch])
    }

    /// Start of each 5-byte knob, pad and button block
    fn block_offsets() -> impl Iterator<Item = usize> {
        (0..KNOB_COUNT + PAD_COUNT + BUTTON_COUNT).map(|i| 13 + i * 5)
    }

    /// Every 0-127 field
    fn value_offsets() -> Vec<usize> {
        let mut offsets = vec![0, 6, 7, 8, 9, 10, 11];
        offsets.extend(block_offsets().flat_map(|b| [b + 1, b + 2, b + 3]));
        offsets
    }

    /// Every 0-15 channel field
    fn channel_offsets() -> Vec<usize> {
        let mut offsets = vec![2, 4, 5, 12];
        offsets.extend(block_offsets().map(|b| b + 4));
        offsets
    }

    #[test]
    fn test_range_checked_offsets_cover_layout() {
        let values = value_offsets();
        let channels = channel_offsets();
        assert_eq!(values.len(), 7 + 16 * 3);
        assert_eq!(channels.len(), 4 + 16);
        assert_eq!(channels.last(), Some(&(PAYLOAD_LEN - 1)));
        // Pad fixed_or_min / velocity_or_max and button on / off are included
        assert!(values.contains(&(33 + 2)) && values.contains(&(33 + 3)));
        assert!(values.contains(&(73 + 2)) && values.contains(&(73 + 3)));
    }

    fn valid_payload() -> impl Strategy<Value = Vec<u8>> {
        (
            (0..=127u8, any::<u8>(), 0..=15u8, any::<u8>()),
            0..=15u8,
            (0..=15u8, 0..=127u8, 0..=127u8, 0..=127u8),
            (0..=127u8, 0..=127u8, 0..=127u8, 0..=15u8),
            prop::collection::vec(block(2), KNOB_COUNT),
            prop::collection::vec(block(3), PAD_COUNT),
            prop::collection::vec(block(2), BUTTON_COUNT),
        )
            .prop_map(|(keys, pitch, modw, sus, knobs, pads, buttons)| {
                let mut bytes = vec![keys.0, keys.1, keys.2, keys.3, pitch];
                bytes.extend([modw.0, modw.1, modw.2, modw.3]);
                bytes.extend([sus.0, sus.1, sus.2, sus.3]);
                bytes.extend(knobs.into_iter().flatten());
                bytes.extend(pads.into_iter().flatten());
                bytes.extend(buttons.into_iter().flatten());
                bytes
            })
    }

    proptest! {
        #[test]
        fn prop_decode_then_encode_is_identity(payload in valid_payload()) {
            prop_assert_eq!(payload.len(), PAYLOAD_LEN);
            let config = decode(&payload).unwrap();
            prop_assert_eq!(&encode(&config)[..], &payload[..]);
        }

        #[test]
        fn prop_encode_then_decode_is_identity(payload in valid_payload()) {
            let config = decode(&payload).unwrap();
            prop_assert_eq!(decode(&encode(&config)).unwrap(), config);
        }

        #[test]
        fn prop_high_value_byte_is_rejected(offset in prop::sample::select(value_offsets()), value in 128..=255u8) {
            let mut payload = [0u8; PAYLOAD_LEN];
            payload[offset] = value;
            let is_out_of_range = matches!(decode(&payload), Err(CodecError::OutOfRange { .. }));
            prop_assert!(is_out_of_range);
        }

        #[test]
        fn prop_high_channel_byte_is_rejected(offset in prop::sample::select(channel_offsets()), value in 16..=255u8) {
            let mut payload = [0u8; PAYLOAD_LEN];
            payload[offset] = value;
            let is_out_of_range = matches!(decode(&payload), Err(CodecError::OutOfRange { .. }));
            prop_assert!(is_out_of_range);
        }
    }
}
