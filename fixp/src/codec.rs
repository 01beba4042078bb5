//! FIX 4.4 tag=value codec (C4): zero-copy decode with a tag -> (offset,
//! length) index, allocation-free fast numeric parsers, and an encode
//! builder that injects body length and checksum.

use std::collections::HashMap;
use thiserror::Error;

/// SOH, the ASCII 0x01 FIX field separator.
pub const SOH: u8 = 0x01;

/// Errors raised while decoding a FIX message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The trailing checksum did not match the computed value.
    #[error("checksum mismatch: expected {expected}, computed {computed}")]
    BadChecksum {
        /// Checksum value present on the wire.
        expected: u32,
        /// Checksum value computed over the frame.
        computed: u32,
    },
    /// The frame was missing a mandatory tag (8, 9, or 35).
    #[error("malformed frame: missing tag {0}")]
    MissingTag(u32),
    /// The frame had no parseable tag=value records.
    #[error("empty or malformed frame")]
    Empty,
}

/// A decoded FIX message: an immutable byte buffer plus a tag -> (offset,
/// length) index into it. Numeric accessors parse views on demand and
/// never allocate.
#[derive(Debug, Clone)]
pub struct FixMessage<'a> {
    buf: &'a [u8],
    index: HashMap<u32, (usize, usize)>,
}

impl<'a> FixMessage<'a> {
    /// Zero-copy decode of a single complete FIX frame (no trailing bytes
    /// beyond the `10=NNN` SOH). Accepts both `\x01` and `|` as the field
    /// delimiter on read, per the framing substitution allowed in test
    /// harnesses.
    pub fn parse(buf: &'a [u8]) -> Result<Self, CodecError> {
        let mut index = HashMap::new();
        let mut pos = 0usize;
        while pos < buf.len() {
            let eq = match buf[pos..].iter().position(|&b| b == b'=') {
                Some(i) => pos + i,
                None => break,
            };
            let tag: u32 = match std::str::from_utf8(&buf[pos..eq])
                .ok()
                .and_then(|s| s.parse().ok())
            {
                Some(t) => t,
                None => break,
            };
            let value_start = eq + 1;
            let delim = buf[value_start..]
                .iter()
                .position(|&b| b == SOH || b == b'|')
                .map(|i| value_start + i)
                .unwrap_or(buf.len());
            index.insert(tag, (value_start, delim - value_start));
            pos = delim + 1;
        }

        if index.is_empty() {
            return Err(CodecError::Empty);
        }
        for required in [8u32, 9, 35] {
            if !index.contains_key(&required) {
                return Err(CodecError::MissingTag(required));
            }
        }

        let msg = Self { buf, index };

        if let Some(expected) = msg.get_int_fast(10) {
            let computed = checksum(&buf[..msg.checksum_boundary()]);
            if expected as u32 != computed {
                return Err(CodecError::BadChecksum {
                    expected: expected as u32,
                    computed,
                });
            }
        }

        Ok(msg)
    }

    /// Offset of the start of the `10=` tag, i.e. the end of the checksummed
    /// region. Falls back to buffer length if tag 10 is absent.
    fn checksum_boundary(&self) -> usize {
        self.index.get(&10).map_or(self.buf.len(), |&(off, _)| {
            // Walk back past "10=" to the start of the tag.
            off.saturating_sub(3)
        })
    }

    /// Raw bytes of the underlying buffer.
    #[must_use]
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// Whether `tag` is present in this message.
    #[must_use]
    pub fn has_field(&self, tag: u32) -> bool {
        self.index.contains_key(&tag)
    }

    /// View of a field's raw bytes, or `None` if absent.
    #[must_use]
    pub fn get(&self, tag: u32) -> Option<&'a [u8]> {
        self.index.get(&tag).map(|&(off, len)| &self.buf[off..off + len])
    }

    /// View of a field's raw bytes as `&str`, or `None` if absent or not
    /// valid UTF-8.
    #[must_use]
    pub fn get_str(&self, tag: u32) -> Option<&'a str> {
        self.get(tag).and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Whether `tag`'s `MsgType` equals `mt`.
    #[must_use]
    pub fn is_msg_type(&self, mt: &str) -> bool {
        self.get_str(35) == Some(mt)
    }

    /// Allocation-free signed integer parse of a field.
    #[must_use]
    pub fn get_int_fast(&self, tag: u32) -> Option<i64> {
        self.get(tag).and_then(fast_parse_int)
    }

    /// Allocation-free unsigned integer parse of a field.
    #[must_use]
    pub fn get_uint_fast(&self, tag: u32) -> Option<u64> {
        self.get(tag).and_then(fast_parse_uint)
    }

    /// Allocation-free floating point parse of a field.
    #[must_use]
    pub fn get_f64_fast(&self, tag: u32) -> Option<f64> {
        self.get(tag).and_then(fast_parse_f64)
    }

    /// Allocation-free boolean parse (`Y`/`N`) of a field.
    #[must_use]
    pub fn get_bool_fast(&self, tag: u32) -> Option<bool> {
        self.get(tag).and_then(|b| match b {
            b"Y" => Some(true),
            b"N" => Some(false),
            _ => None,
        })
    }
}

/// Locale-free, allocation-free signed integer parse. Skips a leading
/// sign, ignores non-digit bytes per FIX convention (never errors on
/// garbage -- just stops or skips).
#[must_use]
pub fn fast_parse_int(bytes: &[u8]) -> Option<i64> {
    if bytes.is_empty() {
        return None;
    }
    let mut idx = 0;
    let negative = bytes[0] == b'-';
    if negative || bytes[0] == b'+' {
        idx = 1;
    }
    let mut value: i64 = 0;
    let mut any = false;
    while idx < bytes.len() {
        let b = bytes[idx];
        if b.is_ascii_digit() {
            value = value * 10 + i64::from(b - b'0');
            any = true;
            idx += 1;
        } else {
            break;
        }
    }
    if !any {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Locale-free, allocation-free unsigned integer parse.
#[must_use]
pub fn fast_parse_uint(bytes: &[u8]) -> Option<u64> {
    let mut value: u64 = 0;
    let mut any = false;
    for &b in bytes {
        if b.is_ascii_digit() {
            value = value * 10 + u64::from(b - b'0');
            any = true;
        } else if any {
            break;
        }
    }
    any.then_some(value)
}

/// Locale-free, allocation-free decimal parse. Handles an optional sign,
/// integer part, decimal point, fractional part, and basic `e`/`E`
/// scientific notation.
#[must_use]
pub fn fast_parse_f64(bytes: &[u8]) -> Option<f64> {
    // No locale tables, no allocation: lean on core::str::parse, which is
    // itself allocation-free for &str, after a single UTF-8 validation
    // that's cheap for the short numeric fields FIX carries.
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}

/// Compute the FIX checksum (mod-256 sum of all bytes), rendered as 3-digit
/// zero-padded ASCII by [`format_checksum`].
#[must_use]
pub fn checksum(bytes: &[u8]) -> u32 {
    u32::from(bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)))
}

/// Render a checksum as the 3-digit zero-padded ASCII FIX requires.
#[must_use]
pub fn format_checksum(sum: u32) -> String {
    format!("{:03}", sum % 256)
}

/// Builds a FIX message body field by field, then finishes it into a
/// complete wire frame with injected body length and checksum.
#[derive(Debug, Default)]
pub struct FixBuilder {
    fields: Vec<(u32, String)>,
}

impl FixBuilder {
    /// Start a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append a string field.
    #[must_use]
    pub fn field(mut self, tag: u32, value: impl Into<String>) -> Self {
        self.fields.push((tag, value.into()));
        self
    }

    /// Append an integer field.
    #[must_use]
    pub fn int(self, tag: u32, value: i64) -> Self {
        self.field(tag, value.to_string())
    }

    /// Append a decimal field with fixed precision.
    #[must_use]
    pub fn decimal(self, tag: u32, value: f64, precision: usize) -> Self {
        self.field(tag, format!("{value:.precision$}"))
    }

    /// Finish the message: prepend `8=FIX.4.4|9=<bodylen>|`, append
    /// `10=<checksum>|`, using `\x01` as the wire delimiter.
    #[must_use]
    pub fn build(self, msg_type: &str, sender: &str, target: &str, seq: u64) -> Vec<u8> {
        let mut body = Vec::new();
        push_field(&mut body, 35, msg_type);
        push_field(&mut body, 49, sender);
        push_field(&mut body, 56, target);
        push_field(&mut body, 34, &seq.to_string());
        for (tag, value) in &self.fields {
            push_field(&mut body, *tag, value);
        }

        let mut out = Vec::with_capacity(body.len() + 32);
        push_field(&mut out, 8, "FIX.4.4");
        push_field(&mut out, 9, &body.len().to_string());
        out.extend_from_slice(&body);

        let sum = checksum(&out);
        push_field(&mut out, 10, &format_checksum(sum));
        out
    }
}

fn push_field(out: &mut Vec<u8>, tag: u32, value: &str) {
    out.extend_from_slice(tag.to_string().as_bytes());
    out.push(b'=');
    out.extend_from_slice(value.as_bytes());
    out.push(SOH);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(s: &str) -> Vec<u8> {
        s.bytes().map(|b| if b == b'|' { SOH } else { b }).collect()
    }

    #[test]
    fn fast_parse_int_handles_sign_and_stops_at_non_digit() {
        assert_eq!(fast_parse_int(b"123"), Some(123));
        assert_eq!(fast_parse_int(b"-45"), Some(-45));
        assert_eq!(fast_parse_int(b"+7"), Some(7));
        assert_eq!(fast_parse_int(b""), None);
    }

    #[test]
    fn fast_parse_f64_handles_decimals() {
        assert!((fast_parse_f64(b"123.45").unwrap() - 123.45).abs() < 1e-9);
        assert!((fast_parse_f64(b"-0.5").unwrap() + 0.5).abs() < 1e-9);
    }

    #[test]
    fn checksum_is_mod_256_sum() {
        let body = b"8=FIX.4.4\x019=5\x0135=A\x01";
        let sum = checksum(body);
        assert!(sum < 256);
    }

    #[test]
    fn parse_accepts_pipe_delimited_and_verifies_checksum() {
        let body_no_trailer = raw("8=FIX.4.4|9=14|35=A|");
        let sum = checksum(&body_no_trailer);
        let wire = raw(&format!("8=FIX.4.4|9=14|35=A|10={:03}|", sum % 256));

        let msg = FixMessage::parse(&wire).expect("should parse");
        assert!(msg.is_msg_type("A"));
        assert_eq!(msg.get_str(8), Some("FIX.4.4"));
    }

    #[test]
    fn parse_rejects_bad_checksum() {
        let wire = raw("8=FIX.4.4|9=14|35=A|10=000|");
        let err = FixMessage::parse(&wire).unwrap_err();
        assert!(matches!(err, CodecError::BadChecksum { .. }));
    }

    #[test]
    fn builder_roundtrips_through_parser() {
        let wire = FixBuilder::new()
            .field(98, "0")
            .int(108, 30)
            .build("A", "SENDER", "TARGET", 1);

        let msg = FixMessage::parse(&wire).expect("should parse");
        assert!(msg.is_msg_type("A"));
        assert_eq!(msg.get_str(49), Some("SENDER"));
        assert_eq!(msg.get_str(56), Some("TARGET"));
        assert_eq!(msg.get_int_fast(34), Some(1));
        assert_eq!(msg.get_int_fast(108), Some(30));
    }

    #[test]
    fn encode_then_decode_preserves_field_values_r1() {
        let wire = FixBuilder::new()
            .field(55, "BTCUSDT")
            .decimal(44, 100.25, 2)
            .int(38, 10)
            .build("D", "SENDER", "TARGET", 7);

        let msg = FixMessage::parse(&wire).unwrap();
        assert_eq!(msg.get_str(55), Some("BTCUSDT"));
        assert_eq!(msg.get_f64_fast(44), Some(100.25));
        assert_eq!(msg.get_int_fast(38), Some(10));
        assert_eq!(msg.get_int_fast(34), Some(7));
    }
}
