//! Byte-level UTF-8 decoding tolerant of malformed input.
//!
//! Document text is stored as raw bytes so that malformed sequences degrade
//! gracefully instead of being rejected at the API boundary. Decoding a
//! malformed sequence yields [`INVALID`] and advances by exactly one byte,
//! which keeps a real `0x0A` newline visible even when it follows a
//! truncated multi-byte lead, while an overlong encoding of `\n` (such as
//! `C0 8A`) never reads as a newline.

/// Sentinel code point returned for malformed sequences.
pub const INVALID: u32 = 0xFFFF;

/// Decode one code point starting at `*idx`, advancing `*idx` past it.
///
/// Malformed input (stray continuation bytes, truncated sequences, overlong
/// encodings, surrogates, out-of-range values) decodes to [`INVALID`] and
/// advances one byte. `*idx` never moves past `bytes.len()`.
#[must_use]
pub fn decode(bytes: &[u8], idx: &mut usize) -> u32 {
    let i = *idx;
    debug_assert!(i < bytes.len(), "decode past end of buffer");
    if i >= bytes.len() {
        return INVALID;
    }
    let b0 = bytes[i];
    if b0 < 0x80 {
        *idx = i + 1;
        return u32::from(b0);
    }

    // Length and the minimum value that rules out overlong forms.
    let (len, min) = match b0 {
        0xC2..=0xDF => (2, 0x80),
        0xE0..=0xEF => (3, 0x800),
        0xF0..=0xF4 => (4, 0x1_0000),
        _ => {
            // Continuation byte, overlong lead (C0/C1), or out-of-range lead.
            *idx = i + 1;
            return INVALID;
        }
    };

    if i + len > bytes.len() {
        *idx = i + 1;
        return INVALID;
    }

    let mut cp = u32::from(b0 & (0x7F >> len));
    for k in 1..len {
        let b = bytes[i + k];
        if b & 0xC0 != 0x80 {
            *idx = i + 1;
            return INVALID;
        }
        cp = (cp << 6) | u32::from(b & 0x3F);
    }

    if cp < min || (0xD800..=0xDFFF).contains(&cp) || cp > 0x10_FFFF {
        *idx = i + 1;
        return INVALID;
    }
    *idx = i + len;
    cp
}

/// Encode a code point into `out`, returning the number of bytes written.
///
/// [`INVALID`] and other unencodable values write nothing and return 0.
pub fn encode(cp: u32, out: &mut Vec<u8>) -> usize {
    if cp == INVALID || (0xD800..=0xDFFF).contains(&cp) || cp > 0x10_FFFF {
        return 0;
    }
    let Some(ch) = char::from_u32(cp) else {
        return 0;
    };
    let mut buf = [0_u8; 4];
    let s = ch.encode_utf8(&mut buf);
    out.extend_from_slice(s.as_bytes());
    s.len()
}

/// Step `idx` forward over one code point (or one malformed byte).
pub fn move_inc(bytes: &[u8], idx: &mut usize) {
    if *idx < bytes.len() {
        let mut i = *idx;
        let _ = decode(bytes, &mut i);
        *idx = i;
    }
}

/// Step `idx` backward to the start of the previous code point.
///
/// Walks back over continuation bytes, but never more than three, so a run
/// of malformed continuation bytes still steps one byte at a time.
pub fn move_dec(bytes: &[u8], idx: &mut usize) {
    if *idx == 0 {
        return;
    }
    let mut i = *idx - 1;
    let mut back = 0;
    while i > 0 && back < 3 && bytes[i] & 0xC0 == 0x80 {
        i -= 1;
        back += 1;
    }
    // A lead byte only counts if it decodes across the span we skipped;
    // otherwise the run was malformed and we step a single byte.
    let mut probe = i;
    let _ = decode(bytes, &mut probe);
    if probe >= *idx {
        *idx = i;
    } else {
        *idx -= 1;
    }
}

/// Count characters in `bytes[start..end]`, each malformed byte counting as
/// one character. Used for password-mode width (one placeholder per char).
#[must_use]
pub fn count_chars(bytes: &[u8], start: usize, end: usize) -> usize {
    let end = end.min(bytes.len());
    let mut i = start.min(end);
    let mut n = 0;
    while i < end {
        let _ = decode(bytes, &mut i);
        n += 1;
    }
    n
}
