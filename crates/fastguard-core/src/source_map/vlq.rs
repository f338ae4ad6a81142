//! Base64 VLQ as used by v3 source map `mappings`.

const B64: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// VLQ-encode a signed integer and append to `out`.
pub fn encode(value: i64, out: &mut String) {
    #[allow(clippy::cast_sign_loss)]
    let mut v = (if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    }) as u64;
    loop {
        let mut digit = (v & 0x1f) as u8;
        v >>= 5;
        if v > 0 {
            digit |= 0x20; // continuation bit
        }
        out.push(B64[digit as usize] as char);
        if v == 0 {
            break;
        }
    }
}

fn digit_value(c: u8) -> Option<u64> {
    let v = match c {
        b'A'..=b'Z' => c - b'A',
        b'a'..=b'z' => c - b'a' + 26,
        b'0'..=b'9' => c - b'0' + 52,
        b'+' => 62,
        b'/' => 63,
        _ => return None,
    };
    Some(u64::from(v))
}

/// Decode one VLQ value from the front of `input`.
///
/// Returns the value and the number of bytes consumed, or `None` for an
/// invalid character, a truncated value, or overflow.
#[must_use]
pub fn decode(input: &str) -> Option<(i64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    for (i, &byte) in input.as_bytes().iter().enumerate() {
        let digit = digit_value(byte)?;
        if shift > 60 {
            return None;
        }
        result |= (digit & 0x1f) << shift;
        if digit & 0x20 == 0 {
            #[allow(clippy::cast_possible_wrap)]
            let magnitude = (result >> 1) as i64;
            let value = if result & 1 == 1 { -magnitude } else { magnitude };
            return Some((value, i + 1));
        }
        shift += 5;
    }
    None
}
