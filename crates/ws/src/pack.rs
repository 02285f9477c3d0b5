use core::fmt::{self, Display};

/// An error raised while decoding a bit-packed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackError {
    /// The bit stream ends with a `1` bit that starts no code.
    UnmatchedTrailingOne,
}

impl core::error::Error for PackError {}

impl Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmatchedTrailingOne => write!(f, "unmatched trailing 1 bit"),
        }
    }
}

/// Encodes Whitespace source bytes into the bit-packed format.
///
/// Space encodes as `0`, tab as `10`, lf as `11`, most significant bit
/// first; all other bytes are dropped. The last byte is padded with zero
/// bits.
pub fn pack(src: &[u8]) -> Vec<u8> {
    let mut writer = BitWriter::default();
    for byte in src {
        match byte {
            b' ' => writer.write(false),
            b'\t' => {
                writer.write(true);
                writer.write(false);
            }
            b'\n' => {
                writer.write(true);
                writer.write(true);
            }
            _ => {}
        }
    }
    writer.finish()
}

/// Decodes a bit-packed source back into Whitespace source bytes.
///
/// Trailing zero bits of the last byte are padding when the bits before
/// them decode to a source ending in lf; when they do not, the padding is
/// dropped and the decoded source is completed with an `end` instruction.
///
/// # Errors
///
/// If the bit stream ends with an unmatched `1` bit.
pub fn unpack(packed: &[u8]) -> Result<Vec<u8>, PackError> {
    let total_bits = packed.len() * 8;
    let bit_at = |index: usize| packed[index / 8] >> (7 - index % 8) & 1 == 1;
    let mut out = Vec::new();
    let mut starts = Vec::new();
    let mut index = 0;
    while index < total_bits {
        starts.push(index);
        if !bit_at(index) {
            out.push(b' ');
            index += 1;
        } else if index + 1 == total_bits {
            return Err(PackError::UnmatchedTrailingOne);
        } else {
            out.push(if bit_at(index + 1) { b'\n' } else { b'\t' });
            index += 2;
        }
    }
    // Strip padding: trailing spaces decoded from zero bits of the last byte.
    let last_byte_start = total_bits.saturating_sub(8);
    let mut keep = out.len();
    while keep > 0 && out[keep - 1] == b' ' && starts[keep - 1] >= last_byte_start {
        keep -= 1;
    }
    if keep < out.len() {
        out.truncate(keep);
        if !matches!(out.last(), None | Some(b'\n')) {
            // The stream did not end on an instruction boundary; the source
            // ends with an implicit program end.
            out.extend_from_slice(b"\n\n\n");
        }
    }
    Ok(out)
}

/// Renders Whitespace source with visible `S`/`T`/`L` letters.
pub fn to_visible(src: &[u8]) -> String {
    src.iter()
        .filter_map(|byte| match byte {
            b' ' => Some('S'),
            b'\t' => Some('T'),
            b'\n' => Some('L'),
            _ => None,
        })
        .collect()
}

/// Parses visible `S`/`T`/`L` letters back into Whitespace source bytes.
///
/// Every byte other than `S`, `T`, and `L` is ignored.
pub fn from_visible(src: &str) -> Vec<u8> {
    src.bytes()
        .filter_map(|byte| match byte {
            b'S' => Some(b' '),
            b'T' => Some(b'\t'),
            b'L' => Some(b'\n'),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Default)]
struct BitWriter {
    bytes: Vec<u8>,
    current: u8,
    filled: u8,
}

impl BitWriter {
    fn write(&mut self, bit: bool) {
        self.current = self.current << 1 | u8::from(bit);
        self.filled += 1;
        if self.filled == 8 {
            self.bytes.push(self.current);
            self.current = 0;
            self.filled = 0;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.filled > 0 {
            self.bytes.push(self.current << (8 - self.filled));
        }
        self.bytes
    }
}
