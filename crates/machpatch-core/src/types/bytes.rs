//! Byte patterns written as hexadecimal text.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use crate::error::PatchError;

/// An owned byte string parsed from, and displayed as, hexadecimal text
///
/// Accepted input: an optional `0x` prefix followed by an even, non-zero
/// number of hex digits in either case. Whitespace between digits is ignored
/// so that `"85 C0 0F 84 AF"` and `"0x85c00f84af"` parse to the same bytes.
///
/// ```rust
/// use machpatch_core::types::HexBytes;
///
/// let bytes: HexBytes = "85 C0 0F 84 AF".parse()?;
/// assert_eq!(bytes.as_slice(), &[0x85, 0xC0, 0x0F, 0x84, 0xAF]);
/// assert_eq!(bytes.to_string(), "0x85C00F84AF");
/// # Ok::<(), machpatch_core::error::PatchError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct HexBytes(Vec<u8>);

impl HexBytes
{
    pub fn new(bytes: Vec<u8>) -> Self
    {
        HexBytes(bytes)
    }

    pub fn as_slice(&self) -> &[u8]
    {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8>
    {
        self.0
    }

    /// Parse hexadecimal text into bytes, or `None` if the text is not a valid byte string.
    pub fn parse_hex(text: &str) -> Option<Self>
    {
        let trimmed = text.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let digits: String = body.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.is_empty() {
            return None;
        }
        hex::decode(digits).ok().map(HexBytes)
    }
}

/// Upper-case hex rendering of a byte slice with a `0x` prefix.
pub fn hex_string(bytes: &[u8]) -> String
{
    format!("0x{}", hex::encode_upper(bytes))
}

/// Formats bytes into a traditional hex + ASCII view, one row per `width` bytes.
pub fn format_hexdump(base: super::Address, bytes: &[u8], width: usize) -> String
{
    let width = width.clamp(8, 32);
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(width).enumerate() {
        let addr = base.value().saturating_add((row * width) as u64);
        out.push_str(&format!("{addr:016x}: "));

        for i in 0..width {
            match chunk.get(i) {
                Some(byte) => out.push_str(&format!("{byte:02x} ")),
                None => out.push_str("   "),
            }
        }

        out.push(' ');
        for byte in chunk {
            let ch = if byte.is_ascii_graphic() || *byte == b' ' {
                *byte as char
            } else {
                '.'
            };
            out.push(ch);
        }
        out.push('\n');
    }
    out
}

impl FromStr for HexBytes
{
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        HexBytes::parse_hex(s).ok_or_else(|| PatchError::InvalidHexString(s.to_string()))
    }
}

impl Deref for HexBytes
{
    type Target = [u8];

    fn deref(&self) -> &Self::Target
    {
        &self.0
    }
}

impl AsRef<[u8]> for HexBytes
{
    fn as_ref(&self) -> &[u8]
    {
        &self.0
    }
}

impl From<Vec<u8>> for HexBytes
{
    fn from(bytes: Vec<u8>) -> Self
    {
        HexBytes(bytes)
    }
}

impl From<&[u8]> for HexBytes
{
    fn from(bytes: &[u8]) -> Self
    {
        HexBytes(bytes.to_vec())
    }
}

impl fmt::Display for HexBytes
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&hex_string(&self.0))
    }
}
