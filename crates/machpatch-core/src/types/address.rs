//! Memory address and address range types.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::error::PatchError;

/// Strongly typed virtual address in a target task
///
/// This wrapper around `u64` keeps addresses apart from sizes and offsets.
/// It displays in the same form operators type it on the command line:
/// `0x` followed by upper-case hex digits.
///
/// ## Example
///
/// ```rust
/// use machpatch_core::types::Address;
///
/// let base = Address::from(0x1_0000_0000);
/// let patch = base + 0x3462;
/// assert_eq!(patch.to_string(), "0x100003462");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    ///
    /// Usable in const contexts, e.g. for well-known load addresses.
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ```rust
    /// use machpatch_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.checked_add(0x100), Some(Address::from(0x1100)));
    /// assert_eq!(addr.checked_add(u64::MAX), None);
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Subtract an offset from this address, checking for underflow
    pub fn checked_sub(self, offset: u64) -> Option<Self>
    {
        self.0.checked_sub(offset).map(Address)
    }

    /// Parse an address written in hexadecimal, with or without a `0x` prefix
    ///
    /// Returns `None` for empty input, non-hex digits or values that do not
    /// fit in 64 bits.
    ///
    /// ```rust
    /// use machpatch_core::types::Address;
    ///
    /// assert_eq!(Address::from_hex("0x3462"), Some(Address::from(0x3462)));
    /// assert_eq!(Address::from_hex("3462"), Some(Address::from(0x3462)));
    /// assert_eq!(Address::from_hex("0xZZ"), None);
    /// ```
    pub fn from_hex(text: &str) -> Option<Self>
    {
        let trimmed = text.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        u64::from_str_radix(digits, 16).ok().map(Address)
    }
}

impl FromStr for Address
{
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        Address::from_hex(s).ok_or_else(|| PatchError::InvalidAddress(s.to_string()))
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:X}", self.0)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}

/// A contiguous range of target memory: a start address and a byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange
{
    pub start: Address,
    pub size: u64,
}

impl AddressRange
{
    pub const fn new(start: Address, size: u64) -> Self
    {
        Self { start, size }
    }

    /// Build a range from two inclusive bounds
    ///
    /// Returns `None` unless `end > start`. The byte at `end` is part of the range.
    ///
    /// ```rust
    /// use machpatch_core::types::{Address, AddressRange};
    ///
    /// let range = AddressRange::from_bounds(Address::from(0x10), Address::from(0x1f)).unwrap();
    /// assert_eq!(range.size, 0x10);
    /// assert!(AddressRange::from_bounds(Address::from(0x10), Address::from(0x10)).is_none());
    /// ```
    pub fn from_bounds(start: Address, end: Address) -> Option<Self>
    {
        if end <= start {
            return None;
        }
        Some(Self {
            start,
            size: end.value() - start.value() + 1,
        })
    }

    /// First address past the end of the range, saturating at `u64::MAX`
    pub fn end(&self) -> Address
    {
        Address(self.start.value().saturating_add(self.size))
    }

    pub fn is_empty(&self) -> bool
    {
        self.size == 0
    }

    pub fn contains(&self, address: Address) -> bool
    {
        address >= self.start && address < self.end()
    }
}

impl fmt::Display for AddressRange
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}..{} ({} bytes)", self.start, self.end(), self.size)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_address_display_is_upper_hex()
    {
        assert_eq!(Address::from(0xabcdef).to_string(), "0xABCDEF");
        assert_eq!(Address::ZERO.to_string(), "0x0");
    }

    #[test]
    fn test_from_hex_accepts_upper_prefix_and_whitespace()
    {
        assert_eq!(Address::from_hex(" 0X1F "), Some(Address::from(0x1f)));
        assert_eq!(Address::from_hex("0x"), None);
        assert_eq!(Address::from_hex(""), None);
        assert_eq!(Address::from_hex("0x1_0000"), None);
    }

    #[test]
    fn test_from_hex_rejects_sign()
    {
        assert_eq!(Address::from_hex("0x+3462"), None);
        assert_eq!(Address::from_hex("+ff"), None);
        assert_eq!(Address::from_hex("-1"), None);
    }

    #[test]
    fn test_from_str_reports_input()
    {
        let err = "nothex".parse::<Address>().unwrap_err();
        assert!(err.to_string().contains("nothex"));
    }

    #[test]
    fn test_range_end_and_contains()
    {
        let range = AddressRange::new(Address::from(0x1000), 5);
        assert_eq!(range.end(), Address::from(0x1005));
        assert!(range.contains(Address::from(0x1004)));
        assert!(!range.contains(Address::from(0x1005)));
        assert!(!range.is_empty());
    }
}
