//! Handle type for DXF entities
//!
//! Handles are unique hexadecimal identifiers for all entities in a
//! document. Handle "0" is reserved as the "no reference" sentinel.

use crate::error::{DxfError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A unique identifier for DXF entities
///
/// Written as an uppercase hex string in DXF files. The null handle sorts
/// after every other handle, so ascending handle order puts it last and
/// descending order puts it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    /// The null handle, "0"
    pub const NULL: Handle = Handle(0);

    #[inline]
    pub const fn new(value: u64) -> Self {
        Handle(value)
    }

    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 != 0
    }

    /// Parse a DXF hex handle string. Surrounding whitespace is ignored.
    pub fn from_hex(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.len() > 16 {
            return Err(DxfError::InvalidHandle(s.to_string()));
        }
        u64::from_str_radix(trimmed, 16)
            .map(Handle)
            .map_err(|_| DxfError::InvalidHandle(s.to_string()))
    }

    /// Hex string as written to DXF
    pub fn to_hex(&self) -> String {
        format!("{:X}", self.0)
    }
}

impl Default for Handle {
    fn default() -> Self {
        Handle::NULL
    }
}

impl Ord for Handle {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for Handle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Handle {
    type Err = DxfError;

    fn from_str(s: &str) -> Result<Self> {
        Handle::from_hex(s)
    }
}

impl From<u64> for Handle {
    fn from(value: u64) -> Self {
        Handle(value)
    }
}

impl From<Handle> for u64 {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

impl fmt::LowerHex for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::UpperHex for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

/// Sort handles ascending (null last) or descending (null first).
pub fn sort_handles(handles: &mut [Handle], descending: bool) {
    if descending {
        handles.sort_by(|a, b| b.cmp(a));
    } else {
        handles.sort();
    }
}

/// Monotonic handle source
///
/// Handles handed out once are never handed out again, even when the
/// entity that owned them is destroyed.
#[derive(Debug, Clone)]
pub struct HandleGenerator {
    next: u64,
}

impl HandleGenerator {
    pub fn new(start: u64) -> Self {
        Self { next: start.max(1) }
    }

    /// Next candidate, advancing the counter.
    pub fn next_handle(&mut self) -> Handle {
        let handle = Handle(self.next);
        self.next += 1;
        handle
    }

    /// The value the next call will start from ($HANDSEED).
    pub fn seed(&self) -> Handle {
        Handle(self.next)
    }

    /// Move the counter forward; never backwards.
    pub fn advance_past(&mut self, handle: Handle) {
        if handle.0 >= self.next {
            self.next = handle.0 + 1;
        }
    }
}

impl Default for HandleGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        let handle = Handle::from_hex("1F").unwrap();
        assert_eq!(handle.value(), 0x1F);
        assert_eq!(handle.to_string(), "1F");
        assert_eq!(format!("{:x}", handle), "1f");
        assert_eq!("00ab".parse::<Handle>().unwrap(), Handle::new(0xAB));
    }

    #[test]
    fn test_invalid_hex() {
        assert!(Handle::from_hex("XYZ").is_err());
        assert!(Handle::from_hex("").is_err());
        assert!(Handle::from_hex("11112222333344445").is_err());
    }

    #[test]
    fn test_null_handle() {
        let null = Handle::from_hex("0").unwrap();
        assert!(null.is_null());
        assert!(!null.is_valid());
        assert_eq!(null, Handle::NULL);
    }

    #[test]
    fn test_null_sorts_last_ascending_first_descending() {
        let mut handles = vec![Handle::new(0x20), Handle::NULL, Handle::new(0x5), Handle::new(0xFF)];
        sort_handles(&mut handles, false);
        assert_eq!(
            handles,
            vec![Handle::new(0x5), Handle::new(0x20), Handle::new(0xFF), Handle::NULL]
        );
        sort_handles(&mut handles, true);
        assert_eq!(handles[0], Handle::NULL);
        assert_eq!(handles[1], Handle::new(0xFF));
    }

    #[test]
    fn test_generator_is_monotonic() {
        let mut gen = HandleGenerator::new(0x10);
        assert_eq!(gen.next_handle(), Handle::new(0x10));
        gen.advance_past(Handle::new(0x40));
        assert_eq!(gen.next_handle(), Handle::new(0x41));
        gen.advance_past(Handle::new(0x05));
        assert_eq!(gen.seed(), Handle::new(0x42));
    }
}
