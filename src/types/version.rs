//! DXF file revisions

use std::fmt;

/// DXF revision as stored in `$ACADVER`
///
/// Ordered by release, so `version < DxfVersion::AC1021` reads as
/// "older than R2007".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DxfVersion {
    /// R12, also used for anything older
    AC1009,
    /// R13
    AC1012,
    /// R14
    AC1014,
    /// R2000
    AC1015,
    /// R2004
    AC1018,
    /// R2007
    AC1021,
    /// R2010
    AC1024,
    /// R2013
    AC1027,
    /// R2018
    AC1032,
}

impl DxfVersion {
    pub const ALL: [DxfVersion; 9] = [
        DxfVersion::AC1009,
        DxfVersion::AC1012,
        DxfVersion::AC1014,
        DxfVersion::AC1015,
        DxfVersion::AC1018,
        DxfVersion::AC1021,
        DxfVersion::AC1024,
        DxfVersion::AC1027,
        DxfVersion::AC1032,
    ];

    /// Parse an `$ACADVER` value.
    ///
    /// Revisions older than R12 load as R12, unknown newer ones as the
    /// newest supported revision.
    pub fn from_version_string(s: &str) -> DxfVersion {
        let s = s.trim().to_ascii_uppercase();
        if let Some(version) = Self::ALL.iter().find(|v| v.as_str() == s) {
            return *version;
        }
        match s.as_str() {
            "AC1006" | "AC1004" | "AC1003" | "AC1002" | "AC1001" | "AC1.50" | "AC2.10" => {
                DxfVersion::AC1009
            }
            other if other.starts_with("AC") && other > "AC1032" => DxfVersion::AC1032,
            _ => DxfVersion::AC1009,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DxfVersion::AC1009 => "AC1009",
            DxfVersion::AC1012 => "AC1012",
            DxfVersion::AC1014 => "AC1014",
            DxfVersion::AC1015 => "AC1015",
            DxfVersion::AC1018 => "AC1018",
            DxfVersion::AC1021 => "AC1021",
            DxfVersion::AC1024 => "AC1024",
            DxfVersion::AC1027 => "AC1027",
            DxfVersion::AC1032 => "AC1032",
        }
    }

    pub fn release(&self) -> &'static str {
        match self {
            DxfVersion::AC1009 => "R12",
            DxfVersion::AC1012 => "R13",
            DxfVersion::AC1014 => "R14",
            DxfVersion::AC1015 => "R2000",
            DxfVersion::AC1018 => "R2004",
            DxfVersion::AC1021 => "R2007",
            DxfVersion::AC1024 => "R2010",
            DxfVersion::AC1027 => "R2013",
            DxfVersion::AC1032 => "R2018",
        }
    }

    /// R12 files have no subclass markers, no owner handles and no OBJECTS.
    pub fn is_legacy(&self) -> bool {
        *self <= DxfVersion::AC1009
    }

    /// R2007 and later store text as UTF-8.
    pub fn uses_utf8(&self) -> bool {
        *self >= DxfVersion::AC1021
    }
}

impl Default for DxfVersion {
    fn default() -> Self {
        DxfVersion::AC1032
    }
}

impl fmt::Display for DxfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.release())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known() {
        assert_eq!(DxfVersion::from_version_string("AC1015"), DxfVersion::AC1015);
        assert_eq!(DxfVersion::from_version_string(" ac1021 "), DxfVersion::AC1021);
    }

    #[test]
    fn test_parse_out_of_range() {
        assert_eq!(DxfVersion::from_version_string("AC1006"), DxfVersion::AC1009);
        assert_eq!(DxfVersion::from_version_string("AC1040"), DxfVersion::AC1032);
        assert_eq!(DxfVersion::from_version_string(""), DxfVersion::AC1009);
    }

    #[test]
    fn test_ordering_flags() {
        assert!(DxfVersion::AC1009.is_legacy());
        assert!(!DxfVersion::AC1012.is_legacy());
        assert!(!DxfVersion::AC1018.uses_utf8());
        assert!(DxfVersion::AC1024.uses_utf8());
    }
}
