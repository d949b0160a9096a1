//! The three-valued conversion lattice.
//!
//! `NoConversion < UnsafeConversion < SafeConversion`. Destination-side
//! aggregation keeps the strongest kind seen, source-side and unification
//! keep the weakest.
use std::fmt;

use serde::Serialize;

/// How a value of one type becomes a value of another.
#[allow(clippy::enum_variant_names)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionKind {
    /// no conversion exists
    #[default]
    NoConversion,
    /// may fail or lose information at runtime
    UnsafeConversion,
    /// always succeeds, no loss
    SafeConversion,
}

impl ConversionKind {
    pub fn exists(self) -> bool {
        self != ConversionKind::NoConversion
    }

    pub fn is_safe(self) -> bool {
        self == ConversionKind::SafeConversion
    }

    /// Meet: the weaker of the two.
    pub fn weakest(self, other: Self) -> Self {
        self.min(other)
    }

    /// Join: the stronger of the two.
    pub fn strongest(self, other: Self) -> Self {
        self.max(other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConversionKind::NoConversion => "none",
            ConversionKind::UnsafeConversion => "unsafe",
            ConversionKind::SafeConversion => "safe",
        }
    }
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConversionKind::*;

    #[test]
    fn lattice_is_ordered() {
        assert!(NoConversion < UnsafeConversion);
        assert!(UnsafeConversion < SafeConversion);
        assert_eq!(ConversionKind::default(), NoConversion);
    }

    #[test]
    fn meet_and_join() {
        assert_eq!(SafeConversion.weakest(UnsafeConversion), UnsafeConversion);
        assert_eq!(UnsafeConversion.weakest(NoConversion), NoConversion);
        assert_eq!(NoConversion.strongest(SafeConversion), SafeConversion);
        assert!(UnsafeConversion.exists());
        assert!(!NoConversion.exists());
        assert!(!UnsafeConversion.is_safe());
    }

    #[test]
    fn serializes_snake_case() {
        let s = serde_json::to_string(&UnsafeConversion).unwrap();
        assert_eq!(s, "\"unsafe_conversion\"");
        assert_eq!(SafeConversion.to_string(), "safe");
    }
}
