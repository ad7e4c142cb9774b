//! Human-readable document numbers: `{PREFIX}-{year}-{sequence}`.
//!
//! The sequence restarts every year and is zero-padded to four digits. The
//! generator only proposes the next free number; uniqueness is enforced by the
//! store, and callers retry on a collision.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use billbook_core::DomainError;

const SEQUENCE_WIDTH: usize = 4;

/// Which document family a number belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Quotation,
    Invoice,
}

impl DocumentKind {
    pub fn default_prefix(self) -> &'static str {
        match self {
            DocumentKind::Quotation => "QUO",
            DocumentKind::Invoice => "INV",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Quotation => "quotation",
            DocumentKind::Invoice => "invoice",
        }
    }
}

/// A parsed document number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentNumber {
    pub prefix: String,
    pub year: i32,
    pub sequence: u32,
}

impl DocumentNumber {
    pub fn new(prefix: impl Into<String>, year: i32, sequence: u32) -> Self {
        Self {
            prefix: prefix.into(),
            year,
            sequence,
        }
    }

    /// `"{prefix}-{year}-"`, the scan key for one year's numbers.
    pub fn year_prefix(prefix: &str, year: i32) -> String {
        format!("{prefix}-{year}-")
    }

    /// Next number for `prefix`/`year` given the numbers already issued.
    ///
    /// Takes the numeric maximum of the sequences that parse under this
    /// prefix and year; anything else (other years, hand-entered numbers) is
    /// ignored. Starts at 1.
    pub fn next_in_sequence<'a>(
        prefix: &str,
        year: i32,
        existing: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let last = existing
            .into_iter()
            .filter_map(|n| n.parse::<DocumentNumber>().ok())
            .filter(|n| n.prefix == prefix && n.year == year)
            .map(|n| n.sequence)
            .max()
            .unwrap_or(0);
        Self::new(prefix, year, last.saturating_add(1))
    }
}

impl core::fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}-{}-{:0width$}",
            self.prefix,
            self.year,
            self.sequence,
            width = SEQUENCE_WIDTH
        )
    }
}

impl FromStr for DocumentNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DomainError::invalid(format!("malformed document number: {s}"));

        let mut parts = s.rsplitn(3, '-');
        let sequence = parts.next().ok_or_else(malformed)?;
        let year = parts.next().ok_or_else(malformed)?;
        let prefix = parts.next().ok_or_else(malformed)?;

        if prefix.is_empty() || !sequence.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }

        Ok(Self {
            prefix: prefix.to_string(),
            year: year.parse().map_err(|_| malformed())?,
            sequence: sequence.parse().map_err(|_| malformed())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_pads_to_four_digits() {
        assert_eq!(DocumentNumber::new("INV", 2026, 7).to_string(), "INV-2026-0007");
        assert_eq!(DocumentNumber::new("INV", 2026, 12345).to_string(), "INV-2026-12345");
    }

    #[test]
    fn parse_round_trips() {
        let n: DocumentNumber = "QUO-2025-0042".parse().unwrap();
        assert_eq!(n, DocumentNumber::new("QUO", 2025, 42));
    }

    #[test]
    fn parse_keeps_dashes_in_prefix() {
        let n: DocumentNumber = "ACME-INV-2025-0003".parse().unwrap();
        assert_eq!(n.prefix, "ACME-INV");
        assert_eq!(n.sequence, 3);
    }

    #[test]
    fn parse_rejects_malformed() {
        for s in ["INV", "INV-2025", "INV-20x5-0001", "INV-2025-00a1", "-2025-0001"] {
            assert!(s.parse::<DocumentNumber>().is_err(), "accepted {s}");
        }
    }

    #[test]
    fn next_starts_at_one() {
        let next = DocumentNumber::next_in_sequence("INV", 2026, Vec::<&str>::new());
        assert_eq!(next.to_string(), "INV-2026-0001");
    }

    #[test]
    fn next_follows_max_of_same_year_and_prefix() {
        let existing = [
            "INV-2026-0003",
            "INV-2026-0010",
            "INV-2025-0099",
            "QUO-2026-0500",
            "custom-number",
        ];
        let next = DocumentNumber::next_in_sequence("INV", 2026, existing);
        assert_eq!(next.to_string(), "INV-2026-0011");
    }

    #[test]
    fn next_uses_numeric_not_lexicographic_max() {
        let next = DocumentNumber::next_in_sequence("INV", 2026, ["INV-2026-9999", "INV-2026-10000"]);
        assert_eq!(next.sequence, 10001);
    }
}
