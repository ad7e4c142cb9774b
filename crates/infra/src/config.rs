//! Billing configuration.
//!
//! Read from `BILLBOOK_*` environment variables. Unset variables take the
//! default; malformed ones are logged and also take the default.

use std::str::FromStr;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use billbook_invoicing::DocumentKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingConfig {
    pub invoice_prefix: String,
    pub quotation_prefix: String,
    /// How many times number generation is retried after a collision.
    pub number_retry_attempts: u32,
    /// Due date offset for invoices created from quotations.
    pub default_due_days: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            invoice_prefix: DocumentKind::Invoice.default_prefix().to_string(),
            quotation_prefix: DocumentKind::Quotation.default_prefix().to_string(),
            number_retry_attempts: 5,
            default_due_days: 30,
        }
    }
}

impl BillingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            invoice_prefix: setting(&lookup, "BILLBOOK_INVOICE_PREFIX", parse_prefix)
                .unwrap_or(defaults.invoice_prefix),
            quotation_prefix: setting(&lookup, "BILLBOOK_QUOTATION_PREFIX", parse_prefix)
                .unwrap_or(defaults.quotation_prefix),
            number_retry_attempts: setting(&lookup, "BILLBOOK_NUMBER_RETRY_ATTEMPTS", parse_positive)
                .unwrap_or(defaults.number_retry_attempts),
            default_due_days: setting(&lookup, "BILLBOOK_DEFAULT_DUE_DAYS", parse_number)
                .unwrap_or(defaults.default_due_days),
        }
    }

    pub fn prefix(&self, kind: DocumentKind) -> &str {
        match kind {
            DocumentKind::Invoice => &self.invoice_prefix,
            DocumentKind::Quotation => &self.quotation_prefix,
        }
    }
}

fn setting<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: fn(&str) -> anyhow::Result<T>,
) -> Option<T> {
    let raw = lookup(key)?;
    match parse(raw.trim()).with_context(|| format!("{key}={raw:?}")) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!("ignoring malformed setting, using default: {err:#}");
            None
        }
    }
}

fn parse_prefix(raw: &str) -> anyhow::Result<String> {
    if raw.is_empty() {
        bail!("prefix cannot be empty");
    }
    if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        bail!("prefix may only contain letters, digits and dashes");
    }
    Ok(raw.to_uppercase())
}

fn parse_number(raw: &str) -> anyhow::Result<u32> {
    u32::from_str(raw).context("expected a non-negative integer")
}

fn parse_positive(raw: &str) -> anyhow::Result<u32> {
    let n = parse_number(raw)?;
    if n == 0 {
        bail!("must be at least 1");
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> BillingConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BillingConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        assert_eq!(from(&[]), BillingConfig::default());
        assert_eq!(BillingConfig::default().prefix(DocumentKind::Invoice), "INV");
        assert_eq!(BillingConfig::default().prefix(DocumentKind::Quotation), "QUO");
    }

    #[test]
    fn values_are_read() {
        let cfg = from(&[
            ("BILLBOOK_INVOICE_PREFIX", "bill"),
            ("BILLBOOK_QUOTATION_PREFIX", "EST"),
            ("BILLBOOK_NUMBER_RETRY_ATTEMPTS", "9"),
            ("BILLBOOK_DEFAULT_DUE_DAYS", " 14 "),
        ]);
        assert_eq!(cfg.invoice_prefix, "BILL");
        assert_eq!(cfg.quotation_prefix, "EST");
        assert_eq!(cfg.number_retry_attempts, 9);
        assert_eq!(cfg.default_due_days, 14);
    }

    #[test]
    fn malformed_values_fall_back() {
        let cfg = from(&[
            ("BILLBOOK_INVOICE_PREFIX", "IN V"),
            ("BILLBOOK_NUMBER_RETRY_ATTEMPTS", "0"),
            ("BILLBOOK_DEFAULT_DUE_DAYS", "-3"),
        ]);
        assert_eq!(cfg, BillingConfig::default());
    }
}
