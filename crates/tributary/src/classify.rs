//! Keyword-based PII classification of object keys.
//!
//! A coarse first pass: an object whose key mentions `accounts` is flagged
//! as financial data without looking at its contents.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// PII category inferred from an object key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PiiCategory {
    PersonalIdentifier,
    FinancialData,
    ContactInfo,
    HealthData,
    BiometricData,
}

impl PiiCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PiiCategory::PersonalIdentifier => "personal_identifier",
            PiiCategory::FinancialData => "financial_data",
            PiiCategory::ContactInfo => "contact_info",
            PiiCategory::HealthData => "health_data",
            PiiCategory::BiometricData => "biometric_data",
        }
    }
}

impl fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static PATTERNS: LazyLock<Vec<(PiiCategory, Vec<Regex>)>> = LazyLock::new(|| {
    let compile = |patterns: &[&str]| -> Vec<Regex> {
        patterns
            .iter()
            .map(|pattern| Regex::new(pattern).expect("static PII pattern"))
            .collect()
    };

    vec![
        (
            PiiCategory::PersonalIdentifier,
            compile(&[
                r"(?i)(nric|passport|identity|id_number|national_id|user)",
                r"(?i)[stfg]\d{7}[a-z]",
            ]),
        ),
        (
            PiiCategory::FinancialData,
            compile(&[
                r"(?i)(account|transaction|payment|salary|income|credit)",
                r"\d{10,16}",
            ]),
        ),
        (
            PiiCategory::ContactInfo,
            compile(&[
                r"(?i)(email|phone|address|contact|mobile)",
                r"[\w.-]+@[\w.-]+\.[a-zA-Z]{2,}",
                r"\+65\d{8}",
            ]),
        ),
        (
            PiiCategory::HealthData,
            compile(&[r"(?i)(medical|health|patient|diagnosis|treatment)"]),
        ),
        (
            PiiCategory::BiometricData,
            compile(&[r"(?i)(biometric|fingerprint|facial|iris|voice)"]),
        ),
    ]
});

/// Every category whose patterns match `key`, in declaration order.
pub fn classify(key: &str) -> Vec<PiiCategory> {
    PATTERNS
        .iter()
        .filter(|(_, patterns)| patterns.iter().any(|re| re.is_match(key)))
        .map(|(category, _)| *category)
        .collect()
}

/// Human-readable summary for an object description.
pub fn describe(categories: &[PiiCategory]) -> String {
    if categories.is_empty() {
        return "PII: none".to_string();
    }
    let names: Vec<_> = categories.iter().map(PiiCategory::as_str).collect();
    format!("PII: {}", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_categories() {
        assert_eq!(
            classify("exports/users/2024/01/users_20240115.parquet"),
            vec![PiiCategory::PersonalIdentifier]
        );
        assert_eq!(
            classify("exports/user_accounts.csv"),
            vec![PiiCategory::PersonalIdentifier, PiiCategory::FinancialData]
        );
        assert_eq!(classify("raw/Accounts.csv"), vec![PiiCategory::FinancialData]);
        assert_eq!(classify("crm/contacts.csv"), vec![PiiCategory::ContactInfo]);
        assert_eq!(classify("clinic/patient_visits.csv"), vec![PiiCategory::HealthData]);
        assert_eq!(classify("auth/fingerprint.bin"), vec![PiiCategory::BiometricData]);
    }

    #[test]
    fn test_identifier_patterns() {
        assert!(classify("dump/S1234567D.json").contains(&PiiCategory::PersonalIdentifier));
        assert!(classify("leads/jane.doe@example.com.csv").contains(&PiiCategory::ContactInfo));
    }

    #[test]
    fn test_no_match() {
        assert!(classify("inventory/products.csv").is_empty());
        assert_eq!(describe(&[]), "PII: none");
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            describe(&[PiiCategory::FinancialData, PiiCategory::ContactInfo]),
            "PII: financial_data, contact_info"
        );
    }
}
