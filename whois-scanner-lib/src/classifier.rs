//! Registrant classification.
//!
//! Turns a normalized [`RegistrationRecord`] into an [`Outcome`]. The privacy
//! check runs first; only records that are not flagged get bucketed by country.

use crate::types::{ClassificationRules, Outcome, RegistrationRecord};
use std::collections::HashSet;

/// Classify a registration record against the rule set.
///
/// Precedence:
/// 1. exact match of the candidate identity → `Flagged{candidate}`
/// 2. candidate starts with a configured prefix (in order) → `Flagged{"prefix:<p>"}`
/// 3. otherwise → `Succeeded{registrant_country}`
///
/// The candidate identity is the registrant name, or the registrant
/// organization when the name is missing.
pub fn classify(record: &RegistrationRecord, rules: &ClassificationRules) -> Outcome {
    let nameservers = normalize_nameservers(&record.nameservers);

    if let Some(matched_term) = privacy_match(record, rules) {
        tracing::debug!(
            "Hostname {} was marked as a privacy flag. Term match: {}",
            record.domain,
            matched_term
        );
        return Outcome::Flagged {
            matched_term,
            nameservers,
        };
    }

    tracing::debug!(
        "Hostname {} was recorded for country {:?}",
        record.domain,
        record.registrant_country
    );
    Outcome::Succeeded {
        country: record.registrant_country.clone(),
        nameservers,
    }
}

/// Check the candidate identity for a privacy indicator.
///
/// Returns the matched term: the identity itself for an exact match, or
/// `prefix:<term>` for the first matching prefix.
pub fn privacy_match(record: &RegistrationRecord, rules: &ClassificationRules) -> Option<String> {
    let candidate = record.candidate_identity()?;

    if rules.exact_match.contains(candidate) {
        return Some(candidate.to_string());
    }

    rules
        .prefix
        .iter()
        .find(|term| candidate.starts_with(term.as_str()))
        .map(|term| format!("prefix:{}", term))
}

/// Normalize nameservers into an ordered, de-duplicated, lowercase list.
pub fn normalize_nameservers<S: AsRef<str>>(nameservers: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    nameservers
        .iter()
        .map(|ns| ns.as_ref().trim().trim_end_matches('.').to_lowercase())
        .filter(|ns| !ns.is_empty())
        .filter(|ns| seen.insert(ns.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_named(name: Option<&str>, org: Option<&str>) -> RegistrationRecord {
        RegistrationRecord {
            domain: "example.test".to_string(),
            registrant_name: name.map(str::to_string),
            registrant_org: org.map(str::to_string),
            registrant_country: Some("US".to_string()),
            nameservers: vec!["NS1.Example.test".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_exact_match_beats_prefix() {
        let rules = ClassificationRules::new(["Foo"], ["Ba", "Fo"]);
        let outcome = classify(&record_named(Some("Foo"), None), &rules);
        assert_eq!(
            outcome,
            Outcome::Flagged {
                matched_term: "Foo".to_string(),
                nameservers: vec!["ns1.example.test".to_string()],
            }
        );
    }

    #[test]
    fn test_prefix_match() {
        let rules = ClassificationRules::new(["Foo"], ["Ba"]);
        let outcome = classify(&record_named(Some("Bar"), None), &rules);
        assert!(matches!(
            outcome,
            Outcome::Flagged { ref matched_term, .. } if matched_term == "prefix:Ba"
        ));
    }

    #[test]
    fn test_first_prefix_wins() {
        let rules = ClassificationRules::new(Vec::<String>::new(), ["Redacted", "Red"]);
        let record = record_named(Some("Redacted for Privacy"), None);
        assert_eq!(
            privacy_match(&record, &rules),
            Some("prefix:Redacted".to_string())
        );
    }

    #[test]
    fn test_prefix_direction_is_candidate_starts_with_term() {
        // The configured term being a prefix of the candidate matches;
        // the candidate being a prefix of the term does not.
        let rules = ClassificationRules::new(Vec::<String>::new(), ["Privacy Service"]);
        assert_eq!(privacy_match(&record_named(Some("Privacy"), None), &rules), None);
    }

    #[test]
    fn test_org_used_when_name_missing() {
        let rules = ClassificationRules::new(["Domains By Proxy, LLC"], Vec::<String>::new());
        let record = record_named(None, Some("Domains By Proxy, LLC"));
        assert_eq!(
            privacy_match(&record, &rules),
            Some("Domains By Proxy, LLC".to_string())
        );
    }

    #[test]
    fn test_name_shadows_org() {
        // Only the name is checked when present, even if the org would match
        let rules = ClassificationRules::new(["Privacy Org"], Vec::<String>::new());
        let record = record_named(Some("Jane Doe"), Some("Privacy Org"));
        assert_eq!(privacy_match(&record, &rules), None);
    }

    #[test]
    fn test_no_identity_goes_to_country() {
        let rules = ClassificationRules::new(["Foo"], ["Ba"]);
        let outcome = classify(&record_named(None, None), &rules);
        assert_eq!(
            outcome,
            Outcome::Succeeded {
                country: Some("US".to_string()),
                nameservers: vec!["ns1.example.test".to_string()],
            }
        );
    }

    #[test]
    fn test_missing_country_is_not_substituted() {
        let mut record = record_named(Some("Jane Doe"), None);
        record.registrant_country = None;
        let outcome = classify(&record, &ClassificationRules::default());
        assert!(matches!(outcome, Outcome::Succeeded { country: None, .. }));
    }

    #[test]
    fn test_normalize_nameservers() {
        let raw = vec![
            "NS1.EXAMPLE.TEST".to_string(),
            " ns2.example.test. ".to_string(),
            "ns1.example.test".to_string(),
            "".to_string(),
        ];
        assert_eq!(
            normalize_nameservers(&raw),
            vec!["ns1.example.test", "ns2.example.test"]
        );

        let single = ["ns1.test"];
        assert_eq!(normalize_nameservers(&single), vec!["ns1.test"]);
    }
}
