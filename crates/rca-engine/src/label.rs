//! Label detector (C12) — resolves canonical label names from a list of
//! configurable alternates (metric stores disagree on whether it's
//! `client`/`caller`/`src_service`), recording any fall-back used in
//! [`Diagnostics`].

use std::collections::HashMap;

use rca_core::Diagnostics;

/// Canonical label name -> ordered list of alternates to try, most
/// preferred first. The canonical name itself is always tried first.
#[derive(Debug, Clone)]
pub struct LabelAlternates {
    alternates: HashMap<String, Vec<String>>,
}

impl LabelAlternates {
    pub fn new() -> Self {
        let mut alternates = HashMap::new();
        alternates.insert(
            "client".to_string(),
            vec!["caller".to_string(), "src_service".to_string(), "source".to_string()],
        );
        alternates.insert(
            "server".to_string(),
            vec!["callee".to_string(), "dst_service".to_string(), "target".to_string()],
        );
        alternates.insert(
            "service".to_string(),
            vec!["service_name".to_string(), "app".to_string()],
        );
        Self { alternates }
    }

    pub fn with_alternate(mut self, canonical: impl Into<String>, alternate: impl Into<String>) -> Self {
        self.alternates
            .entry(canonical.into())
            .or_default()
            .push(alternate.into());
        self
    }
}

impl Default for LabelAlternates {
    fn default() -> Self {
        Self::new()
    }
}

pub struct LabelDetector {
    alternates: LabelAlternates,
}

impl LabelDetector {
    pub fn new(alternates: LabelAlternates) -> Self {
        Self { alternates }
    }

    /// Resolve `canonical` from `labels`, trying the canonical name first
    /// and then each configured alternate in order. Records a diagnostic
    /// whenever the canonical name itself was missing and a fall-back
    /// was required, or when nothing at all resolved.
    pub fn resolve<'a>(
        &self,
        canonical: &str,
        labels: &'a HashMap<String, String>,
        diagnostics: &mut Diagnostics,
    ) -> Option<&'a str> {
        if let Some(v) = labels.get(canonical) {
            return Some(v.as_str());
        }

        if let Some(alts) = self.alternates.alternates.get(canonical) {
            for alt in alts {
                if let Some(v) = labels.get(alt) {
                    diagnostics.add_missing_label(format!(
                        "'{canonical}' missing, resolved via alternate '{alt}'"
                    ));
                    return Some(v.as_str());
                }
            }
        }

        diagnostics.add_missing_label(canonical.to_string());
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_canonical_name_directly() {
        let detector = LabelDetector::new(LabelAlternates::new());
        let mut labels = HashMap::new();
        labels.insert("client".to_string(), "api-gw".to_string());
        let mut diag = Diagnostics::new();

        assert_eq!(detector.resolve("client", &labels, &mut diag), Some("api-gw"));
        assert!(diag.to_notes().is_empty());
    }

    #[test]
    fn falls_back_to_alternate_and_records_diagnostic() {
        let detector = LabelDetector::new(LabelAlternates::new());
        let mut labels = HashMap::new();
        labels.insert("caller".to_string(), "tps".to_string());
        let mut diag = Diagnostics::new();

        assert_eq!(detector.resolve("client", &labels, &mut diag), Some("tps"));
        assert_eq!(diag.to_notes().len(), 1);
    }

    #[test]
    fn missing_entirely_records_missing_label() {
        let detector = LabelDetector::new(LabelAlternates::new());
        let labels = HashMap::new();
        let mut diag = Diagnostics::new();

        assert_eq!(detector.resolve("client", &labels, &mut diag), None);
        assert_eq!(diag.to_notes().len(), 1);
    }
}
