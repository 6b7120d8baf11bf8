//! Tax-rate detection from free text.

use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::document::DocumentSource;
use crate::error::{DetectionError, Result};
use crate::models::config::DetectionConfig;
use crate::models::token::{RateCandidate, TaxAmountHint};

use super::numeric::{parse_decimal_numeral, parse_locale_price};
use super::patterns::tax_amount_regex;
use super::{FieldExtractor, char_window};

const SNIPPET_RADIUS: usize = 30;

struct CompiledPattern {
    regex: Regex,
    jurisdiction: String,
    rank: u32,
    canonical: bool,
}

/// Finds the applicable tax percentage using an ordered pattern table.
pub struct RateDetector {
    patterns: Vec<CompiledPattern>,
    min_rate: Decimal,
    max_rate: Decimal,
    tax_keywords: Vec<String>,
}

impl RateDetector {
    /// Compile the configured pattern table, ordered by rank.
    pub fn from_config(config: &DetectionConfig) -> std::result::Result<Self, DetectionError> {
        let mut patterns = Vec::with_capacity(config.patterns.len());
        for entry in &config.patterns {
            let regex = RegexBuilder::new(&entry.pattern)
                .case_insensitive(entry.case_insensitive)
                .build()
                .map_err(|e| DetectionError::InvalidPattern {
                    pattern: entry.pattern.clone(),
                    reason: e.to_string(),
                })?;
            if regex.captures_len() < 2 {
                return Err(DetectionError::InvalidPattern {
                    pattern: entry.pattern.clone(),
                    reason: "pattern has no capture group for the rate".to_string(),
                });
            }
            patterns.push(CompiledPattern {
                regex,
                jurisdiction: entry.jurisdiction.clone(),
                rank: entry.rank,
                canonical: entry.canonical,
            });
        }
        patterns.sort_by_key(|p| p.rank);

        Ok(Self {
            patterns,
            min_rate: config.min_rate,
            max_rate: config.max_rate,
            tax_keywords: config.tax_keywords.clone(),
        })
    }

    /// Detect the rate in a document's full text.
    pub fn detect(&self, text: &str) -> Option<RateCandidate> {
        self.extract(text)
    }

    /// Detect the rate across all pages of a document.
    pub fn detect_document(&self, doc: &dyn DocumentSource) -> Result<Option<RateCandidate>> {
        let text = doc.full_text()?;
        Ok(self.detect(&text))
    }

    fn is_plausible(&self, rate: Decimal) -> bool {
        rate >= self.min_rate && rate <= self.max_rate
    }

    /// Find the printed tax amount, e.g. "(8,10 % VAT: 240,31)".
    ///
    /// The first page carrying the compound pattern wins. The hint holds every
    /// occurrence of the printed amount on that page.
    pub fn detect_tax_amount(
        &self,
        doc: &dyn DocumentSource,
        rate: Decimal,
    ) -> Result<Option<TaxAmountHint>> {
        let regex = tax_amount_regex(rate, &self.tax_keywords).map_err(|e| {
            DetectionError::InvalidPattern {
                pattern: self.tax_keywords.join("|"),
                reason: e.to_string(),
            }
        })?;

        for page in 0..doc.page_count() {
            let text = doc.page_text(page)?;
            for caps in regex.captures_iter(&text) {
                let Some(amount) = caps.get(1) else { continue };
                let raw = amount.as_str();
                let value = match parse_locale_price(raw) {
                    Ok(value) => value,
                    Err(e) => {
                        trace!("Skipping tax amount candidate: {}", e);
                        continue;
                    }
                };

                let rects = doc.search_text(page, raw)?;
                debug!("Tax amount {} found on page {} ({} occurrences)", value, page, rects.len());
                return Ok(Some(TaxAmountHint {
                    page,
                    value,
                    raw_text: raw.to_string(),
                    rects,
                }));
            }
        }

        Ok(None)
    }
}

impl FieldExtractor for RateDetector {
    type Output = RateCandidate;

    /// Canonical candidates win by document position; otherwise the first
    /// candidate in pattern order, then document order.
    fn extract(&self, text: &str) -> Option<Self::Output> {
        let candidates = self.extract_all(text);

        let canonical = candidates
            .iter()
            .filter(|c| c.canonical)
            .min_by_key(|c| c.position)
            .cloned();

        canonical.or_else(|| candidates.into_iter().next())
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for pattern in &self.patterns {
            for caps in pattern.regex.captures_iter(text) {
                let Some(numeral) = caps.get(1) else { continue };

                // "VAT: 1.234,56" captures "1.234", which is an amount.
                let rest = &text[numeral.end()..];
                let mut rest_chars = rest.chars();
                if matches!(
                    (rest_chars.next(), rest_chars.next()),
                    (Some('.' | ','), Some(d)) if d.is_ascii_digit()
                ) {
                    trace!("Skipping truncated amount {:?}", numeral.as_str());
                    continue;
                }

                let value = match parse_decimal_numeral(numeral.as_str()) {
                    Ok(value) => value,
                    Err(e) => {
                        trace!("Skipping rate numeral: {}", e);
                        continue;
                    }
                };
                if !self.is_plausible(value) {
                    debug!("Discarding implausible rate {} ({})", value, pattern.jurisdiction);
                    continue;
                }

                let full_match = caps.get(0).map_or(numeral, |m| m);
                let (before, after) =
                    char_window(text, full_match.start(), full_match.end(), SNIPPET_RADIUS);
                let snippet = format!("{}{}{}", before, full_match.as_str(), after);

                results.push(RateCandidate {
                    value,
                    source_pattern_rank: pattern.rank,
                    jurisdiction: pattern.jurisdiction.clone(),
                    canonical: pattern.canonical,
                    position: full_match.start(),
                    context_snippet: snippet.trim().to_string(),
                });
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{LayoutBlock, LayoutDocument, LayoutPage};
    use crate::models::config::RatePattern;
    use crate::models::geometry::Point;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn detector() -> RateDetector {
        RateDetector::from_config(&DetectionConfig::default()).unwrap()
    }

    #[test]
    fn test_detect_rate_then_label() {
        let candidate = detector().detect("Total (8,10 % VAT: 240,31)").unwrap();
        assert_eq!(candidate.value, d("8.10"));
        assert!(candidate.canonical);
        assert_eq!(candidate.jurisdiction, "EU");
    }

    #[test]
    fn test_detect_with_single_label_pattern() {
        let config = DetectionConfig {
            patterns: vec![RatePattern::new(r"VAT[:\s]*(\d+([,.]\d+)?)", "EU", 0, true)],
            ..DetectionConfig::default()
        };
        let detector = RateDetector::from_config(&config).unwrap();
        let text = "(8,10 % VAT: 240,31)";

        // "240,31" is out of range, no rate follows the label.
        assert!(detector.detect(text).is_none());

        let doc = LayoutDocument::new(vec![
            LayoutPage::new(600.0, 800.0)
                .with_block(LayoutBlock::line(text, Point::new(50.0, 100.0), 5.0, 10.0)),
        ]);
        let hint = detector.detect_tax_amount(&doc, d("8.10")).unwrap().unwrap();
        assert_eq!(hint.value, d("240.31"));
        assert_eq!(hint.page, 0);
        assert_eq!(hint.rects.len(), 1);
    }

    #[test]
    fn test_canonical_candidate_wins() {
        let text = "MwSt 7,7\nUmsatz 19 % VAT";
        let candidate = detector().detect(text).unwrap();
        assert_eq!(candidate.value, d("19"));
    }

    #[test]
    fn test_fallback_uses_pattern_order() {
        let text = "IVA 22\nMwSt 7,7";
        let candidate = detector().detect(text).unwrap();
        // MwSt ranks before IVA.
        assert_eq!(candidate.value, d("7.7"));
        assert_eq!(candidate.jurisdiction, "DACH");
    }

    #[test]
    fn test_out_of_range_rates_are_discarded() {
        let detector = detector();
        assert!(detector.detect("VAT 45").is_none());
        let all = detector.extract_all("VAT 45 and 12 % VAT");
        assert!(all.iter().all(|c| c.value >= Decimal::ZERO && c.value <= d("30")));
    }

    #[test]
    fn test_truncated_amount_is_not_a_rate() {
        let detector = detector();
        assert!(detector.detect("VAT: 1.234,56").is_none());
        assert_eq!(detector.detect("VAT 7.7 %").unwrap().value, d("7.7"));
    }

    #[test]
    fn test_no_rate() {
        assert!(detector().detect("Invoice 2024-001\nTotal 1.540,00").is_none());
    }

    #[test]
    fn test_invalid_pattern() {
        let config = DetectionConfig {
            patterns: vec![RatePattern::new(r"VAT(", "EU", 0, true)],
            ..DetectionConfig::default()
        };
        assert!(matches!(
            RateDetector::from_config(&config),
            Err(DetectionError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_tax_amount_absent() {
        let doc = LayoutDocument::new(vec![
            LayoutPage::new(600.0, 800.0)
                .with_block(LayoutBlock::line("Total 1.540,00", Point::new(50.0, 100.0), 5.0, 10.0)),
        ]);
        assert!(detector().detect_tax_amount(&doc, d("8.1")).unwrap().is_none());
    }
}
