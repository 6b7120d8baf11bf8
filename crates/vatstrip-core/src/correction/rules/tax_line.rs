//! Separates the tax-amount line from ordinary taxable prices.

use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::document::{DocumentSource, Result};
use crate::error::DetectionError;
use crate::models::config::ClassificationConfig;
use crate::models::geometry::Rect;
use crate::models::token::{ClassifiedToken, PriceToken, TaxAmountHint};

use super::patterns::{rate_label_regex, rate_regex};

/// Decides which tokens show the tax amount itself.
pub struct TaxLineClassifier {
    config: ClassificationConfig,
    tax_keywords: Vec<String>,
    label: Regex,
    rate: Regex,
}

impl TaxLineClassifier {
    /// Build a classifier for the detected `rate`.
    pub fn new(
        config: &ClassificationConfig,
        rate: Decimal,
        tax_keywords: &[String],
    ) -> std::result::Result<Self, DetectionError> {
        let invalid = |e: regex::Error| DetectionError::InvalidPattern {
            pattern: tax_keywords.join("|"),
            reason: e.to_string(),
        };

        Ok(Self {
            config: config.clone(),
            tax_keywords: tax_keywords.to_vec(),
            label: rate_label_regex(rate, tax_keywords).map_err(invalid)?,
            rate: rate_regex(rate).map_err(invalid)?,
        })
    }

    /// Classify every token, keeping their order.
    pub fn classify(
        &self,
        doc: &dyn DocumentSource,
        tokens: Vec<PriceToken>,
        hint: Option<&TaxAmountHint>,
    ) -> Result<Vec<ClassifiedToken>> {
        tokens
            .into_iter()
            .map(|token| {
                let is_tax_amount_line = self.is_tax_amount_line(doc, &token, hint)?;
                Ok(ClassifiedToken {
                    token,
                    is_tax_amount_line,
                })
            })
            .collect()
    }

    /// A token is the tax line when it equals the printed tax amount, or when
    /// it is a small amount sitting next to the rate and tax label.
    pub fn is_tax_amount_line(
        &self,
        doc: &dyn DocumentSource,
        token: &PriceToken,
        hint: Option<&TaxAmountHint>,
    ) -> Result<bool> {
        if hint.is_some_and(|h| h.matches(token, self.config.amount_tolerance)) {
            debug!("{} on page {} matches the printed tax amount", token.raw_text, token.page);
            return Ok(true);
        }

        if token.numeric_value >= self.config.tax_amount_ceiling {
            return Ok(false);
        }

        let neighbourhood = token
            .bounding_rect
            .expand_by(
                self.config.neighborhood_dx,
                self.config.neighborhood_dy,
                self.config.neighborhood_dx,
                self.config.neighborhood_dy,
            );
        let nearby = doc.search_text_in_region(token.page, neighbourhood)?;
        let near_label = self.label.is_match(&nearby);
        if near_label {
            debug!("{} on page {} sits next to the tax label", token.raw_text, token.page);
        }
        Ok(near_label)
    }

    /// The first tax keyword on `page` that has the detected rate printed
    /// around it, e.g. "VAT" in "(8,10 % VAT: 240,31)".
    pub fn find_tax_label(&self, doc: &dyn DocumentSource, page: usize) -> Result<Option<Rect>> {
        for keyword in &self.tax_keywords {
            for rect in doc.search_text(page, keyword)? {
                let window = rect.expand_by(
                    self.config.label_search_left,
                    self.config.label_search_dy,
                    self.config.label_search_right,
                    self.config.label_search_dy,
                );
                if self.rate.is_match(&doc.search_text_in_region(page, window)?) {
                    return Ok(Some(rect));
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{LayoutBlock, LayoutDocument, LayoutPage};
    use crate::models::geometry::Point;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn keywords() -> Vec<String> {
        vec!["VAT".to_string(), "MwSt".to_string()]
    }

    fn classifier() -> TaxLineClassifier {
        TaxLineClassifier::new(&ClassificationConfig::default(), d("8.1"), &keywords()).unwrap()
    }

    fn invoice() -> LayoutDocument {
        LayoutDocument::new(vec![
            LayoutPage::new(600.0, 800.0)
                .with_block(LayoutBlock::line("Consulting 2.724,39", Point::new(50.0, 100.0), 5.0, 10.0))
                .with_block(LayoutBlock::line("(8,10 % VAT: 240,31)", Point::new(50.0, 200.0), 5.0, 10.0))
                .with_block(LayoutBlock::line("Total 2.964,70", Point::new(50.0, 220.0), 5.0, 10.0))
                .with_block(LayoutBlock::line("Shipping 45,00", Point::new(50.0, 400.0), 5.0, 10.0)),
        ])
    }

    fn token(doc: &LayoutDocument, raw: &str) -> PriceToken {
        let rect = doc.search_text(0, raw).unwrap()[0];
        PriceToken {
            page: 0,
            raw_text: raw.to_string(),
            numeric_value: crate::correction::rules::parse_locale_price(raw).unwrap(),
            anchor_baseline: rect.baseline_anchor(),
            bounding_rect: rect,
        }
    }

    #[test]
    fn test_hint_match() {
        let doc = invoice();
        let hint = TaxAmountHint {
            page: 0,
            value: d("240.31"),
            raw_text: "240,31".to_string(),
            rects: doc.search_text(0, "240,31").unwrap(),
        };
        let classifier = classifier();

        assert!(classifier.is_tax_amount_line(&doc, &token(&doc, "240,31"), Some(&hint)).unwrap());
        assert!(!classifier.is_tax_amount_line(&doc, &token(&doc, "45,00"), Some(&hint)).unwrap());
    }

    #[test]
    fn test_neighbourhood_without_hint() {
        let doc = invoice();
        let classifier = classifier();

        assert!(classifier.is_tax_amount_line(&doc, &token(&doc, "240,31"), None).unwrap());
        // Next to the label but above the ceiling.
        assert!(!classifier.is_tax_amount_line(&doc, &token(&doc, "2.964,70"), None).unwrap());
        assert!(!classifier.is_tax_amount_line(&doc, &token(&doc, "2.724,39"), None).unwrap());
        assert!(!classifier.is_tax_amount_line(&doc, &token(&doc, "45,00"), None).unwrap());
    }

    #[test]
    fn test_classify_keeps_order() {
        let doc = invoice();
        let tokens = vec![token(&doc, "2.724,39"), token(&doc, "240,31"), token(&doc, "2.964,70")];
        let classified = classifier().classify(&doc, tokens, None).unwrap();

        let flags: Vec<bool> = classified.iter().map(|c| c.is_tax_amount_line).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn test_find_tax_label() {
        let doc = invoice();
        let label = classifier().find_tax_label(&doc, 0).unwrap().unwrap();
        // "(8,10 % " is 8 characters.
        assert_eq!(label, Rect::new(90.0, 200.0, 105.0, 210.0));
    }

    #[test]
    fn test_label_with_other_rate_is_ignored() {
        let doc = LayoutDocument::new(vec![
            LayoutPage::new(600.0, 800.0)
                .with_block(LayoutBlock::line("(19 % MwSt: 45,00)", Point::new(50.0, 200.0), 5.0, 10.0)),
        ]);
        let classifier = classifier();
        assert!(classifier.find_tax_label(&doc, 0).unwrap().is_none());
        assert!(!classifier.is_tax_amount_line(&doc, &token(&doc, "45,00"), None).unwrap());
    }

    #[test]
    fn test_label_with_longer_rate_is_ignored() {
        // "8,15" starts like "8,1" but is a different rate.
        let doc = LayoutDocument::new(vec![
            LayoutPage::new(600.0, 800.0)
                .with_block(LayoutBlock::line("(8,15 % VAT: 12,00)", Point::new(50.0, 200.0), 5.0, 10.0)),
        ]);
        assert!(classifier().find_tax_label(&doc, 0).unwrap().is_none());
    }
}
