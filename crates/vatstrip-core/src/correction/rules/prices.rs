//! Monetary token extraction with false-positive suppression.

use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::document::{DocumentSource, Result};
use crate::models::config::ExtractionConfig;
use crate::models::geometry::Rect;
use crate::models::token::PriceToken;

use super::numeric::{parse_decimal_numeral, parse_locale_price};
use super::patterns::{DATE_GRAMMAR, PRICE_GRAMMAR, SHORT_DATE_HEAD};
use super::{FieldExtractor, char_window};

/// An amount that survived the text-level exclusion rules.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMatch {
    /// Amount as printed.
    pub raw_text: String,
    pub value: Decimal,
    /// Byte range in the scanned text.
    pub start: usize,
    pub end: usize,
}

/// Why a grammar match was not accepted as a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Date,
    ShortDate,
    Unparseable,
    OutOfRange,
    Percentage,
    Discount,
}

/// Finds monetary amounts on document pages.
pub struct PriceTokenExtractor {
    config: ExtractionConfig,
}

impl PriceTokenExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Extract tokens from every page, in page order.
    pub fn extract_document(&self, doc: &dyn DocumentSource) -> Result<Vec<PriceToken>> {
        let mut tokens = Vec::new();
        for page in 0..doc.page_count() {
            tokens.extend(self.extract_page(doc, page)?);
        }
        Ok(tokens)
    }

    /// Extract tokens from one page.
    ///
    /// Each accepted amount is located with the page's text search; every
    /// visual occurrence becomes a token unless it lies within the dedup
    /// proximity of a token already emitted on this page.
    pub fn extract_page(&self, doc: &dyn DocumentSource, page: usize) -> Result<Vec<PriceToken>> {
        let mut tokens: Vec<PriceToken> = Vec::new();

        for block in doc.page_text_blocks(page)? {
            if !block.kind.is_text() {
                continue;
            }

            for found in self.extract_all(&block.text) {
                for rect in doc.search_text(page, &found.raw_text)? {
                    if tokens
                        .iter()
                        .any(|t| t.bounding_rect.is_near(&rect, self.config.dedup_proximity))
                    {
                        trace!("Duplicate occurrence of {} on page {}", found.raw_text, page);
                        continue;
                    }
                    if !is_standalone(doc, page, rect, &found.raw_text)? {
                        trace!("{} is part of a longer number on page {}", found.raw_text, page);
                        continue;
                    }

                    debug!("Price {} on page {} at ({}, {})", found.raw_text, page, rect.x0, rect.y0);
                    tokens.push(PriceToken {
                        page,
                        raw_text: found.raw_text.clone(),
                        numeric_value: found.value,
                        anchor_baseline: rect.baseline_anchor(),
                        bounding_rect: rect,
                    });
                }
            }
        }

        Ok(tokens)
    }

    fn check(&self, text: &str, start: usize, end: usize) -> std::result::Result<Decimal, Rejection> {
        let raw = &text[start..end];

        if DATE_GRAMMAR
            .find_iter(text)
            .any(|date| date.start() < end && start < date.end())
        {
            return Err(Rejection::Date);
        }

        if self.is_short_date(text, start, raw) {
            return Err(Rejection::ShortDate);
        }

        let value = parse_locale_price(raw).map_err(|e| {
            trace!("Skipping price candidate: {}", e);
            Rejection::Unparseable
        })?;

        if value < self.config.min_price || value > self.config.max_price {
            return Err(Rejection::OutOfRange);
        }

        // Larger amounts are kept even when a rate follows, e.g. a total
        // printed just above "(8,10 % VAT: ...)".
        if value < self.config.discount_ceiling {
            let (_, lookahead) = char_window(text, start, end, self.config.percent_lookahead);
            if lookahead.contains('%') {
                return Err(Rejection::Percentage);
            }
            if self.is_discount(text, start, end) {
                return Err(Rejection::Discount);
            }
        }

        Ok(value)
    }

    /// "12.05,50" yields the match "05,50"; a "12.05" head below the ceiling is a date.
    fn is_short_date(&self, text: &str, start: usize, raw: &str) -> bool {
        let Some(caps) = SHORT_DATE_HEAD.captures(&text[..start]) else {
            return false;
        };
        let Some((integer, _)) = raw.split_once(',') else {
            return false;
        };
        if integer.len() != 2 {
            return false;
        }

        parse_decimal_numeral(&format!("{}.{}", &caps[1], integer))
            .map(|head| head < self.config.short_date_ceiling)
            .unwrap_or(false)
    }

    fn is_discount(&self, text: &str, start: usize, end: usize) -> bool {
        let (before, after) = char_window(text, start, end, self.config.context_radius);
        let window = format!("{}{}", before, after).to_lowercase();

        let has_keyword = self
            .config
            .discount_keywords
            .iter()
            .any(|k| window.contains(&k.to_lowercase()));
        if !has_keyword {
            return false;
        }

        window.contains('%') || before.trim_end().ends_with('-')
    }
}

impl FieldExtractor for PriceTokenExtractor {
    type Output = PriceMatch;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        PRICE_GRAMMAR
            .find_iter(text)
            .filter_map(|m| match self.check(text, m.start(), m.end()) {
                Ok(value) => Some(PriceMatch {
                    raw_text: m.as_str().to_string(),
                    value,
                    start: m.start(),
                    end: m.end(),
                }),
                Err(reason) => {
                    trace!("Rejected {:?}: {:?}", m.as_str(), reason);
                    None
                }
            })
            .collect()
    }
}

/// Whether the occurrence at `rect` is the whole number rather than the tail
/// or head of a longer one ("40,00" inside "1.540,00").
fn is_standalone(doc: &dyn DocumentSource, page: usize, rect: Rect, raw: &str) -> Result<bool> {
    let chars = raw.chars().count().max(1) as f32;
    let char_width = rect.width() / chars;
    let quarter = rect.height() * 0.25;
    let margin = rect.expand_by(char_width, -quarter, char_width, -quarter);

    let region = doc.search_text_in_region(page, margin)?;
    let Some(at) = region.find(raw) else {
        return Ok(true);
    };

    let previous = region[..at].chars().next_back();
    let next = region[at + raw.len()..].chars().next();
    let joined_before = matches!(previous, Some(c) if c.is_ascii_digit() || c == '.' || c == ',');
    let joined_after = matches!(next, Some(c) if c.is_ascii_digit());

    Ok(!joined_before && !joined_after)
}
