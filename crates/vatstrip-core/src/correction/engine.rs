//! The correction pipeline for one document.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::document::{DocumentSource, DrawingBackend};
use crate::error::{DetectionError, Result};
use crate::models::config::VatstripConfig;
use crate::models::plan::{CorrectionSummary, OverlayPlan};
use crate::models::token::{ClassifiedToken, RateCandidate};

use super::compositor::{ApplyReport, Compositor};
use super::planner::OverlayPlanner;
use super::rules::{GeometryAnchor, PriceTokenExtractor, RateDetector, TaxLineClassifier};

/// Non-fatal outcomes worth telling the caller about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionWarning {
    /// A rate was found but no amount survived extraction.
    NoPricesFound,
}

/// Everything produced for one document.
#[derive(Debug, Clone, Serialize)]
pub struct CorrectionReport {
    pub summary: CorrectionSummary,
    pub rate: RateCandidate,
    pub tokens: Vec<ClassifiedToken>,
    pub plan: OverlayPlan,
    pub warnings: Vec<CorrectionWarning>,
    pub processing_time_ms: u64,
}

impl CorrectionReport {
    pub fn has_warning(&self, warning: &CorrectionWarning) -> bool {
        self.warnings.contains(warning)
    }
}

/// Detects the rate, finds the prices and plans the edits.
///
/// The engine holds configuration and compiled patterns only; every call to
/// [`CorrectionEngine::process`] owns its own intermediate data.
pub struct CorrectionEngine {
    config: VatstripConfig,
    detector: RateDetector,
    extractor: PriceTokenExtractor,
    planner: OverlayPlanner,
    compositor: Compositor,
}

impl CorrectionEngine {
    pub fn new(config: VatstripConfig) -> Result<Self> {
        let detector = RateDetector::from_config(&config.detection)?;
        let extractor = PriceTokenExtractor::new(&config.extraction);
        let planner = OverlayPlanner::new(&config.overlay);
        let compositor = Compositor::new(&config.overlay.glyph_fallbacks);

        Ok(Self {
            config,
            detector,
            extractor,
            planner,
            compositor,
        })
    }

    pub fn config(&self) -> &VatstripConfig {
        &self.config
    }

    /// Rate detection only.
    pub fn detect_rate(&self, doc: &dyn DocumentSource) -> Result<RateCandidate> {
        match self.detector.detect_document(doc)? {
            Some(candidate) => Ok(candidate),
            None => {
                warn!("No plausible tax rate in document");
                Err(DetectionError::RateNotDetected.into())
            }
        }
    }

    /// Run the full pipeline and return the edit plan.
    ///
    /// Fails with [`DetectionError::RateNotDetected`] before any plan is built
    /// when the document carries no plausible rate.
    pub fn process(&self, doc: &dyn DocumentSource) -> Result<CorrectionReport> {
        let start = Instant::now();

        let candidate = self.detect_rate(doc)?;
        let rate = candidate.value;
        info!(
            "Detected rate {} % ({}, pattern rank {})",
            rate, candidate.jurisdiction, candidate.source_pattern_rank
        );

        let hint = self.detector.detect_tax_amount(doc, rate)?;
        if let Some(hint) = &hint {
            debug!("Printed tax amount {} on page {}", hint.value, hint.page);
        }

        let tokens = self.extractor.extract_document(doc)?;
        info!("Found {} price tokens on {} pages", tokens.len(), doc.page_count());

        let mut warnings = Vec::new();
        if tokens.is_empty() {
            warn!("Rate {} detected but no prices found", rate);
            warnings.push(CorrectionWarning::NoPricesFound);
        }

        let classifier = TaxLineClassifier::new(
            &self.config.classification,
            rate,
            &self.config.detection.tax_keywords,
        )?;
        let classified = classifier.classify(doc, tokens, hint.as_ref())?;

        let planned = self.planner.plan(rate, &classified);
        let mut plan = planned.plan;

        if self.config.overlay.highlight_labels {
            for page in 0..doc.page_count() {
                if let Some(label) = classifier.find_tax_label(doc, page)? {
                    self.planner.add_label_highlight(&mut plan, page, label);
                }
            }
        }

        if self.config.overlay.info_box.enabled && !classified.is_empty() {
            let anchor = GeometryAnchor::from_config(&self.config.overlay.info_box).locate(doc);
            self.planner
                .add_info_box(&mut plan, anchor, rate, planned.corrected_total);
        }

        let known = self.config.detection.country_for(rate);
        let summary = CorrectionSummary {
            detected_rate_percent: rate,
            country_code: known.map(|k| k.country_code.clone()),
            country_name: known.map(|k| k.country_name.clone()),
            price_count: planned.price_count,
            prior_total: planned.prior_total,
            corrected_total: planned.corrected_total,
            tax_amount: hint.map(|h| h.value),
        };

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Planned {} highlights and {} overlays in {}ms",
            plan.highlights.len(),
            plan.overlays.len(),
            processing_time_ms
        );

        Ok(CorrectionReport {
            summary,
            rate: candidate,
            tokens: classified,
            plan,
            warnings,
            processing_time_ms,
        })
    }

    /// Hand a plan to a drawing backend.
    pub fn apply(&self, plan: &OverlayPlan, backend: &mut dyn DrawingBackend) -> Result<ApplyReport> {
        Ok(self.compositor.apply(plan, backend)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correction::compositor::tests::RecordingBackend;
    use crate::document::{LayoutBlock, LayoutDocument, LayoutPage};
    use crate::error::VatstripError;
    use crate::models::geometry::Point;
    use crate::models::plan::EditOp;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(text: &str, x: f32, y: f32) -> LayoutBlock {
        LayoutBlock::line(text, Point::new(x, y), 5.0, 10.0)
    }

    fn swiss_invoice() -> LayoutDocument {
        LayoutDocument::new(vec![
            LayoutPage::new(595.0, 842.0)
                .with_block(line("Invoice 2024-117   Date 27.10.2024", 50.0, 60.0))
                .with_block(line("Consulting 2.724,39", 50.0, 300.0))
                .with_block(line("Rabatt 5 % -120,00", 50.0, 320.0))
                .with_block(line("(8,10 % VAT: 240,31)", 50.0, 500.0))
                .with_block(line("Total 2.964,70", 50.0, 520.0)),
        ])
    }

    fn engine() -> CorrectionEngine {
        CorrectionEngine::new(VatstripConfig::default()).unwrap()
    }

    #[test]
    fn test_process_invoice() {
        let report = engine().process(&swiss_invoice()).unwrap();

        assert_eq!(report.summary.detected_rate_percent, d("8.10"));
        assert_eq!(report.summary.country_code.as_deref(), Some("CH"));
        assert_eq!(report.summary.tax_amount, Some(d("240.31")));

        let raw: Vec<&str> = report.tokens.iter().map(|c| c.token.raw_text.as_str()).collect();
        assert_eq!(raw, vec!["2.724,39", "120,00", "240,31", "2.964,70"]);

        let tax_lines: Vec<&str> = report
            .tokens
            .iter()
            .filter(|c| c.is_tax_amount_line)
            .map(|c| c.token.raw_text.as_str())
            .collect();
        assert_eq!(tax_lines, vec!["240,31"]);

        assert_eq!(report.summary.price_count, 4);
        assert_eq!(report.summary.prior_total, d("6049.40"));
        // 2520.25 + 111.01 + 222.30 + 2742.55
        assert_eq!(report.summary.corrected_total, d("5596.11"));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_plan_shape() {
        let report = engine().process(&swiss_invoice()).unwrap();

        // Four tokens plus the tax label.
        assert_eq!(report.plan.highlights.len(), 5);
        assert_eq!(report.plan.overlays.len(), 3);

        let overlay_texts: Vec<&str> = report
            .plan
            .overlays
            .iter()
            .filter_map(|op| match op {
                EditOp::TextOverlay { text, .. } => Some(text.as_str()),
                EditOp::Highlight { .. } => None,
            })
            .collect();
        assert_eq!(overlay_texts, vec!["2520,25", "111,01", "2742,55"]);
    }

    #[test]
    fn test_rate_not_detected_halts() {
        let doc = LayoutDocument::new(vec![
            LayoutPage::new(595.0, 842.0).with_block(line("Total 1.540,00", 50.0, 100.0)),
        ]);
        assert!(matches!(
            engine().process(&doc),
            Err(VatstripError::Detection(DetectionError::RateNotDetected))
        ));
    }

    #[test]
    fn test_no_prices_is_a_warning() {
        let doc = LayoutDocument::new(vec![
            LayoutPage::new(595.0, 842.0).with_block(line("All prices incl. 19 % VAT", 50.0, 100.0)),
        ]);
        let report = engine().process(&doc).unwrap();

        assert!(report.has_warning(&CorrectionWarning::NoPricesFound));
        assert_eq!(report.summary.price_count, 0);
        assert_eq!(report.summary.corrected_total, Decimal::ZERO);
        assert!(report.plan.overlays.is_empty());
    }

    #[test]
    fn test_multi_page_order_and_info_box() {
        let mut config = VatstripConfig::default();
        config.overlay.info_box.enabled = true;
        config.overlay.highlight_labels = false;
        let doc = LayoutDocument::new(vec![
            LayoutPage::new(595.0, 842.0)
                .with_block(line("Widget 119,00", 50.0, 100.0))
                .with_block(line("MwSt 19 % included", 50.0, 400.0))
                .with_block(line("Total 119,00", 50.0, 700.0)),
            LayoutPage::new(595.0, 842.0).with_block(line("Carry-over 1.190,00", 50.0, 100.0)),
        ]);
        let report = CorrectionEngine::new(config).unwrap().process(&doc).unwrap();

        let pages: Vec<usize> = report.tokens.iter().map(|c| c.token.page).collect();
        assert_eq!(pages, vec![0, 0, 1]);
        assert_eq!(report.summary.country_code.as_deref(), Some("DE"));

        // Info box sits 24 units above the "Total" row.
        let last = report.plan.overlays.last().unwrap();
        assert!(matches!(
            last,
            EditOp::TextOverlay { page: 0, text, .. } if text == "Net total: 1.200,00"
        ));
        assert!(matches!(
            report.plan.highlights.last().unwrap(),
            EditOp::Highlight { page: 0, rect, .. } if rect.y0 == 700.0 - 24.0 - 2.0
        ));
    }

    #[test]
    fn test_apply_report() {
        let engine = engine();
        let report = engine.process(&swiss_invoice()).unwrap();
        let mut backend = RecordingBackend::default();
        let applied = engine.apply(&report.plan, &mut backend).unwrap();

        assert_eq!(applied.highlights_drawn, 5);
        assert_eq!(applied.overlays_drawn, 3);
        let first_text = backend.calls.iter().position(|c| c.starts_with("text")).unwrap();
        assert!(backend.calls[..first_text].iter().all(|c| c.starts_with("rect")));
        assert!(backend.calls[first_text..].iter().all(|c| c.starts_with("text")));
    }

    #[test]
    fn test_runs_are_independent() {
        let engine = engine();
        let first = engine.process(&swiss_invoice()).unwrap();
        let second = engine.process(&swiss_invoice()).unwrap();
        assert_eq!(first.summary, second.summary);
        assert_eq!(first.plan, second.plan);
    }
}
