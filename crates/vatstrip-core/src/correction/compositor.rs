//! Applies an edit plan to a drawing backend.

use serde::Serialize;
use tracing::{debug, warn};

use crate::document::{DrawingBackend, Result};
use crate::error::BackendError;
use crate::models::config::GlyphFallback;
use crate::models::plan::{EditOp, OverlayPlan};

/// An overlay that could not be drawn even with the currency-code fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayFailure {
    pub page: usize,
    pub text: String,
    pub reason: String,
}

/// Outcome of applying a plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplyReport {
    pub highlights_drawn: usize,
    pub overlays_drawn: usize,
    /// Overlays drawn only after substituting currency codes.
    pub substituted: usize,
    pub failures: Vec<OverlayFailure>,
}

/// Paints highlights first, then overlays.
pub struct Compositor {
    fallbacks: Vec<GlyphFallback>,
}

impl Compositor {
    pub fn new(fallbacks: &[GlyphFallback]) -> Self {
        Self {
            fallbacks: fallbacks.to_vec(),
        }
    }

    /// Apply every operation in plan order.
    ///
    /// A glyph failure is retried once with currency symbols replaced by their
    /// codes; if that fails too the overlay is reported and skipped. Any other
    /// backend error stops the run.
    pub fn apply(&self, plan: &OverlayPlan, backend: &mut dyn DrawingBackend) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();

        for op in plan.ops() {
            match op {
                EditOp::Highlight { page, rect, fill } => {
                    backend.draw_rect(*page, *rect, *fill)?;
                    report.highlights_drawn += 1;
                }
                EditOp::TextOverlay {
                    page,
                    position,
                    text,
                    font_size,
                } => match backend.insert_text(*page, *position, text, *font_size) {
                    Ok(()) => report.overlays_drawn += 1,
                    Err(BackendError::GlyphRender { reason, .. }) => {
                        debug!("Cannot render {:?} ({}), retrying with currency codes", text, reason);
                        let fallback = self.substitute(text);
                        let retry = if fallback == *text {
                            Err(BackendError::GlyphRender {
                                text: text.clone(),
                                reason,
                            })
                        } else {
                            backend.insert_text(*page, *position, &fallback, *font_size)
                        };

                        match retry {
                            Ok(()) => {
                                report.overlays_drawn += 1;
                                report.substituted += 1;
                            }
                            Err(BackendError::GlyphRender { reason, .. }) => {
                                warn!("Overlay {:?} on page {} skipped: {}", text, page, reason);
                                report.failures.push(OverlayFailure {
                                    page: *page,
                                    text: text.clone(),
                                    reason,
                                });
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    Err(e) => return Err(e),
                },
            }
        }

        Ok(report)
    }

    fn substitute(&self, text: &str) -> String {
        self.fallbacks
            .iter()
            .fold(text.to_string(), |acc, f| acc.replace(&f.symbol, &f.code))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::geometry::{Point, Rect};
    use crate::models::plan::Rgb;
    use pretty_assertions::assert_eq;

    /// Records drawing calls; refuses text containing any of `unsupported`.
    #[derive(Default)]
    pub(crate) struct RecordingBackend {
        pub calls: Vec<String>,
        pub unsupported: Vec<char>,
        pub fail_page: Option<usize>,
    }

    impl DrawingBackend for RecordingBackend {
        fn draw_rect(&mut self, page: usize, rect: Rect, _fill: Rgb) -> Result<()> {
            if self.fail_page == Some(page) {
                return Err(BackendError::InvalidPage(page));
            }
            self.calls.push(format!("rect {} {} {}", page, rect.x0, rect.y0));
            Ok(())
        }

        fn insert_text(&mut self, page: usize, _position: Point, text: &str, _font_size: f32) -> Result<()> {
            if let Some(c) = text.chars().find(|c| self.unsupported.contains(c)) {
                return Err(BackendError::GlyphRender {
                    text: text.to_string(),
                    reason: format!("no glyph for {:?}", c),
                });
            }
            self.calls.push(format!("text {} {}", page, text));
            Ok(())
        }
    }

    fn plan(texts: &[&str]) -> OverlayPlan {
        let mut plan = OverlayPlan::default();
        for (i, text) in texts.iter().enumerate() {
            let y = 100.0 + 20.0 * i as f32;
            plan.overlays.push(EditOp::TextOverlay {
                page: 0,
                position: Point::new(85.0, y + 9.0),
                text: text.to_string(),
                font_size: 8.0,
            });
            plan.highlights.push(EditOp::Highlight {
                page: 0,
                rect: Rect::new(83.0, y, 127.0, y + 12.0),
                fill: Rgb::LIGHT_YELLOW,
            });
        }
        plan
    }

    fn compositor() -> Compositor {
        Compositor::new(&[GlyphFallback::new("€", "EUR")])
    }

    #[test]
    fn test_highlights_before_text() {
        let mut backend = RecordingBackend::default();
        let report = compositor().apply(&plan(&["1424,61", "92,41"]), &mut backend).unwrap();

        assert_eq!(
            backend.calls,
            vec!["rect 0 83 100", "rect 0 83 120", "text 0 1424,61", "text 0 92,41"]
        );
        assert_eq!(report.highlights_drawn, 2);
        assert_eq!(report.overlays_drawn, 2);
    }

    #[test]
    fn test_text_is_not_substituted_preemptively() {
        let mut backend = RecordingBackend::default();
        compositor().apply(&plan(&["1424,61 €"]), &mut backend).unwrap();
        assert_eq!(backend.calls.last().unwrap(), "text 0 1424,61 €");
    }

    #[test]
    fn test_glyph_fallback() {
        let mut backend = RecordingBackend {
            unsupported: vec!['€'],
            ..Default::default()
        };
        let report = compositor().apply(&plan(&["1424,61 €"]), &mut backend).unwrap();

        assert_eq!(backend.calls.last().unwrap(), "text 0 1424,61 EUR");
        assert_eq!(report.substituted, 1);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_failed_fallback_is_reported_and_run_continues() {
        let mut backend = RecordingBackend {
            unsupported: vec!['¤'],
            ..Default::default()
        };
        let report = compositor()
            .apply(&plan(&["1424,61 ¤", "92,41"]), &mut backend)
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].text, "1424,61 ¤");
        assert_eq!(report.overlays_drawn, 1);
        assert_eq!(backend.calls.last().unwrap(), "text 0 92,41");
    }

    #[test]
    fn test_other_errors_propagate() {
        let mut backend = RecordingBackend {
            fail_page: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            compositor().apply(&plan(&["1424,61"]), &mut backend),
            Err(BackendError::InvalidPage(0))
        ));
    }
}
