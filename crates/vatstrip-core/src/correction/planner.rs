//! Turns classified tokens into a two-layer edit plan.

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::config::OverlayConfig;
use crate::models::geometry::{Point, Rect};
use crate::models::plan::{EditOp, OverlayPlan};
use crate::models::token::ClassifiedToken;

use super::rules::numeric::{format_locale_grouped, format_locale_price, remove_tax};

/// Plan plus the totals accumulated while building it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlannedCorrection {
    pub plan: OverlayPlan,
    pub price_count: usize,
    /// Sum of the tax-inclusive amounts.
    pub prior_total: Decimal,
    /// Sum of the corrected amounts.
    pub corrected_total: Decimal,
}

/// Builds highlight and overlay operations.
pub struct OverlayPlanner {
    config: OverlayConfig,
}

impl OverlayPlanner {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// `round(value / (1 + rate / 100), 2)`.
    pub fn corrected_value(&self, value: Decimal, rate: Decimal) -> Decimal {
        remove_tax(value, rate)
    }

    /// Overlay text for a corrected amount, with the currency symbol if configured.
    pub fn overlay_text(&self, corrected: Decimal) -> String {
        let amount = format_locale_price(corrected);
        match self.config.currency_symbol.as_deref() {
            Some(symbol) if !symbol.is_empty() => format!("{} {}", amount, symbol),
            _ => amount,
        }
    }

    /// Highlight every token and overlay the corrected value on every token
    /// that is not the tax-amount line.
    pub fn plan(&self, rate: Decimal, tokens: &[ClassifiedToken]) -> PlannedCorrection {
        let fill = self.config.style.fill();
        let mut planned = PlannedCorrection::default();

        for classified in tokens {
            let token = &classified.token;
            let corrected = self.corrected_value(token.numeric_value, rate);
            planned.prior_total += token.numeric_value;
            planned.corrected_total += corrected;
            planned.price_count += 1;

            planned.plan.highlights.push(EditOp::Highlight {
                page: token.page,
                rect: token.bounding_rect.expand(self.config.padding),
                fill,
            });

            if classified.is_tax_amount_line {
                debug!("{} is the tax line, highlight only", token.raw_text);
                continue;
            }

            let text = self.overlay_text(corrected);
            debug!("{} -> {} on page {}", token.raw_text, text, token.page);
            planned.plan.overlays.push(EditOp::TextOverlay {
                page: token.page,
                position: token.anchor_baseline.offset(0.0, -self.config.vertical_nudge),
                text,
                font_size: self.config.font_size,
            });
        }

        planned
    }

    /// Highlight the tax label whose keyword sits at `keyword`.
    pub fn add_label_highlight(&self, plan: &mut OverlayPlan, page: usize, keyword: Rect) {
        plan.highlights.push(EditOp::Highlight {
            page,
            rect: keyword.expand_by(
                self.config.label_extend_left,
                self.config.padding,
                self.config.label_extend_right,
                self.config.padding,
            ),
            fill: self.config.style.fill(),
        });
    }

    /// Information box on the first page, placed relative to `anchor`.
    pub fn add_info_box(
        &self,
        plan: &mut OverlayPlan,
        anchor: Point,
        rate: Decimal,
        corrected_total: Decimal,
    ) {
        let info = &self.config.info_box;
        let origin = anchor.offset(info.offset.x, info.offset.y);
        let lines = [
            format!("Prices excl. VAT {} %", format_locale_price(rate)),
            format!("Net total: {}", format_locale_grouped(corrected_total)),
        ];

        let padding = self.config.padding;
        plan.highlights.push(EditOp::Highlight {
            page: 0,
            rect: Rect::new(
                origin.x - padding,
                origin.y - padding,
                origin.x + info.width + padding,
                origin.y + info.line_height * lines.len() as f32 + padding,
            ),
            fill: self.config.style.fill(),
        });

        for (i, line) in lines.into_iter().enumerate() {
            plan.overlays.push(EditOp::TextOverlay {
                page: 0,
                position: origin.offset(0.0, info.line_height * (i + 1) as f32),
                text: line,
                font_size: self.config.font_size,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::plan::{HighlightStyle, Rgb};
    use crate::models::token::PriceToken;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn classified(raw: &str, value: &str, x: f32, y: f32, tax_line: bool) -> ClassifiedToken {
        let rect = Rect::new(x, y, x + 40.0, y + 10.0);
        ClassifiedToken {
            token: PriceToken {
                page: 0,
                raw_text: raw.to_string(),
                numeric_value: d(value),
                anchor_baseline: rect.baseline_anchor(),
                bounding_rect: rect,
            },
            is_tax_amount_line: tax_line,
        }
    }

    fn tokens() -> Vec<ClassifiedToken> {
        vec![
            classified("1.540,00", "1540.00", 85.0, 100.0, false),
            classified("240,31", "240.31", 115.0, 200.0, true),
            classified("1.780,31", "1780.31", 85.0, 220.0, false),
        ]
    }

    #[test]
    fn test_corrected_value() {
        let planner = OverlayPlanner::new(&OverlayConfig::default());
        assert_eq!(planner.corrected_value(d("1540.00"), d("8.10")), d("1424.61"));
    }

    #[test]
    fn test_plan_layers_and_geometry() {
        let planner = OverlayPlanner::new(&OverlayConfig::default());
        let planned = planner.plan(d("8.1"), &tokens());

        assert_eq!(planned.plan.highlights.len(), 3);
        assert_eq!(planned.plan.overlays.len(), 2);
        assert_eq!(
            planned.plan.highlights[0],
            EditOp::Highlight {
                page: 0,
                rect: Rect::new(83.0, 98.0, 127.0, 112.0),
                fill: Rgb::LIGHT_YELLOW,
            }
        );
        assert_eq!(
            planned.plan.overlays[0],
            EditOp::TextOverlay {
                page: 0,
                position: Point::new(85.0, 109.0),
                text: "1424,61".to_string(),
                font_size: 8.0,
            }
        );

        let ops: Vec<&EditOp> = planned.plan.ops().collect();
        let last_highlight = ops.iter().rposition(|op| op.is_highlight()).unwrap();
        let first_overlay = ops.iter().position(|op| !op.is_highlight()).unwrap();
        assert!(last_highlight < first_overlay);
    }

    #[test]
    fn test_tax_line_never_overlaid() {
        let planner = OverlayPlanner::new(&OverlayConfig::default());
        let planned = planner.plan(d("8.1"), &tokens());

        let tax_anchor = Point::new(115.0, 209.0);
        assert!(planned.plan.overlays.iter().all(|op| match op {
            EditOp::TextOverlay { position, .. } => *position != tax_anchor,
            EditOp::Highlight { .. } => false,
        }));
    }

    #[test]
    fn test_totals() {
        let planner = OverlayPlanner::new(&OverlayConfig::default());
        let planned = planner.plan(d("8.1"), &tokens());

        assert_eq!(planned.price_count, 3);
        assert_eq!(planned.prior_total, d("3560.62"));
        // 1424.61 + 222.30 + 1646.91
        assert_eq!(planned.corrected_total, d("3293.82"));
    }

    #[test]
    fn test_currency_symbol_and_style() {
        let config = OverlayConfig {
            currency_symbol: Some("€".to_string()),
            style: HighlightStyle::Download,
            ..OverlayConfig::default()
        };
        let planner = OverlayPlanner::new(&config);
        let planned = planner.plan(d("19"), &[classified("119,00", "119.00", 10.0, 10.0, false)]);

        assert!(matches!(
            &planned.plan.overlays[0],
            EditOp::TextOverlay { text, .. } if text == "100,00 €"
        ));
        assert!(matches!(
            planned.plan.highlights[0],
            EditOp::Highlight { fill, .. } if fill == Rgb::WHITE
        ));
    }

    #[test]
    fn test_info_box() {
        let planner = OverlayPlanner::new(&OverlayConfig::default());
        let mut plan = OverlayPlan::default();
        planner.add_info_box(&mut plan, Point::new(300.0, 400.0), d("8.1"), d("2742.55"));

        assert_eq!(plan.highlights.len(), 1);
        let texts: Vec<&str> = plan
            .overlays
            .iter()
            .filter_map(|op| match op {
                EditOp::TextOverlay { text, .. } => Some(text.as_str()),
                EditOp::Highlight { .. } => None,
            })
            .collect();
        assert_eq!(texts, vec!["Prices excl. VAT 8,10 %", "Net total: 2.742,55"]);
        assert_eq!(plan.overlays[0].page(), 0);
    }

    #[test]
    fn test_label_highlight() {
        let planner = OverlayPlanner::new(&OverlayConfig::default());
        let mut plan = OverlayPlan::default();
        planner.add_label_highlight(&mut plan, 1, Rect::new(90.0, 200.0, 105.0, 210.0));

        assert_eq!(
            plan.highlights[0],
            EditOp::Highlight {
                page: 1,
                rect: Rect::new(-10.0, 198.0, 155.0, 212.0),
                fill: Rgb::LIGHT_YELLOW,
            }
        );
    }
}
