//! Anchor row lookup for the information box.

use tracing::{debug, warn};

use crate::document::DocumentSource;
use crate::models::config::InfoBoxConfig;
use crate::models::geometry::Point;

/// Finds the top-most row carrying a label on the first page.
#[derive(Debug, Clone)]
pub struct GeometryAnchor {
    label: String,
    max_blocks: usize,
    default_position: Point,
}

impl GeometryAnchor {
    pub fn new(label: impl Into<String>, max_blocks: usize, default_position: Point) -> Self {
        Self {
            label: label.into(),
            max_blocks,
            default_position,
        }
    }

    pub fn from_config(config: &InfoBoxConfig) -> Self {
        Self::new(config.anchor_label.clone(), config.max_blocks, config.default_position)
    }

    /// Top-left corner of the highest block matching the label, or the
    /// default position. Never fails.
    pub fn locate(&self, doc: &dyn DocumentSource) -> Point {
        if doc.page_count() == 0 || self.label.is_empty() {
            return self.default_position;
        }

        let blocks = match doc.page_text_blocks(0) {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!("Anchor lookup failed, using default position: {}", e);
                return self.default_position;
            }
        };

        let label = self.label.to_lowercase();
        let anchor = blocks
            .iter()
            .take(self.max_blocks)
            .filter(|b| b.kind.is_text() && b.text.to_lowercase().contains(&label))
            .fold(None::<Point>, |best, b| match best {
                Some(p) if p.y <= b.rect.y0 => Some(p),
                _ => Some(Point::new(b.rect.x0, b.rect.y0)),
            });

        match anchor {
            Some(point) => {
                debug!("Anchor {:?} found at ({}, {})", self.label, point.x, point.y);
                point
            }
            None => self.default_position,
        }
    }
}
