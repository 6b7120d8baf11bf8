//! Configuration structures for the correction pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::geometry::Point;
use super::plan::HighlightStyle;

/// Main configuration for the vatstrip pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VatstripConfig {
    /// Tax-rate detection configuration.
    pub detection: DetectionConfig,

    /// Price extraction configuration.
    pub extraction: ExtractionConfig,

    /// Tax-line classification configuration.
    pub classification: ClassificationConfig,

    /// Overlay planning configuration.
    pub overlay: OverlayConfig,
}

/// One entry of the ordered rate-pattern table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatePattern {
    /// Regular expression; capture group 1 holds the rate numeral.
    pub pattern: String,

    /// Jurisdiction tag (e.g. "EU", "DACH", "SG").
    pub jurisdiction: String,

    /// Priority rank, lower is evaluated first.
    pub rank: u32,

    /// The rate sits directly next to the tax keyword.
    #[serde(default)]
    pub canonical: bool,

    /// Match without regard to case.
    #[serde(default = "default_true")]
    pub case_insensitive: bool,
}

fn default_true() -> bool {
    true
}

impl RatePattern {
    pub fn new(pattern: &str, jurisdiction: &str, rank: u32, canonical: bool) -> Self {
        Self {
            pattern: pattern.to_string(),
            jurisdiction: jurisdiction.to_string(),
            rank,
            canonical,
            case_insensitive: true,
        }
    }
}

/// Country that uses a given standard rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownRate {
    pub rate: Decimal,
    pub country_code: String,
    pub country_name: String,
}

impl KnownRate {
    fn new(rate: Decimal, country_code: &str, country_name: &str) -> Self {
        Self {
            rate,
            country_code: country_code.to_string(),
            country_name: country_name.to_string(),
        }
    }
}

/// Tax-rate detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Ordered rate patterns.
    pub patterns: Vec<RatePattern>,

    /// Lowest plausible rate (percent).
    pub min_rate: Decimal,

    /// Highest plausible rate (percent).
    pub max_rate: Decimal,

    /// Keywords that label the tax line.
    pub tax_keywords: Vec<String>,

    /// Rate to country lookup, first match wins.
    pub known_rates: Vec<KnownRate>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let num = r"(\d+(?:[,.]\d+)?)";
        Self {
            patterns: vec![
                RatePattern::new(&format!(r"{num}\s*%\s*VAT"), "EU", 0, true),
                RatePattern::new(&format!(r"VAT[:\s]*{num}"), "EU", 1, true),
                RatePattern::new(&format!(r"MwSt\.?[:\s]*{num}"), "DACH", 2, false),
                RatePattern::new(&format!(r"Mehrwertsteuer[:\s]*{num}"), "DACH", 3, false),
                RatePattern::new(&format!(r"USt\.?[:\s]*{num}"), "DE", 4, false),
                RatePattern::new(&format!(r"GST[:\s]*\({num}"), "SG", 5, false),
                RatePattern::new(&format!(r"TVA[:\s]*{num}"), "FR", 6, false),
                RatePattern::new(&format!(r"IVA[:\s]*{num}"), "IT", 7, false),
            ],
            min_rate: Decimal::ZERO,
            max_rate: Decimal::new(30, 0),
            tax_keywords: ["VAT", "MwSt", "Mehrwertsteuer", "USt", "GST", "TVA", "IVA"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            known_rates: vec![
                KnownRate::new(Decimal::new(81, 1), "CH", "Switzerland"),
                KnownRate::new(Decimal::new(77, 1), "CH", "Switzerland"),
                KnownRate::new(Decimal::new(19, 0), "DE", "Germany"),
                KnownRate::new(Decimal::new(20, 0), "AT", "Austria"),
                KnownRate::new(Decimal::new(22, 0), "IT", "Italy"),
                KnownRate::new(Decimal::new(21, 0), "ES", "Spain"),
                KnownRate::new(Decimal::new(23, 0), "PL", "Poland"),
                KnownRate::new(Decimal::new(9, 0), "SG", "Singapore"),
            ],
        }
    }
}

impl DetectionConfig {
    /// Look up the country using the given rate.
    pub fn country_for(&self, rate: Decimal) -> Option<&KnownRate> {
        self.known_rates.iter().find(|known| known.rate == rate)
    }
}

/// Price extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Smallest amount treated as a price.
    pub min_price: Decimal,

    /// Largest amount treated as a price.
    pub max_price: Decimal,

    /// Occurrences closer than this on both axes are one token.
    pub dedup_proximity: f32,

    /// Characters inspected on each side of a match.
    pub context_radius: usize,

    /// A `%` this many characters after a small amount marks it as a percentage.
    pub percent_lookahead: usize,

    /// Amounts below this are checked for percent and discount context.
    pub discount_ceiling: Decimal,

    /// `dd.dd` fragments reading below this are treated as dates.
    pub short_date_ceiling: Decimal,

    /// Words that mark a line-item discount (lowercase).
    pub discount_keywords: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_price: Decimal::new(10, 0),
            max_price: Decimal::new(100_000, 0),
            dedup_proximity: 5.0,
            context_radius: 30,
            percent_lookahead: 20,
            discount_ceiling: Decimal::new(100, 0),
            short_date_ceiling: Decimal::new(50, 0),
            discount_keywords: ["rabatt", "discount", "reduktion", "reduction", "remise", "sconto", "descuento"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Tax-line classification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Amounts near the tax label are the tax line only below this value.
    pub tax_amount_ceiling: Decimal,

    /// Tolerance when comparing a token against the printed tax amount.
    pub amount_tolerance: Decimal,

    /// Horizontal reach of the neighbourhood around a token.
    pub neighborhood_dx: f32,

    /// Vertical reach of the neighbourhood around a token.
    pub neighborhood_dy: f32,

    /// How far left of a tax keyword the rate is searched.
    pub label_search_left: f32,

    /// How far right of a tax keyword the rate is searched.
    pub label_search_right: f32,

    /// Vertical reach of the label search window.
    pub label_search_dy: f32,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            tax_amount_ceiling: Decimal::new(500, 0),
            amount_tolerance: Decimal::new(1, 2),
            neighborhood_dx: 100.0,
            neighborhood_dy: 30.0,
            label_search_left: 150.0,
            label_search_right: 50.0,
            label_search_dy: 10.0,
        }
    }
}

/// Replacement for a symbol the renderer cannot draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlyphFallback {
    pub symbol: String,
    pub code: String,
}

impl GlyphFallback {
    pub fn new(symbol: &str, code: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            code: code.to_string(),
        }
    }
}

/// Overlay planning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Padding added around each highlighted amount.
    pub padding: f32,

    /// Overlay text is raised by this much above the original baseline.
    pub vertical_nudge: f32,

    /// Overlay font size.
    pub font_size: f32,

    /// Highlight fill style.
    pub style: HighlightStyle,

    /// Symbol appended to each corrected amount, e.g. "€".
    pub currency_symbol: Option<String>,

    /// Substitutions tried when a glyph cannot be rendered.
    pub glyph_fallbacks: Vec<GlyphFallback>,

    /// Also highlight the tax label itself, once per page.
    pub highlight_labels: bool,

    /// Label highlight reach left of the keyword.
    pub label_extend_left: f32,

    /// Label highlight reach right of the keyword.
    pub label_extend_right: f32,

    /// Supplementary information box.
    pub info_box: InfoBoxConfig,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            padding: 2.0,
            vertical_nudge: 1.0,
            font_size: 8.0,
            style: HighlightStyle::Review,
            currency_symbol: None,
            glyph_fallbacks: vec![
                GlyphFallback::new("€", "EUR"),
                GlyphFallback::new("£", "GBP"),
            ],
            highlight_labels: true,
            label_extend_left: 100.0,
            label_extend_right: 50.0,
            info_box: InfoBoxConfig::default(),
        }
    }
}

/// Information box placed near an anchor row on the first page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoBoxConfig {
    /// Emit the box.
    pub enabled: bool,

    /// Row keyword the box is anchored to.
    pub anchor_label: String,

    /// Number of leading text blocks scanned for the label.
    pub max_blocks: usize,

    /// Position used when the label is not found.
    pub default_position: Point,

    /// Offset of the box's first baseline from the anchor.
    pub offset: Point,

    /// Box width.
    pub width: f32,

    /// Distance between text lines.
    pub line_height: f32,
}

impl Default for InfoBoxConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            anchor_label: "Total".to_string(),
            max_blocks: 40,
            default_position: Point::new(40.0, 60.0),
            offset: Point::new(0.0, -24.0),
            width: 180.0,
            line_height: 10.0,
        }
    }
}

impl VatstripConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
