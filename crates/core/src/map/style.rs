use crate::map::regions::RegionColorModel;
use serde::Serialize;

pub const HIGHLIGHT_FILL: &str = "#ef4444";
pub const HIGHLIGHT_STROKE: &str = "#dc2626";
pub const HOVER_FILL: &str = "#fbbf24";
pub const UNKNOWN_FILL: &str = "#4b5563";
pub const DEFAULT_STROKE: &str = "#374151";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionStyleKind {
    Unknown,
    Data,
    Hovered,
    Highlighted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillSpec {
    pub kind: RegionStyleKind,
    pub fill: &'static str,
    pub stroke: &'static str,
    pub stroke_width: f32,
}

impl FillSpec {
    fn highlighted() -> Self {
        Self {
            kind: RegionStyleKind::Highlighted,
            fill: HIGHLIGHT_FILL,
            stroke: HIGHLIGHT_STROKE,
            stroke_width: 2.0,
        }
    }

    /// Inline `style` attribute for SVG output.
    pub fn css(&self) -> &'static str {
        match self.kind {
            RegionStyleKind::Unknown => "",
            RegionStyleKind::Data | RegionStyleKind::Hovered => {
                "cursor: pointer; transition: all 0.2s ease;"
            }
            RegionStyleKind::Highlighted => {
                "cursor: pointer; transition: all 0.2s ease; filter: brightness(1.2);"
            }
        }
    }
}

/// Derives a region's style from the current highlight and hover state.
///
/// The highlight wins over everything, including missing color data. Hover
/// only applies to data-bearing regions.
pub fn compute_region_style(
    region_id: &str,
    model: &RegionColorModel,
    highlighted: Option<&str>,
    hovered: Option<&str>,
) -> FillSpec {
    if highlighted == Some(region_id) {
        return FillSpec::highlighted();
    }

    let Some(entry) = model.get(region_id) else {
        return FillSpec {
            kind: RegionStyleKind::Unknown,
            fill: UNKNOWN_FILL,
            stroke: DEFAULT_STROKE,
            stroke_width: 0.5,
        };
    };

    if hovered == Some(region_id) {
        return FillSpec {
            kind: RegionStyleKind::Hovered,
            fill: HOVER_FILL,
            stroke: DEFAULT_STROKE,
            stroke_width: 1.0,
        };
    }

    FillSpec {
        kind: RegionStyleKind::Data,
        fill: entry.color,
        stroke: DEFAULT_STROKE,
        stroke_width: 0.5,
    }
}
