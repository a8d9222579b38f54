//! Region map: static color model, per-region style derivation and the
//! hover/highlight interaction state.

pub mod regions;
pub mod style;
pub mod svg;

use crate::map::regions::{RegionColorModel, RegionEntry};
use crate::map::style::{compute_region_style, FillSpec};
use crate::map::svg::MapDocument;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub region_id: String,
    pub name: String,
    pub value: u8,
    pub position: PointerPosition,
}

/// What a pointer event changed, for the rendering layer to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum HoverChange {
    /// The region takes part in hover; apply `style` to it.
    Restyle { region_id: String, style: FillSpec },
    /// Region has no color data; nothing to do.
    Ignored,
}

/// Owns the highlighted region id and the transient hover state for one map.
#[derive(Debug, Clone)]
pub struct MapHighlightEngine {
    document: MapDocument,
    model: RegionColorModel,
    highlighted: Option<String>,
    hovered: Option<String>,
    tooltip: Option<Tooltip>,
    styles: BTreeMap<String, FillSpec>,
}

impl MapHighlightEngine {
    pub fn new(document: MapDocument, model: RegionColorModel) -> Self {
        let mut engine = Self {
            document,
            model,
            highlighted: None,
            hovered: None,
            tooltip: None,
            styles: BTreeMap::new(),
        };
        engine.recompute_all();
        engine
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.highlighted.as_deref()
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    /// True only while a region is hovered; pointer moves are dropped otherwise.
    pub fn is_tracking_pointer(&self) -> bool {
        self.hovered.is_some()
    }

    pub fn style(&self, region_id: &str) -> Option<&FillSpec> {
        self.styles.get(region_id)
    }

    pub fn styles(&self) -> &BTreeMap<String, FillSpec> {
        &self.styles
    }

    /// Binds a new highlighted region and recomputes every region from scratch.
    pub fn bind_highlight(&mut self, region_id: Option<&str>) {
        let next = region_id.map(str::to_string);
        if next != self.highlighted {
            tracing::debug!(
                from = self.highlighted.as_deref().unwrap_or("-"),
                to = next.as_deref().unwrap_or("-"),
                "rebinding highlighted region"
            );
        }
        self.highlighted = next;
        self.recompute_all();
    }

    /// Highlights the region whose display name matches `name`, clearing the
    /// highlight when the name is unknown.
    pub fn bind_highlight_by_name(&mut self, name: &str) -> Option<&'static str> {
        let code = self.model.region_code(name);
        self.bind_highlight(code);
        code
    }

    pub fn pointer_enter(&mut self, region_id: &str, position: PointerPosition) -> HoverChange {
        let Some(entry) = self.model.get(region_id).cloned() else {
            return HoverChange::Ignored;
        };

        if let Some(previous) = self.hovered.take() {
            if previous != region_id {
                self.restyle(&previous);
            }
        }

        self.hovered = Some(region_id.to_string());
        self.tooltip = Some(tooltip_for(&entry, position));
        let style = self.restyle(region_id);
        HoverChange::Restyle {
            region_id: region_id.to_string(),
            style,
        }
    }

    pub fn pointer_move(&mut self, position: PointerPosition) {
        if let Some(tooltip) = self.tooltip.as_mut() {
            tooltip.position = position;
        }
    }

    pub fn pointer_leave(&mut self, region_id: &str) -> HoverChange {
        if !self.model.contains(region_id) {
            return HoverChange::Ignored;
        }
        if self.hovered.as_deref() == Some(region_id) {
            self.hovered = None;
            self.tooltip = None;
        }
        let style = self.restyle(region_id);
        HoverChange::Restyle {
            region_id: region_id.to_string(),
            style,
        }
    }

    pub fn render_svg(&self) -> Result<String> {
        self.document.render(&self.styles)
    }

    fn restyle(&mut self, region_id: &str) -> FillSpec {
        let style = compute_region_style(
            region_id,
            &self.model,
            self.highlighted.as_deref(),
            self.hovered.as_deref(),
        );
        if self.document.contains(region_id) {
            self.styles.insert(region_id.to_string(), style.clone());
        }
        style
    }

    fn recompute_all(&mut self) {
        let highlighted = self.highlighted.as_deref();
        let hovered = self.hovered.as_deref();
        self.styles = self
            .document
            .region_ids()
            .iter()
            .map(|id| {
                (
                    id.clone(),
                    compute_region_style(id, &self.model, highlighted, hovered),
                )
            })
            .collect();
    }
}

fn tooltip_for(entry: &RegionEntry, position: PointerPosition) -> Tooltip {
    Tooltip {
        region_id: entry.id.to_string(),
        name: entry.name.to_string(),
        value: entry.value,
        position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::style::{RegionStyleKind, HIGHLIGHT_FILL, HOVER_FILL, UNKNOWN_FILL};

    const SVG: &str = r#"<svg width="10" height="10">
  <path id="RU-MOW" d="M0 0"/>
  <path id="RU-SPE" d="M0 0"/>
  <path id="RU-TA" d="M0 0"/>
  <path id="RU-CR" d="M0 0"/>
</svg>"#;

    const AT: PointerPosition = PointerPosition { x: 5.0, y: 7.0 };

    fn engine() -> MapHighlightEngine {
        let doc = MapDocument::parse(SVG).unwrap();
        MapHighlightEngine::new(doc, RegionColorModel::default())
    }

    fn highlighted_regions(engine: &MapHighlightEngine) -> Vec<&str> {
        engine
            .styles()
            .iter()
            .filter(|(_, s)| s.kind == RegionStyleKind::Highlighted)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    #[test]
    fn unknown_region_can_be_highlighted() {
        let mut e = engine();
        assert_eq!(e.style("RU-CR").unwrap().fill, UNKNOWN_FILL);
        e.bind_highlight(Some("RU-CR"));
        assert_eq!(e.style("RU-CR").unwrap().fill, HIGHLIGHT_FILL);
    }

    #[test]
    fn rebinding_leaves_exactly_one_highlight() {
        let mut e = engine();
        e.bind_highlight(Some("RU-MOW"));
        assert_eq!(highlighted_regions(&e), ["RU-MOW"]);

        e.bind_highlight(Some("RU-TA"));
        assert_eq!(highlighted_regions(&e), ["RU-TA"]);
        let moscow = RegionColorModel::default().get("RU-MOW").unwrap().color;
        assert_eq!(e.style("RU-MOW").unwrap().fill, moscow);

        e.bind_highlight(None);
        assert!(highlighted_regions(&e).is_empty());
    }

    #[test]
    fn hover_then_leave_restores_pre_hover_fill() {
        let mut e = engine();
        e.bind_highlight(Some("RU-MOW"));
        let before = e.style("RU-SPE").cloned().unwrap();

        let change = e.pointer_enter("RU-SPE", AT);
        match change {
            HoverChange::Restyle { style, .. } => assert_eq!(style.fill, HOVER_FILL),
            HoverChange::Ignored => panic!("data region must take part in hover"),
        }
        assert_eq!(e.style("RU-SPE").unwrap().fill, HOVER_FILL);

        e.pointer_leave("RU-SPE");
        assert_eq!(e.style("RU-SPE").unwrap(), &before);
    }

    #[test]
    fn hovering_the_highlighted_region_keeps_its_fill() {
        let mut e = engine();
        e.bind_highlight(Some("RU-MOW"));
        e.pointer_enter("RU-MOW", AT);
        assert_eq!(e.style("RU-MOW").unwrap().fill, HIGHLIGHT_FILL);
        // Tooltip still shows for the highlighted region.
        assert_eq!(e.tooltip().unwrap().region_id, "RU-MOW");
        e.pointer_leave("RU-MOW");
        assert_eq!(e.style("RU-MOW").unwrap().fill, HIGHLIGHT_FILL);
    }

    #[test]
    fn leave_recomputes_against_current_highlight() {
        let mut e = engine();
        e.pointer_enter("RU-TA", AT);
        // Highlight moves onto the hovered region while the pointer is over it.
        e.bind_highlight(Some("RU-TA"));
        e.pointer_leave("RU-TA");
        assert_eq!(e.style("RU-TA").unwrap().fill, HIGHLIGHT_FILL);
    }

    #[test]
    fn regions_without_data_ignore_hover() {
        let mut e = engine();
        assert_eq!(e.pointer_enter("RU-CR", AT), HoverChange::Ignored);
        assert!(e.tooltip().is_none());
        assert!(!e.is_tracking_pointer());
        assert_eq!(e.style("RU-CR").unwrap().fill, UNKNOWN_FILL);
    }

    #[test]
    fn tooltip_tracks_pointer_only_while_hovering() {
        let mut e = engine();
        e.pointer_move(AT);
        assert!(e.tooltip().is_none());

        e.pointer_enter("RU-TA", AT);
        assert!(e.is_tracking_pointer());
        let next = PointerPosition { x: 9.0, y: 1.0 };
        e.pointer_move(next);
        let tip = e.tooltip().unwrap();
        assert_eq!(tip.position, next);
        assert_eq!(tip.value, 90);

        e.pointer_leave("RU-TA");
        assert!(e.tooltip().is_none());
        assert!(!e.is_tracking_pointer());
        e.pointer_move(AT);
        assert!(e.tooltip().is_none());
    }

    #[test]
    fn entering_a_new_region_clears_the_previous_hover() {
        let mut e = engine();
        e.pointer_enter("RU-TA", AT);
        e.pointer_enter("RU-SPE", AT);
        assert_eq!(e.style("RU-TA").unwrap().kind, RegionStyleKind::Data);
        assert_eq!(e.style("RU-SPE").unwrap().kind, RegionStyleKind::Hovered);
    }

    #[test]
    fn highlight_by_name_resolves_through_the_model() {
        let mut e = engine();
        assert_eq!(e.bind_highlight_by_name("Москва"), Some("RU-MOW"));
        assert_eq!(e.highlighted(), Some("RU-MOW"));
        assert_eq!(e.bind_highlight_by_name("нет такого"), None);
        assert_eq!(e.highlighted(), None);
    }

    #[test]
    fn rendered_svg_carries_highlight() {
        let mut e = engine();
        e.bind_highlight(Some("RU-SPE"));
        let out = e.render_svg().unwrap();
        assert!(out.contains(r##"<path id="RU-SPE" d="M0 0" fill="#ef4444""##));
    }
}
