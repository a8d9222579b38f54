use crate::map::style::FillSpec;
use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;

pub const DEFAULT_REGION_PREFIX: &str = "RU-";
const DEFAULT_VIEW_BOX: (f64, f64) = (1224.0, 760.0);
const ROOT_STYLE: &str = "max-width: 100%; height: auto; display: block; margin: 0 auto;";

const STYLE_ATTRS: [&[u8]; 4] = [b"fill", b"stroke", b"stroke-width", b"style"];

/// A vector map whose interactive regions are `<path>` elements with an id
/// carrying the region prefix.
#[derive(Debug, Clone)]
pub struct MapDocument {
    source: String,
    prefix: String,
    region_ids: Vec<String>,
}

impl MapDocument {
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        Self::parse_with_prefix(source, DEFAULT_REGION_PREFIX)
    }

    pub fn parse_with_prefix(source: impl Into<String>, prefix: &str) -> Result<Self> {
        let source = source.into();
        let mut reader = Reader::from_str(&source);
        let mut region_ids = Vec::new();
        let mut saw_root = false;

        loop {
            match reader.read_event().context("map document is not well-formed XML")? {
                Event::Start(e) | Event::Empty(e) => {
                    if e.local_name().as_ref() == b"svg" {
                        saw_root = true;
                    }
                    if let Some(id) = region_id(&e, prefix)? {
                        if !region_ids.contains(&id) {
                            region_ids.push(id);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        anyhow::ensure!(saw_root, "map document has no <svg> element");
        tracing::debug!(regions = region_ids.len(), prefix, "parsed map document");

        Ok(Self {
            source,
            prefix: prefix.to_string(),
            region_ids,
        })
    }

    /// Region ids in document order.
    pub fn region_ids(&self) -> &[String] {
        &self.region_ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.region_ids.iter().any(|r| r == id)
    }

    /// Re-emits the document with per-region styles applied and the root
    /// element made responsive.
    pub fn render(&self, styles: &BTreeMap<String, FillSpec>) -> Result<String> {
        let mut reader = Reader::from_str(&self.source);
        let mut writer = Writer::new(Vec::with_capacity(self.source.len()));
        let mut root_done = false;

        loop {
            let event = reader.read_event().context("map document is not well-formed XML")?;
            match event {
                Event::Start(e) => {
                    let e = self.restyle(e, styles, &mut root_done)?;
                    writer.write_event(Event::Start(e))?;
                }
                Event::Empty(e) => {
                    let e = self.restyle(e, styles, &mut root_done)?;
                    writer.write_event(Event::Empty(e))?;
                }
                Event::Eof => break,
                other => writer.write_event(other)?,
            }
        }

        String::from_utf8(writer.into_inner()).context("rendered map is not valid UTF-8")
    }

    fn restyle<'a>(
        &self,
        e: BytesStart<'a>,
        styles: &BTreeMap<String, FillSpec>,
        root_done: &mut bool,
    ) -> Result<BytesStart<'a>> {
        if !*root_done && e.local_name().as_ref() == b"svg" {
            *root_done = true;
            return normalize_root(e);
        }

        let Some(id) = region_id(&e, &self.prefix)? else {
            return Ok(e);
        };
        let Some(spec) = styles.get(&id) else {
            return Ok(e);
        };

        let mut out = e.clone();
        out.clear_attributes();
        for attr in e.attributes() {
            let attr = attr?;
            if STYLE_ATTRS.contains(&attr.key.as_ref()) {
                continue;
            }
            out.push_attribute(attr);
        }

        let width = spec.stroke_width.to_string();
        out.push_attribute(("fill", spec.fill));
        out.push_attribute(("stroke", spec.stroke));
        out.push_attribute(("stroke-width", width.as_str()));
        let css = spec.css();
        if !css.is_empty() {
            out.push_attribute(("style", css));
        }
        Ok(out)
    }
}

fn region_id(e: &BytesStart<'_>, prefix: &str) -> Result<Option<String>> {
    if e.local_name().as_ref() != b"path" {
        return Ok(None);
    }
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"id" {
            let id = attr.unescape_value()?;
            if id.starts_with(prefix) {
                return Ok(Some(id.into_owned()));
            }
            return Ok(None);
        }
    }
    Ok(None)
}

fn normalize_root(e: BytesStart<'_>) -> Result<BytesStart<'_>> {
    let mut view_box: Option<String> = None;
    let mut width: Option<f64> = None;
    let mut height: Option<f64> = None;

    let mut out = e.clone();
    out.clear_attributes();
    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"viewBox" => view_box = Some(attr.unescape_value()?.into_owned()),
            b"width" => width = parse_length(&attr.unescape_value()?),
            b"height" => height = parse_length(&attr.unescape_value()?),
            b"preserveAspectRatio" | b"style" => {}
            _ => out.push_attribute(attr),
        }
    }

    let view_box = view_box.unwrap_or_else(|| {
        let (w, h) = match (width, height) {
            (Some(w), Some(h)) => (w, h),
            _ => DEFAULT_VIEW_BOX,
        };
        format!("0 0 {w} {h}")
    });

    out.push_attribute(("viewBox", view_box.as_str()));
    out.push_attribute(("width", "100%"));
    out.push_attribute(("preserveAspectRatio", "xMidYMid meet"));
    out.push_attribute(("style", ROOT_STYLE));
    Ok(out)
}

fn parse_length(raw: &str) -> Option<f64> {
    raw.trim()
        .trim_end_matches("px")
        .parse::<f64>()
        .ok()
        .filter(|v| *v > 0.0)
}
