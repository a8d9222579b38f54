pub mod error;
pub mod paginate;
pub mod pdf;
pub mod surface;
pub mod text_layout;

pub use error::{ExportError, ExportStage};
pub use surface::{ImageFileSurface, ReportSurface};

use crate::config::Settings;
use crate::domain::metrics::{metadata_line, news_headline, ReportMetrics};
use crate::domain::report::AnalysisReport;
use crate::export::paginate::{paginate, pixel_rows, scaled_height};
use crate::export::pdf::{PageGeometry, PdfCanvas, Shade};
use crate::export::text_layout::{layout_sections, LayoutParams, LineKind, Section, TextPage};
use crate::map::regions::RegionColorModel;
use chrono::NaiveDate;
use image::RgbaImage;
use std::path::{Path, PathBuf};

const DEFAULT_OVERSAMPLE: u32 = 2;
const DOCUMENT_TITLE: &str = "Company Analysis Report";
const ATTRIBUTION: &str = "Generated by the company analysis assistant";

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub output_dir: PathBuf,
    pub font_path: Option<PathBuf>,
    pub oversample: u32,
    pub geometry: PageGeometry,
    pub title: String,
    pub attribution: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            font_path: None,
            oversample: DEFAULT_OVERSAMPLE,
            geometry: PageGeometry::default(),
            title: DOCUMENT_TITLE.to_string(),
            attribution: ATTRIBUTION.to_string(),
        }
    }
}

impl ExportSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        let oversample = std::env::var("EXPORT_OVERSAMPLE")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_OVERSAMPLE)
            .max(1);

        Self {
            output_dir: settings.export_dir_or_default(),
            font_path: settings.export_font_path.clone(),
            oversample,
            ..Self::default()
        }
    }
}

pub struct ExportRequest<'a> {
    pub query: &'a str,
    pub report: Option<&'a AnalysisReport>,
    pub surface: Option<&'a dyn ReportSurface>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportBody {
    Snapshot,
    TextFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    pub path: PathBuf,
    pub pages: usize,
    pub body: ExportBody,
}

pub fn report_file_name(date: NaiveDate) -> String {
    format!("report-{}.pdf", date.format("%Y-%m-%d"))
}

/// Turns a rendered report into a paginated PDF on disk.
pub struct DocumentExportEngine {
    settings: ExportSettings,
    regions: RegionColorModel,
}

impl DocumentExportEngine {
    pub fn new(settings: ExportSettings, regions: RegionColorModel) -> Self {
        Self { settings, regions }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            ExportSettings::from_settings(settings),
            RegionColorModel::default(),
        )
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub async fn export_report(
        &self,
        request: ExportRequest<'_>,
    ) -> Result<ExportedDocument, ExportError> {
        let (canvas, body) = self.render(&request).await?;
        let pages = canvas.page_count();
        let bytes = canvas
            .into_bytes()
            .map_err(|e| ExportError::new(ExportStage::Document, format!("{e:#}")))?;

        let path = self
            .settings
            .output_dir
            .join(report_file_name(request.date));
        write_atomically(&path, &bytes).await?;

        tracing::info!(
            path = %path.display(),
            pages,
            body = ?body,
            bytes = bytes.len(),
            "report exported"
        );
        Ok(ExportedDocument { path, pages, body })
    }

    /// Builds every page, then stamps footers once the page count is final.
    async fn render(
        &self,
        request: &ExportRequest<'_>,
    ) -> Result<(PdfCanvas, ExportBody), ExportError> {
        let font = self.load_font().await;
        let mut canvas = PdfCanvas::new(&self.settings.title, self.settings.geometry, font)
            .map_err(|e| ExportError::new(ExportStage::Document, format!("{e:#}")))?;
        self.draw_header(&mut canvas, request.query, request.date);

        let body = match self.capture(request.surface).await {
            Some(snapshot) => {
                draw_snapshot(&mut canvas, &snapshot);
                ExportBody::Snapshot
            }
            None => {
                let report = request.report.ok_or_else(|| {
                    ExportError::new(ExportStage::Fallback, "no report available to summarize")
                })?;
                let sections = fallback_sections(report, &self.regions);
                draw_text_pages(&mut canvas, &layout_sections(&sections, &self.layout_params()));
                ExportBody::TextFallback
            }
        };

        self.stamp_footers(&mut canvas);
        Ok((canvas, body))
    }

    async fn load_font(&self) -> Option<Vec<u8>> {
        let path = self.settings.font_path.as_ref()?;
        match tokio::fs::read(path).await {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "export font unavailable; using builtin Helvetica"
                );
                None
            }
        }
    }

    async fn capture(&self, surface: Option<&dyn ReportSurface>) -> Option<RgbaImage> {
        let Some(surface) = surface else {
            tracing::info!("no report surface to capture; exporting text summary");
            return None;
        };
        match surface.capture(self.settings.oversample).await {
            Ok(img) if img.width() > 0 && img.height() > 0 => Some(img),
            Ok(_) => {
                tracing::warn!(
                    surface = surface.surface_name(),
                    "report surface captured an empty image; exporting text summary"
                );
                None
            }
            Err(err) => {
                tracing::warn!(
                    surface = surface.surface_name(),
                    error = %err,
                    "report capture failed; exporting text summary"
                );
                None
            }
        }
    }

    fn layout_params(&self) -> LayoutParams {
        let g = &self.settings.geometry;
        LayoutParams {
            margin: g.margin,
            wrap_width: g.printable_width() - 10.0,
            first_page_start: g.margin + g.header_height,
            continue_start: g.margin + 20.0,
            ..LayoutParams::default()
        }
    }

    fn draw_header(&self, canvas: &mut PdfCanvas, query: &str, date: NaiveDate) {
        let m = self.settings.geometry.margin;
        canvas.text(1, m, m + 10.0, 24.0, Shade::TITLE, &self.settings.title);
        canvas.text(1, m, m + 25.0, 12.0, Shade::BODY, &format!("Query: {}", query.trim()));
        canvas.text(
            1,
            m,
            m + 35.0,
            12.0,
            Shade::BODY,
            &format!("Created: {}", date.format("%Y-%m-%d")),
        );
        canvas.rule(1, m + 45.0, 0.5, Shade::RULE);
    }

    /// Second pass: every page gets `Page i of N` once N is known.
    fn stamp_footers(&self, canvas: &mut PdfCanvas) {
        let g = *canvas.geometry();
        let total = canvas.page_count();
        for page in 1..=total {
            canvas.rule(page, g.height - 25.0, 0.3, Shade::RULE);
            canvas.text(
                page,
                g.margin,
                g.height - 15.0,
                9.0,
                Shade::MUTED,
                &self.settings.attribution,
            );
            canvas.text_right(
                page,
                g.width - g.margin,
                g.height - 15.0,
                9.0,
                Shade::MUTED,
                &format!("Page {page} of {total}"),
            );
        }
    }
}

fn draw_snapshot(canvas: &mut PdfCanvas, snapshot: &RgbaImage) {
    let g = *canvas.geometry();
    let (width_px, height_px) = snapshot.dimensions();
    let image_height = scaled_height(width_px, height_px, f64::from(g.printable_width()));
    let px_per_mm = f64::from(height_px) / image_height;

    let windows = paginate(
        image_height,
        f64::from(g.printable_height()),
        f64::from(g.header_height),
    );
    tracing::debug!(
        width_px,
        height_px,
        image_height_mm = image_height,
        pages = windows.last().map_or(0, |w| w.page),
        "paginating report snapshot"
    );

    for window in &windows {
        let (start, end) = pixel_rows(window, px_per_mm, height_px);
        if end <= start {
            continue;
        }
        canvas.ensure_page(window.page);
        let band = image::imageops::crop_imm(snapshot, 0, start, width_px, end - start).to_image();
        canvas.image(
            window.page,
            &band,
            g.margin,
            g.margin + window.page_offset as f32,
            g.printable_width(),
        );
    }
}

fn draw_text_pages(canvas: &mut PdfCanvas, pages: &[TextPage]) {
    for (i, page) in pages.iter().enumerate() {
        let number = i + 1;
        canvas.ensure_page(number);
        for line in &page.lines {
            let shade = match line.kind {
                LineKind::Heading => Shade::HEADING,
                LineKind::Body => Shade::BODY,
            };
            canvas.text(number, line.x, line.y, line.size_pt, shade, &line.text);
        }
    }
}

/// "Key metrics", "News", then "Insights".
pub fn fallback_sections(report: &AnalysisReport, regions: &RegionColorModel) -> Vec<Section> {
    let metrics = ReportMetrics::from_report(report, regions);
    let mut key_metrics = metrics.key_metric_lines();
    if !report.company_info.region.trim().is_empty() {
        key_metrics.push(format!("Region: {}", report.company_info.region.trim()));
    }
    key_metrics.push(metadata_line(&report.metadata));

    let mut news: Vec<String> = report
        .industry_news
        .news
        .iter()
        .map(news_headline)
        .collect();
    if news.is_empty() {
        news.push("No industry news available.".to_string());
    }

    let mut insights: Vec<String> = report
        .narrative_paragraphs()
        .into_iter()
        .map(str::to_string)
        .collect();
    if insights.is_empty() {
        insights.push("No narrative analysis was provided.".to_string());
    }

    vec![
        Section::new("Key metrics", key_metrics),
        Section::new("News", news),
        Section::new("Insights", insights),
    ]
}

/// Writes to a sibling temp file and renames it into place.
async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let save_err = |detail: String| ExportError::new(ExportStage::Save, detail);

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| save_err(format!("failed to create {}: {e}", dir.display())))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("report.pdf");
    let tmp = dir.join(format!(".{file_name}.{}.part", uuid::Uuid::new_v4()));

    let result = async {
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| save_err(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| save_err(format!("failed to move pdf into {}: {e}", path.display())))
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::{merge_news, IndustryNews, NewsItem};
    use anyhow::anyhow;
    use image::Rgba;
    use serde_json::json;

    struct FakeSurface {
        snapshot: Option<RgbaImage>,
    }

    #[async_trait::async_trait]
    impl ReportSurface for FakeSurface {
        fn surface_name(&self) -> &str {
            "fake"
        }

        async fn capture(&self, oversample: u32) -> anyhow::Result<RgbaImage> {
            assert_eq!(oversample, DEFAULT_OVERSAMPLE);
            self.snapshot
                .clone()
                .ok_or_else(|| anyhow!("surface is detached"))
        }
    }

    fn news_item(title: &str, source: &str, date: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            category: "Analytics".to_string(),
            date: date.to_string(),
            source: source.to_string(),
            summary: String::new(),
        }
    }

    fn sample_report() -> AnalysisReport {
        serde_json::from_value(json!({
            "company_info": {
                "tin": "1234567890",
                "name": "Company X",
                "region": "Москва",
                "activity_code": "62.01",
                "full_info": {
                    "id": 1,
                    "tin": "1234567890",
                    "org_short_name": "Company X",
                    "activity_code_main": "62.01",
                    "region": "Москва"
                }
            },
            "profitability": {
                "predicted_revenue": 2847500.0,
                "predicted_pct_change": 0.125,
                "cluster": "growth",
                "last_revenue": 2531111.0
            },
            "industry_news": {"count": 0, "news": [], "total_available": 0},
            "ai_analysis": "Revenue grows.\n\nMargins hold.",
            "metadata": {"analysis_date": "2024-12-15T10:00:00", "processing_time_seconds": 2.5}
        }))
        .unwrap()
    }

    fn engine(dir: &Path) -> DocumentExportEngine {
        DocumentExportEngine::new(
            ExportSettings {
                output_dir: dir.to_path_buf(),
                ..ExportSettings::default()
            },
            RegionColorModel::default(),
        )
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 15).unwrap()
    }

    fn leftover_parts(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
                    .count()
            })
            .unwrap_or(0)
    }

    #[test]
    fn file_name_uses_iso_date() {
        assert_eq!(report_file_name(date()), "report-2024-12-15.pdf");
    }

    #[tokio::test]
    async fn snapshot_is_paginated_across_pages() {
        let dir = tempfile::tempdir().unwrap();
        // 200x600 px at 170 mm wide is 510 mm tall: 190 + 250 + 70.
        let surface = FakeSurface {
            snapshot: Some(RgbaImage::from_pixel(200, 600, Rgba([40, 90, 200, 255]))),
        };
        let report = sample_report();

        let doc = engine(dir.path())
            .export_report(ExportRequest {
                query: "Stock analysis for Company X",
                report: Some(&report),
                surface: Some(&surface),
                date: date(),
            })
            .await
            .unwrap();

        assert_eq!(doc.body, ExportBody::Snapshot);
        assert_eq!(doc.pages, 3);
        assert_eq!(doc.path, dir.path().join("report-2024-12-15.pdf"));
        let bytes = std::fs::read(&doc.path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(leftover_parts(dir.path()), 0);
    }

    #[tokio::test]
    async fn capture_failure_falls_back_to_text() {
        let dir = tempfile::tempdir().unwrap();
        let surface = FakeSurface { snapshot: None };
        let report = sample_report();

        let doc = engine(dir.path())
            .export_report(ExportRequest {
                query: "Company X",
                report: Some(&report),
                surface: Some(&surface),
                date: date(),
            })
            .await
            .unwrap();

        assert_eq!(doc.body, ExportBody::TextFallback);
        assert_eq!(doc.pages, 1);
        assert!(doc.path.exists());
    }

    #[tokio::test]
    async fn nothing_to_export_is_a_user_facing_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = engine(dir.path())
            .export_report(ExportRequest {
                query: "Company X",
                report: None,
                surface: None,
                date: date(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.stage, ExportStage::Fallback);
        assert_eq!(err.user_message(), error::USER_MESSAGE);
        assert!(!dir.path().join(report_file_name(date())).exists());
    }

    #[tokio::test]
    async fn save_failure_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let report = sample_report();

        let err = engine(&blocker)
            .export_report(ExportRequest {
                query: "Company X",
                report: Some(&report),
                surface: None,
                date: date(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.stage, ExportStage::Save);
        assert_eq!(leftover_parts(dir.path()), 0);
        assert_eq!(std::fs::read(&blocker).unwrap(), b"x");
    }

    #[test]
    fn fallback_sections_follow_fixed_order() {
        let sections = fallback_sections(&sample_report(), &RegionColorModel::default());
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Key metrics", "News", "Insights"]);
        assert_eq!(sections[0].bullets[0], "Company: Company X (TIN 1234567890)");
        assert!(sections[0].bullets.iter().any(|b| b == "Region: Москва"));
        assert_eq!(
            sections[0].bullets.last().map(String::as_str),
            Some("Analyzed at 2024-12-15 10:00 in 2.5 s")
        );
        assert_eq!(sections[1].bullets, ["No industry news available."]);
        assert_eq!(sections[2].bullets, ["Revenue grows.", "Margins hold."]);
    }

    #[test]
    fn enriched_news_is_listed_in_order() {
        let mut report = sample_report();
        let base = IndustryNews {
            count: 1,
            news: vec![news_item("Analyze headline", "Market Research", "2024-12-14")],
            total_available: 4,
        };
        let extra = IndustryNews {
            count: 1,
            news: vec![news_item("Enriched headline", "RBC", "2024-12-15")],
            total_available: 6,
        };
        report.industry_news = merge_news(base, extra);

        let sections = fallback_sections(&report, &RegionColorModel::default());
        assert_eq!(
            sections[1].bullets,
            [
                "Analyze headline (Market Research, 2024-12-14)",
                "Enriched headline (RBC, 2024-12-15)",
            ]
        );
        assert!(sections[0]
            .bullets
            .iter()
            .any(|b| b == "Industry news: 2 of 10 available"));
    }

    #[tokio::test]
    async fn footers_number_every_page_against_final_count() {
        let dir = tempfile::tempdir().unwrap();
        let surface = FakeSurface {
            snapshot: Some(RgbaImage::from_pixel(200, 600, Rgba([40, 90, 200, 255]))),
        };
        let engine = engine(dir.path());
        let request = ExportRequest {
            query: "Company X",
            report: None,
            surface: Some(&surface),
            date: date(),
        };

        let (canvas, body) = engine.render(&request).await.unwrap();
        assert_eq!(body, ExportBody::Snapshot);
        assert_eq!(canvas.page_count(), 3);

        for page in 1..=3 {
            let texts = canvas.placed_text(page);
            let labels: Vec<&str> = texts
                .iter()
                .copied()
                .filter(|t| t.starts_with("Page "))
                .collect();
            assert_eq!(labels, [format!("Page {page} of 3").as_str()]);
            assert!(texts.contains(&ATTRIBUTION));
        }
        assert!(canvas.placed_text(1).contains(&"Query: Company X"));
        assert!(!canvas.placed_text(2).contains(&"Query: Company X"));
    }

    #[test]
    fn empty_narrative_still_has_insights() {
        let mut report = sample_report();
        report.ai_analysis = "  ".to_string();
        let sections = fallback_sections(&report, &RegionColorModel::default());
        assert_eq!(sections[2].bullets, ["No narrative analysis was provided."]);
    }
}
