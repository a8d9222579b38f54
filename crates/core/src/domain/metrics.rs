use crate::domain::report::{AnalysisReport, NewsItem, ReportMetadata, Trend};
use chrono::NaiveDateTime;
use crate::map::regions::RegionColorModel;
use serde::Serialize;

const GROUP_SEPARATOR: char = '\u{a0}';

/// Formats an amount in roubles with grouped thousands and no fractional part,
/// e.g. `2 847 500 ₽`.
pub fn format_currency(amount: f64) -> String {
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i != 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(GROUP_SEPARATOR);
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped}{GROUP_SEPARATOR}₽")
}

/// Formats a signed fraction as a percentage with one decimal, e.g. `+12.5%`.
pub fn format_percentage(fraction: f64) -> String {
    // Adding 0.0 turns -0.0 into +0.0.
    let pct = fraction * 100.0 + 0.0;
    let sign = if pct >= 0.0 { "+" } else { "" };
    format!("{sign}{pct:.1}%")
}

/// One-line form of a news item: title, then source and date when present.
pub fn news_headline(item: &NewsItem) -> String {
    let details: Vec<&str> = [item.source.trim(), item.date.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    if details.is_empty() {
        item.title.trim().to_string()
    } else {
        format!("{} ({})", item.title.trim(), details.join(", "))
    }
}

/// `Analyzed at 2024-12-15 10:00 in 2.5 s`. Unparseable dates are shown as is.
pub fn metadata_line(meta: &ReportMetadata) -> String {
    let raw = meta.analysis_date.trim();
    let at = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string());
    format!("Analyzed at {at} in {:.1} s", meta.processing_time_seconds)
}

/// Display-ready view of a report, shared by chart renderers and the textual
/// export fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetrics {
    pub company_name: String,
    pub tin: String,
    pub predicted_revenue: String,
    pub last_revenue: String,
    pub pct_change: String,
    pub trend: Trend,
    pub cluster: String,
    pub news_count: usize,
    pub news_total_available: usize,
    pub highlighted_region: Option<String>,
}

impl ReportMetrics {
    pub fn from_report(report: &AnalysisReport, regions: &RegionColorModel) -> Self {
        let p = &report.profitability;
        let news = &report.industry_news;
        Self {
            company_name: report.company_info.name.clone(),
            tin: report.company_info.tin.clone(),
            predicted_revenue: format_currency(p.predicted_revenue),
            last_revenue: format_currency(p.last_revenue),
            pct_change: format_percentage(p.predicted_pct_change),
            trend: p.trend(),
            cluster: p.cluster.clone(),
            news_count: news.count,
            news_total_available: news.total_available,
            highlighted_region: regions
                .region_code(&report.company_info.region)
                .map(str::to_string),
        }
    }

    pub fn news_summary(&self) -> String {
        format!("{} of {}", self.news_count, self.news_total_available)
    }

    /// Bullet lines for the "Key metrics" section of a document.
    pub fn key_metric_lines(&self) -> Vec<String> {
        vec![
            format!("Company: {} (TIN {})", self.company_name, self.tin),
            format!(
                "Predicted revenue: {} ({})",
                self.predicted_revenue, self.pct_change
            ),
            format!("Last revenue: {}", self.last_revenue),
            format!("Cluster: {}", self.cluster),
            format!("Industry news: {} available", self.news_summary()),
        ]
    }
}
