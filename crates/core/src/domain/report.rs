use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: i64,
    pub tin: String,
    pub org_short_name: String,
    #[serde(default)]
    pub activity_code_main: Option<String>,
    #[serde(default)]
    pub region: String,
}

impl CompanyRecord {
    /// Activity code usable for news enrichment, if the record carries one.
    pub fn activity_code(&self) -> Option<&str> {
        self.activity_code_main
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Vec<CompanyRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub tin: String,
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub activity_code: String,
    pub full_info: CompanyRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profitability {
    pub predicted_revenue: f64,
    pub predicted_pct_change: f64,
    pub cluster: String,
    pub last_revenue: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Positive,
    Negative,
}

impl Profitability {
    pub fn trend(&self) -> Trend {
        if self.predicted_pct_change >= 0.0 {
            Trend::Positive
        } else {
            Trend::Negative
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndustryNews {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub news: Vec<NewsItem>,
    #[serde(default)]
    pub total_available: usize,
}

impl IndustryNews {
    /// Re-derives the counters from the news sequence so that
    /// `count == news.len()` and `total_available >= count` hold.
    pub fn normalized(mut self) -> Self {
        if self.count != self.news.len() {
            tracing::debug!(
                reported = self.count,
                actual = self.news.len(),
                "news count disagrees with payload; using payload length"
            );
            self.count = self.news.len();
        }
        self.total_available = self.total_available.max(self.count);
        self
    }
}

/// Concatenates `extra` after `base`, summing the counters.
pub fn merge_news(base: IndustryNews, extra: IndustryNews) -> IndustryNews {
    let mut news = base.news;
    news.extend(extra.news);
    IndustryNews {
        count: base.count + extra.count,
        news,
        total_available: base.total_available + extra.total_available,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub analysis_date: String,
    pub processing_time_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub company_info: CompanyInfo,
    pub profitability: Profitability,
    #[serde(default)]
    pub industry_news: IndustryNews,
    #[serde(default)]
    pub ai_analysis: String,
    pub metadata: ReportMetadata,
}

impl AnalysisReport {
    /// Narrative paragraphs, split on blank lines (or single newlines when the
    /// text has no blank lines).
    pub fn narrative_paragraphs(&self) -> Vec<&str> {
        let text = self.ai_analysis.trim();
        if text.is_empty() {
            return Vec::new();
        }
        let sep = if text.contains("\n\n") { "\n\n" } else { "\n" };
        text.split(sep)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(title: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            category: "Аналитика".to_string(),
            date: "2024-12-15".to_string(),
            source: "Market Research".to_string(),
            summary: String::new(),
        }
    }

    #[test]
    fn merge_appends_in_order_and_sums_counters() {
        let base = IndustryNews {
            count: 2,
            news: vec![item("a"), item("b")],
            total_available: 5,
        };
        let extra = IndustryNews {
            count: 1,
            news: vec![item("c")],
            total_available: 7,
        };

        let merged = merge_news(base, extra);
        assert_eq!(merged.count, 3);
        assert_eq!(merged.total_available, 12);
        let titles: Vec<_> = merged.news.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["a", "b", "c"]);
    }

    #[test]
    fn merge_with_empty_extra_is_identity() {
        let base = IndustryNews {
            count: 1,
            news: vec![item("a")],
            total_available: 4,
        };
        assert_eq!(merge_news(base.clone(), IndustryNews::default()), base);
    }

    #[test]
    fn normalized_repairs_inconsistent_counters() {
        let news = IndustryNews {
            count: 9,
            news: vec![item("a"), item("b")],
            total_available: 1,
        }
        .normalized();
        assert_eq!(news.count, 2);
        assert_eq!(news.total_available, 2);
    }

    #[test]
    fn trend_follows_sign_of_change() {
        let mut p = Profitability {
            predicted_revenue: 1.0,
            predicted_pct_change: 0.125,
            cluster: "A".to_string(),
            last_revenue: 1.0,
        };
        assert_eq!(p.trend(), Trend::Positive);
        p.predicted_pct_change = 0.0;
        assert_eq!(p.trend(), Trend::Positive);
        p.predicted_pct_change = -0.01;
        assert_eq!(p.trend(), Trend::Negative);
    }

    #[test]
    fn parses_analysis_payload_without_news() {
        let v = json!({
            "company_info": {
                "tin": "1234567890",
                "name": "ООО Ромашка",
                "region": "Москва",
                "activity_code": "62.01",
                "full_info": {
                    "id": 1,
                    "tin": "1234567890",
                    "org_short_name": "ООО Ромашка",
                    "activity_code_main": "62.01",
                    "region": "Москва"
                }
            },
            "profitability": {
                "predicted_revenue": 1.5e6,
                "predicted_pct_change": 0.125,
                "cluster": "growth",
                "last_revenue": 1.2e6
            },
            "ai_analysis": "First.\n\nSecond.",
            "metadata": {"analysis_date": "2024-12-15T10:00:00", "processing_time_seconds": 1.5}
        });

        let report: AnalysisReport = serde_json::from_value(v).unwrap();
        assert_eq!(report.industry_news, IndustryNews::default());
        assert_eq!(report.narrative_paragraphs(), ["First.", "Second."]);
        assert_eq!(report.company_info.full_info.activity_code(), Some("62.01"));
    }

    #[test]
    fn blank_activity_code_is_absent() {
        let record = CompanyRecord {
            id: 1,
            tin: "1".to_string(),
            org_short_name: "X".to_string(),
            activity_code_main: Some("  ".to_string()),
            region: String::new(),
        };
        assert_eq!(record.activity_code(), None);
    }
}
