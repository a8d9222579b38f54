pub mod error;
pub mod http;

use crate::domain::report::{AnalysisReport, IndustryNews, SearchResponse};

/// Remote collaborators of the query pipeline.
#[async_trait::async_trait]
pub trait AnalysisService: Send + Sync {
    fn service_name(&self) -> &'static str;

    async fn search_companies(&self, query: &str) -> anyhow::Result<SearchResponse>;

    async fn analyze_company(&self, tin: &str) -> anyhow::Result<AnalysisReport>;

    async fn news_by_activity_code(&self, code: &str) -> anyhow::Result<IndustryNews>;
}
