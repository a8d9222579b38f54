pub mod session;

use crate::client::AnalysisService;
use crate::domain::report::merge_news;
use session::{PipelineOutcome, Session, SubmitOutcome};
use std::sync::Arc;

pub const SEARCH_FAILED_MESSAGE: &str = "Could not search for companies. Please try again later.";
pub const ANALYZE_FAILED_MESSAGE: &str = "Could not analyze the company. Please try again later.";

/// Runs search → select → analyze → enrich for one query.
///
/// Search and analyze failures end the run; enrichment failures only drop
/// the extra news.
pub async fn run_pipeline(service: &dyn AnalysisService, query: &str) -> PipelineOutcome {
    let started = std::time::Instant::now();

    let found = match service.search_companies(query).await {
        Ok(found) => found,
        Err(err) => {
            tracing::error!(%query, error = %err, "company search failed");
            return PipelineOutcome::Failed {
                message: SEARCH_FAILED_MESSAGE.to_string(),
            };
        }
    };

    // First result wins.
    let Some(company) = found.data.into_iter().next() else {
        tracing::info!(%query, "company search returned no candidates");
        return PipelineOutcome::NotFound;
    };
    tracing::info!(
        %query,
        tin = %company.tin,
        name = %company.org_short_name,
        "selected company"
    );

    let mut report = match service.analyze_company(&company.tin).await {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(tin = %company.tin, error = %err, "company analysis failed");
            return PipelineOutcome::Failed {
                message: ANALYZE_FAILED_MESSAGE.to_string(),
            };
        }
    };
    report.industry_news = std::mem::take(&mut report.industry_news).normalized();

    if let Some(code) = company.activity_code() {
        match service.news_by_activity_code(code).await {
            Ok(extra) => {
                let extra = extra.normalized();
                tracing::debug!(code, added = extra.count, "merging industry news");
                report.industry_news =
                    merge_news(std::mem::take(&mut report.industry_news), extra);
            }
            Err(err) => {
                tracing::warn!(code, error = %err, "news enrichment failed; keeping analysis news");
            }
        }
    }

    tracing::info!(
        tin = %company.tin,
        news = report.industry_news.count,
        elapsed_ms = started.elapsed().as_millis(),
        "analysis resolved"
    );
    PipelineOutcome::Resolved(Box::new(report))
}

/// Owns the session and drives queries through the pipeline.
pub struct QueryOrchestrator {
    service: Arc<dyn AnalysisService>,
    session: Session,
}

impl QueryOrchestrator {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self {
            service,
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn submit_query(&mut self, text: &str) -> SubmitOutcome {
        let ticket = match self.session.begin(text) {
            Ok(ticket) => ticket,
            Err(reason) => {
                tracing::debug!(?reason, "query rejected");
                return SubmitOutcome::Rejected(reason);
            }
        };
        let outcome = run_pipeline(self.service.as_ref(), ticket.query()).await;
        self.session.complete(ticket, outcome)
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }
}
