use analyst_core::domain::metrics::{metadata_line, news_headline, ReportMetrics};
use analyst_core::domain::report::{AnalysisReport, Trend};
use analyst_core::export::{DocumentExportEngine, ExportRequest, ImageFileSurface, ReportSurface};
use analyst_core::map::regions::RegionColorModel;
use analyst_core::map::svg::MapDocument;
use analyst_core::map::MapHighlightEngine;
use analyst_core::orchestrator::session::{RejectReason, Role, Session, SubmitOutcome};
use analyst_core::orchestrator::QueryOrchestrator;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const HELP: &str = "Ask about a company by name or tax ID.\n\
Commands: /export  save the report as PDF\n          \
/map     write the region map\n          \
/new     start a new conversation\n          \
/quit    exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    Export,
    Map,
    New,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(cmd) = line.strip_prefix('/') else {
        return Command::Ask(line.to_string());
    };
    match cmd.split_whitespace().next().unwrap_or("") {
        "export" => Command::Export,
        "map" => Command::Map,
        "new" | "reset" => Command::New,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    }
}

pub fn metric_lines(metrics: &ReportMetrics) -> Vec<String> {
    let mut lines = metrics.key_metric_lines();
    let trend = match metrics.trend {
        Trend::Positive => "up",
        Trend::Negative => "down",
    };
    lines.push(format!("Trend: {trend} ({})", metrics.pct_change));
    match &metrics.highlighted_region {
        Some(code) => lines.push(format!("Region on map: {code}")),
        None => lines.push("Region on map: not found".to_string()),
    }
    lines
}

/// News headlines with their summaries, then when and how fast the analysis ran.
pub fn news_lines(report: &AnalysisReport) -> Vec<String> {
    let mut lines = Vec::new();
    if report.industry_news.news.is_empty() {
        lines.push("News: none available".to_string());
    }
    for item in &report.industry_news.news {
        lines.push(format!("- {}", news_headline(item)));
        if !item.summary.trim().is_empty() {
            lines.push(format!("    {}", item.summary.trim()));
        }
    }
    lines.push(metadata_line(&report.metadata));
    lines
}

/// Query shown in an exported header: the one that produced the report, not a
/// later query that failed.
fn export_query(session: &Session) -> &str {
    session.report_query().unwrap_or_else(|| session.query())
}

pub struct MapOptions {
    pub svg_path: Option<PathBuf>,
    pub out_path: PathBuf,
}

pub struct ChatApp {
    orchestrator: QueryOrchestrator,
    exporter: DocumentExportEngine,
    snapshot: Option<ImageFileSurface>,
    map: MapOptions,
    regions: RegionColorModel,
    printed: usize,
}

impl ChatApp {
    pub fn new(
        orchestrator: QueryOrchestrator,
        exporter: DocumentExportEngine,
        snapshot: Option<ImageFileSurface>,
        map: MapOptions,
    ) -> Self {
        Self {
            orchestrator,
            exporter,
            snapshot,
            map,
            regions: RegionColorModel::default(),
            printed: 0,
        }
    }

    pub async fn ask(&mut self, query: &str) -> SubmitOutcome {
        let outcome = self.orchestrator.submit_query(query).await;
        match outcome {
            SubmitOutcome::Rejected(RejectReason::EmptyQuery) => {}
            SubmitOutcome::Rejected(RejectReason::AlreadyPending) => {
                println!("Still working on the previous question.");
            }
            _ => {
                self.print_new_messages();
                if outcome == SubmitOutcome::Resolved {
                    self.print_metrics();
                }
            }
        }
        outcome
    }

    fn print_new_messages(&mut self) {
        let transcript = self.orchestrator.session().transcript();
        for msg in transcript.iter().skip(self.printed) {
            let who = match msg.role {
                Role::User => "you",
                Role::Assistant => "assistant",
            };
            println!("[{}] {who}: {}", msg.timestamp.format("%H:%M:%S"), msg.content);
        }
        self.printed = transcript.len();
    }

    fn print_metrics(&self) {
        let Some(report) = self.orchestrator.session().report() else {
            return;
        };
        let metrics = ReportMetrics::from_report(report, &self.regions);
        for line in metric_lines(&metrics).into_iter().chain(news_lines(report)) {
            println!("  {line}");
        }
        for paragraph in report.narrative_paragraphs() {
            println!();
            println!("  {paragraph}");
        }
    }

    /// Exports the current report. Export failures are reported to the user and
    /// are not fatal for the session.
    pub async fn export(&self) -> Option<PathBuf> {
        let session = self.orchestrator.session();
        let request = ExportRequest {
            query: export_query(session),
            report: session.report(),
            surface: self.snapshot.as_ref().map(|s| s as &dyn ReportSurface),
            date: chrono::Local::now().date_naive(),
        };
        match self.exporter.export_report(request).await {
            Ok(doc) => {
                println!("Saved {} ({} pages)", doc.path.display(), doc.pages);
                Some(doc.path)
            }
            Err(err) => {
                tracing::warn!(error = %err, "export failed");
                println!("{}", err.user_message());
                None
            }
        }
    }

    pub async fn write_map(&self) -> Result<PathBuf> {
        let svg_path = self
            .map
            .svg_path
            .as_deref()
            .context("no region map configured; pass --map or set MAP_SVG_PATH")?;
        let source = tokio::fs::read_to_string(svg_path)
            .await
            .with_context(|| format!("failed to read map {}", svg_path.display()))?;

        let mut engine = MapHighlightEngine::new(MapDocument::parse(source)?, self.regions.clone());
        if let Some(report) = self.orchestrator.session().report() {
            if engine
                .bind_highlight_by_name(&report.company_info.region)
                .is_none()
            {
                tracing::info!(
                    region = %report.company_info.region,
                    "company region has no map id; rendering without highlight"
                );
            }
        }

        let rendered = engine.render_svg()?;
        write_file(&self.map.out_path, rendered.as_bytes()).await?;

        let stats = self.regions.stats();
        println!(
            "Map written to {} (highlighted: {}, {} regions, mean activity {:.1})",
            self.map.out_path.display(),
            engine.highlighted().unwrap_or("none"),
            stats.regions,
            stats.mean_value
        );
        Ok(self.map.out_path.clone())
    }

    pub fn reset(&mut self) {
        self.orchestrator.reset();
        self.printed = 0;
        println!("Started a new conversation.");
    }

    pub async fn run_interactive(&mut self) -> Result<()> {
        println!("{HELP}");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        loop {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
                break;
            };

            match parse_command(&line) {
                Command::Empty => {}
                Command::Ask(query) => {
                    self.ask(&query).await;
                }
                Command::Export => {
                    self.export().await;
                }
                Command::Map => {
                    if let Err(err) = self.write_map().await {
                        tracing::warn!(error = %err, "map rendering failed");
                        println!("Could not render the map: {err:#}");
                    }
                }
                Command::New => self.reset(),
                Command::Help => println!("{HELP}"),
                Command::Quit => break,
                Command::Unknown(name) => println!("Unknown command /{name}. Type /help."),
            }
        }
        Ok(())
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_core::domain::report::{
        CompanyInfo, CompanyRecord, IndustryNews, NewsItem, Profitability, ReportMetadata,
    };
    use analyst_core::orchestrator::session::PipelineOutcome;

    fn report(news: Vec<NewsItem>) -> AnalysisReport {
        AnalysisReport {
            company_info: CompanyInfo {
                tin: "1234567890".to_string(),
                name: "Company X".to_string(),
                region: "Москва".to_string(),
                activity_code: "62.01".to_string(),
                full_info: CompanyRecord {
                    id: 1,
                    tin: "1234567890".to_string(),
                    org_short_name: "Company X".to_string(),
                    activity_code_main: Some("62.01".to_string()),
                    region: "Москва".to_string(),
                },
            },
            profitability: Profitability {
                predicted_revenue: 2_847_500.0,
                predicted_pct_change: 0.125,
                cluster: "growth".to_string(),
                last_revenue: 2_531_111.0,
            },
            industry_news: IndustryNews {
                count: news.len(),
                total_available: news.len(),
                news,
            },
            ai_analysis: String::new(),
            metadata: ReportMetadata {
                analysis_date: "2024-12-15T10:00:00".to_string(),
                processing_time_seconds: 2.5,
            },
        }
    }

    #[test]
    fn plain_text_is_a_question() {
        assert_eq!(
            parse_command("  Stock analysis for Company X "),
            Command::Ask("Stock analysis for Company X".to_string())
        );
        assert_eq!(parse_command("   "), Command::Empty);
    }

    #[test]
    fn slash_commands() {
        assert_eq!(parse_command("/export"), Command::Export);
        assert_eq!(parse_command("/map now"), Command::Map);
        assert_eq!(parse_command("/new"), Command::New);
        assert_eq!(parse_command("/quit"), Command::Quit);
        assert_eq!(parse_command("/frobnicate"), Command::Unknown("frobnicate".to_string()));
    }

    #[test]
    fn metric_lines_include_trend_and_region() {
        let metrics = ReportMetrics {
            company_name: "Company X".to_string(),
            tin: "1234567890".to_string(),
            predicted_revenue: "2\u{a0}847\u{a0}500\u{a0}₽".to_string(),
            last_revenue: "2\u{a0}531\u{a0}111\u{a0}₽".to_string(),
            pct_change: "+12.5%".to_string(),
            trend: Trend::Positive,
            cluster: "growth".to_string(),
            news_count: 3,
            news_total_available: 10,
            highlighted_region: Some("RU-MOW".to_string()),
        };
        let lines = metric_lines(&metrics);
        assert!(lines.contains(&"Trend: up (+12.5%)".to_string()));
        assert!(lines.contains(&"Region on map: RU-MOW".to_string()));
        assert!(lines.contains(&"Industry news: 3 of 10 available".to_string()));
    }

    #[test]
    fn news_lines_show_headlines_summaries_and_timing() {
        let lines = news_lines(&report(vec![NewsItem {
            title: "IT sector grows".to_string(),
            category: "Analytics".to_string(),
            date: "2024-12-14".to_string(),
            source: "RBC".to_string(),
            summary: "Demand for software is up.".to_string(),
        }]));
        assert_eq!(
            lines,
            [
                "- IT sector grows (RBC, 2024-12-14)",
                "    Demand for software is up.",
                "Analyzed at 2024-12-15 10:00 in 2.5 s",
            ]
        );

        let empty = news_lines(&report(Vec::new()));
        assert_eq!(empty[0], "News: none available");
    }

    #[test]
    fn export_keeps_query_of_the_shown_report() {
        let mut session = Session::new();
        let ticket = session.begin("Company X").unwrap();
        session.complete(ticket, PipelineOutcome::Resolved(Box::new(report(Vec::new()))));
        assert_eq!(export_query(&session), "Company X");

        let ticket = session.begin("Company Y").unwrap();
        session.complete(
            ticket,
            PipelineOutcome::Failed {
                message: "service unavailable".to_string(),
            },
        );
        assert_eq!(session.query(), "Company Y");
        assert_eq!(export_query(&session), "Company X");

        session.reset();
        let ticket = session.begin("Company Z").unwrap();
        session.complete(ticket, PipelineOutcome::NotFound);
        assert_eq!(export_query(&session), "Company Z");
    }
}
