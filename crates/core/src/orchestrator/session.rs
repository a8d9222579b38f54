use crate::domain::report::AnalysisReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const NOT_FOUND_MESSAGE: &str =
    "No company matched your request. Try the full company name or its tax ID.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Pending,
    Resolved,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyQuery,
    AlreadyPending,
}

/// Handle for one in-flight query. Only a ticket from the session's current
/// generation can write its outcome back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTicket {
    generation: u64,
    query: String,
}

impl QueryTicket {
    pub fn query(&self) -> &str {
        &self.query
    }
}

/// Terminal result of one search → analyze → enrich run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    NotFound,
    Resolved(Box<AnalysisReport>),
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Resolved,
    NotFound,
    Failed,
    Rejected(RejectReason),
    /// The session was reset while the query was in flight.
    Discarded,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    state: SessionState,
    query: String,
    transcript: Vec<TranscriptMessage>,
    report: Option<AnalysisReport>,
    report_query: Option<String>,
    error: Option<String>,
    #[serde(skip)]
    generation: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            query: String::new(),
            transcript: Vec::new(),
            report: None,
            report_query: None,
            error: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn transcript(&self) -> &[TranscriptMessage] {
        &self.transcript
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        self.report.as_ref()
    }

    /// The query that produced the current report. Differs from `query()`
    /// when a later query failed or found nothing.
    pub fn report_query(&self) -> Option<&str> {
        self.report_query.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_input_ready(&self) -> bool {
        self.state != SessionState::Pending
    }

    /// Validates a submission and moves the session to Pending.
    pub fn begin(&mut self, text: &str) -> Result<QueryTicket, RejectReason> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RejectReason::EmptyQuery);
        }
        if self.state == SessionState::Pending {
            return Err(RejectReason::AlreadyPending);
        }

        self.state = SessionState::Pending;
        self.error = None;
        self.query = text.to_string();
        self.transcript
            .push(TranscriptMessage::new(Role::User, text));

        Ok(QueryTicket {
            generation: self.generation,
            query: self.query.clone(),
        })
    }

    /// Writes a pipeline outcome back, unless the session has been reset since
    /// the ticket was issued.
    pub fn complete(&mut self, ticket: QueryTicket, outcome: PipelineOutcome) -> SubmitOutcome {
        if ticket.generation != self.generation || self.state != SessionState::Pending {
            tracing::info!(
                query = %ticket.query,
                "dropping late result for a session that has moved on"
            );
            return SubmitOutcome::Discarded;
        }

        match outcome {
            PipelineOutcome::NotFound => {
                self.state = SessionState::Idle;
                self.push_assistant(NOT_FOUND_MESSAGE);
                SubmitOutcome::NotFound
            }
            PipelineOutcome::Resolved(report) => {
                let summary = format!(
                    "Found {} (TIN {}). The analysis is ready to view.",
                    report.company_info.name, report.company_info.tin
                );
                self.report = Some(*report);
                self.report_query = Some(ticket.query);
                self.state = SessionState::Resolved;
                self.push_assistant(summary);
                SubmitOutcome::Resolved
            }
            PipelineOutcome::Failed { message } => {
                self.state = SessionState::Failed;
                self.push_assistant(message.clone());
                self.error = Some(message);
                SubmitOutcome::Failed
            }
        }
    }

    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = SessionState::Idle;
        self.query.clear();
        self.transcript.clear();
        self.report = None;
        self.report_query = None;
        self.error = None;
    }

    fn push_assistant(&mut self, content: impl Into<String>) {
        self.transcript
            .push(TranscriptMessage::new(Role::Assistant, content));
    }
}
