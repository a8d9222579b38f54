use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Search,
    Analyze,
    News,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Search => "search",
            Stage::Analyze => "analyze",
            Stage::News => "news",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceError {
    pub stage: Stage,
    pub status: Option<u16>,
    pub detail: String,
    pub raw_response_json: Option<Value>,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "analysis service error (stage={}, status={status}): {}",
                self.stage.as_str(),
                self.detail
            ),
            None => write!(
                f,
                "analysis service error (stage={}): {}",
                self.stage.as_str(),
                self.detail
            ),
        }
    }
}

impl std::error::Error for ServiceError {}
