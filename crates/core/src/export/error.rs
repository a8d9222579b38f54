use std::fmt;

/// Message shown to the user for any fatal export failure.
pub const USER_MESSAGE: &str = "Could not create the PDF file. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Document,
    Fallback,
    Save,
}

impl ExportStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportStage::Document => "document",
            ExportStage::Fallback => "fallback",
            ExportStage::Save => "save",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportError {
    pub stage: ExportStage,
    pub detail: String,
}

impl ExportError {
    pub(crate) fn new(stage: ExportStage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            detail: detail.into(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        USER_MESSAGE
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pdf export failed (stage={}): {}",
            self.stage.as_str(),
            self.detail
        )
    }
}

impl std::error::Error for ExportError {}
