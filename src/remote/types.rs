use serde::{Deserialize, Serialize};

/// Terminal states an orchestration job can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Successful,
    Failed,
    Error,
    Canceled,
}

impl JobState {
    /// Maps an AWX `status` string to a terminal state; non-terminal
    /// statuses (pending, waiting, running) return `None`.
    pub fn parse_terminal(status: &str) -> Option<JobState> {
        match status {
            "successful" => Some(JobState::Successful),
            "failed" => Some(JobState::Failed),
            "error" => Some(JobState::Error),
            "canceled" => Some(JobState::Canceled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Successful => "successful",
            JobState::Failed => "failed",
            JobState::Error => "error",
            JobState::Canceled => "canceled",
        }
    }
}

/// One remediation document from the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkInstruction {
    #[serde(default)]
    pub error_code: Option<String>,
    pub title: String,
    pub resolution_steps: String,
}

/// Connectivity diagnosis for the three external services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDiag {
    pub awx_ok: bool,
    pub awx_templates: Option<u32>,
    pub awx_error: Option<String>,
    pub knowledge_ok: bool,
    pub knowledge_error: Option<String>,
    pub generator_ok: bool,
    pub generator_error: Option<String>,
}

// Response envelopes for the AWX REST API and the knowledge lookup service.

#[derive(Debug, Deserialize)]
pub struct LaunchResponse {
    pub job: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct JobDetail {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct TemplatePage {
    pub count: u32,
}

#[derive(Debug, Deserialize)]
pub struct LookupResponse {
    #[serde(default)]
    pub results: Vec<WorkInstruction>,
}
