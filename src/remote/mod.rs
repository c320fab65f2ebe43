pub mod http;
pub mod types;

use anyhow::Result;

pub use types::{JobState, ServiceDiag, WorkInstruction};

/// The job orchestration server: launch a named template, poll to a terminal
/// state, fetch the run transcript. Constructed once per process and passed
/// into the pipeline.
pub trait Orchestrator {
    fn launch(&self, template_id: u32, extra_vars: Option<serde_json::Value>) -> Result<u64>;
    fn wait(&self, job_id: u64) -> Result<JobState>;
    fn stdout(&self, job_id: u64) -> Result<String>;
    /// Connectivity check; returns the number of templates visible.
    fn ping(&self) -> Result<u32>;
}

/// Similarity lookup over the work-instruction knowledge base. An `Err` means
/// the service could not be reached; an empty result set is a normal outcome.
pub trait KnowledgeBase {
    fn lookup(&self, key: &str, top_k: u32) -> Result<Vec<WorkInstruction>>;
    fn ping(&self) -> Result<()>;
}

/// Generative inference service. Prompt in, free text out.
pub trait Generator {
    fn complete(&self, prompt: &str) -> Result<String>;
    fn ping(&self) -> Result<()>;
}
