use crate::analysis::Analysis;
use crate::remote::JobState;
use crate::transcript::SummaryLine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub request: String,
    pub template_name: String,
    pub template_id: u32,
    pub job_id: u64,
    pub final_state: JobState,
    pub summary: Vec<SummaryLine>,
    pub inner_log_present: bool,
    pub analysis: Option<Analysis>,
}
