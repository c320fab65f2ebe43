use regex::Regex;
use serde::{Deserialize, Serialize};

/// RACF login-success message id. Surfaced as a supplementary observation.
const RACF_SUCCESS_MARKER: &str = "ICH70001I";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Success,
    Warning,
    Failure,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Analysis {
    /// The provided log was empty; no pattern scan was attempted.
    Empty,
    Report(JobAnalysis),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobAnalysis {
    pub verdict: Verdict,
    pub job_name: Option<String>,
    pub return_code: Option<String>,
    pub abend_code: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub racf_authorized: bool,
    pub observations: Vec<String>,
}

/// Classifies a job log (the extracted sysout, or any raw log) into a
/// verdict plus supporting evidence.
///
/// Verdict invariant: an abend code forces `Failure` regardless of the
/// completion code; `Success` requires RC exactly `0000` with no abend;
/// a non-zero RC without an abend is `Warning`; anything else is `Unknown`.
pub fn analyze(log: &str) -> Analysis {
    if log.is_empty() {
        return Analysis::Empty;
    }

    let job_end = find_job_end(log);
    let (job_name, return_code) = match job_end {
        Some((name, rc)) => (Some(name), Some(rc)),
        None => (None, None),
    };
    let start_time = first_capture(log, r"IEF403I\s+\w+\s+-\s+STARTED\s+-\s+TIME=([\d.]+)");
    let end_time = first_capture(log, r"IEF404I\s+\w+\s+-\s+ENDED\s+-\s+TIME=([\d.]+)");
    let abend_code = find_abend_code(log);
    let racf_authorized = log.contains(RACF_SUCCESS_MARKER);

    let verdict = if abend_code.is_some() {
        Verdict::Failure
    } else {
        match return_code.as_deref() {
            Some("0000") => Verdict::Success,
            Some(_) => Verdict::Warning,
            None => Verdict::Unknown,
        }
    };

    let mut observations = Vec::new();
    if verdict == Verdict::Success {
        observations.push("All steps appear to have executed normally.".to_string());
        observations.push(
            "No error or warning messages were detected in the standard sections.".to_string(),
        );
    }
    if let Some(code) = &abend_code {
        observations.push(format!(
            "An ABEND ({code}) was detected. Examine the steps immediately preceding the \
             IEF404I (ENDED) message to find the cause of the failure."
        ));
    }
    if racf_authorized {
        observations.push("Security authorization via RACF was successful.".to_string());
    }
    observations.push(
        "Review the complete log for any application-specific messages or unexpected output."
            .to_string(),
    );

    Analysis::Report(JobAnalysis {
        verdict,
        job_name,
        return_code,
        abend_code,
        start_time,
        end_time,
        racf_authorized,
        observations,
    })
}

/// First abend code in the log, if any. The system form (`S` + 3 hex chars)
/// is scanned before the user form (`U` + 4 digits); both denote an abnormal
/// end and are equally severe.
///
/// Also serves as the triage dispatcher's reduced extraction, so the
/// classifier and the dispatcher cannot disagree about what counts as an
/// abend.
pub fn find_abend_code(log: &str) -> Option<String> {
    first_capture(log, r"(?i)ABEND\s*=\s*(S[0-9A-F]{3})")
        .or_else(|| first_capture(log, r"(?i)ABEND\s*=\s*(U[0-9]{4})"))
}

fn find_job_end(log: &str) -> Option<(String, String)> {
    let re = Regex::new(r"\$HASP395\s+(\w+)\s+ENDED\s+-\s+RC=(\d+)").ok()?;
    let caps = re.captures(log)?;
    Some((
        caps.get(1)?.as_str().to_string(),
        caps.get(2)?.as_str().to_string(),
    ))
}

// Patterns here are fixed literals; a compile failure degrades to "not
// matched" rather than surfacing a fault out of the classifier.
fn first_capture(log: &str, pattern: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    re.captures(log)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn render_markdown(analysis: &Analysis) -> String {
    let report = match analysis {
        Analysis::Empty => {
            return "The provided sysout log is empty. No analysis can be performed.".to_string();
        }
        Analysis::Report(r) => r,
    };

    let (status, conclusion) = verdict_line(report);
    let job_name = report.job_name.as_deref().unwrap_or("Unknown");
    let return_code = report.return_code.as_deref().unwrap_or("Unknown");
    let start_time = report.start_time.as_deref().unwrap_or("N/A");
    let end_time = report.end_time.as_deref().unwrap_or("N/A");

    let mut out = format!(
        "### 🧠 Log Analysis\n\n\
         Here's the analysis of the job log for **{job_name}**:\n\n\
         **1. Overall Status:** {status}\n   - **Conclusion:** {conclusion}\n\n\
         **2. Execution Details:**\n\
         \x20  - **Start Time:** `{start_time}`\n\
         \x20  - **End Time:** `{end_time}`\n\
         \x20  - **Final Return Code (RC):** `{return_code}`\n\n\
         **3. Key Observations:**\n"
    );
    for obs in &report.observations {
        out.push_str(&format!("- {obs}\n"));
    }
    out
}

fn verdict_line(report: &JobAnalysis) -> (String, String) {
    match report.verdict {
        Verdict::Failure => {
            let code = report.abend_code.as_deref().unwrap_or("Unknown");
            (
                "🔴 **Failed (Abend)**".to_string(),
                format!(
                    "The job failed with ABEND code **{code}**. This indicates a critical \
                     error that halted execution."
                ),
            )
        }
        Verdict::Success => (
            "🟢 **Successful**".to_string(),
            "The job completed successfully with a return code of **0000**, indicating no \
             errors."
                .to_string(),
        ),
        Verdict::Warning => {
            let rc = report.return_code.as_deref().unwrap_or("Unknown");
            (
                "🟡 **Warning/Check**".to_string(),
                format!(
                    "The job finished with a return code of **{rc}**. It did not abend, but \
                     this code suggests warnings or issues that may need review."
                ),
            )
        }
        Verdict::Unknown => (
            "⚪ **Unknown**".to_string(),
            "The final status of the job could not be determined from the log.".to_string(),
        ),
    }
}
