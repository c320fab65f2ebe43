use serde::{Deserialize, Serialize};

/// Sentinels the remote playbook prints around the mainframe sysout. The
/// extractor depends on these verbatim.
pub const BEGIN_MARKER: &str = "--- BEGIN MAINFRAME JOB LOG ---";
pub const END_MARKER: &str = "--- END MAINFRAME JOB LOG ---";

/// The playbook emits the sysout as a single line with literal `\n`
/// two-character sequences, not real line breaks.
const ESCAPED_NEWLINE: &str = "\\n";

/// Extracts the mainframe job log embedded between the sentinel markers.
///
/// Returns `None` when either marker is absent or the end marker does not
/// follow the begin marker — a normal outcome for jobs that print no sysout,
/// not an error. Only the first marker pair is honored.
pub fn extract_inner_log(transcript: &str) -> Option<String> {
    let begin = transcript.find(BEGIN_MARKER)?;
    let content_start = begin + BEGIN_MARKER.len();
    let end = transcript[content_start..].find(END_MARKER)?;

    let content = &transcript[content_start..content_start + end];
    Some(content.replace(ESCAPED_NEWLINE, "\n").trim().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryKind {
    SectionHeader,
    TaskStatus,
    FinalRecap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryLine {
    pub kind: SummaryKind,
    pub text: String,
}

const TASK_STATUS_PREFIXES: &[&str] = &[
    "ok:",
    "changed:",
    "failed:",
    "fatal:",
    "skipping:",
    "unreachable:",
];

/// Scans the full orchestration transcript and keeps the structurally
/// interesting lines, in transcript order. Lines inside the marker-delimited
/// mainframe log are always suppressed; that segment has its own classifier.
pub fn summarize(transcript: &str) -> Vec<SummaryLine> {
    let mut lines = Vec::new();
    let mut in_inner_log = false;

    for line in transcript.lines() {
        if line.contains(BEGIN_MARKER) {
            in_inner_log = true;
            continue;
        }
        if line.contains(END_MARKER) {
            in_inner_log = false;
            continue;
        }
        if in_inner_log {
            continue;
        }
        if let Some(kept) = classify_line(line.trim()) {
            lines.push(kept);
        }
    }

    lines
}

pub fn render_summary(lines: &[SummaryLine]) -> String {
    lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

// First match wins; lines matching nothing are dropped silently. This is an
// extraction filter, not a validator.
fn classify_line(line: &str) -> Option<SummaryLine> {
    if line.starts_with("PLAY [") || line.starts_with("TASK [") {
        return Some(keep(SummaryKind::SectionHeader, line));
    }
    if line.starts_with("PLAY RECAP") {
        return Some(keep(SummaryKind::FinalRecap, line));
    }
    if TASK_STATUS_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return Some(keep(SummaryKind::TaskStatus, line));
    }
    // Per-host recap line, e.g. "zos01 : ok=4 changed=1 unreachable=0 ..."
    if line.contains("ok=") && line.contains("changed=") {
        return Some(keep(SummaryKind::FinalRecap, line));
    }
    None
}

fn keep(kind: SummaryKind, line: &str) -> SummaryLine {
    SummaryLine {
        kind,
        text: line.to_string(),
    }
}
