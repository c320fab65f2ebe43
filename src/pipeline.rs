use crate::{
    analysis,
    config::Config,
    remote::Orchestrator,
    report::JobReport,
    transcript,
};
use anyhow::{Result, anyhow};
use serde_json::json;
use tracing::{info, warn};

pub struct Pipeline<O: Orchestrator> {
    cfg: Config,
    orchestrator: O,
}

#[derive(Debug)]
pub struct RunOutput {
    pub header: String,
    pub summary: String,
    pub inner_log: Option<String>,
    pub analysis_markdown: Option<String>,
    pub report: JobReport,
}

struct ResolvedTemplate {
    name: String,
    id: u32,
    extra_vars: Option<serde_json::Value>,
}

impl<O: Orchestrator> Pipeline<O> {
    pub fn new(cfg: &Config, orchestrator: O) -> Self {
        Self {
            cfg: cfg.clone(),
            orchestrator,
        }
    }

    /// Maps a natural-language request onto a job template, launches it,
    /// waits for a terminal state, and turns the transcript into a report.
    pub fn run_request(&self, request: &str) -> Result<RunOutput> {
        let resolved = self.resolve_request(request)?;
        info!(
            "launching template {} (id {})",
            resolved.name, resolved.id
        );

        let job_id = self.orchestrator.launch(resolved.id, resolved.extra_vars)?;
        info!("job {job_id} launched, waiting for completion");
        let final_state = self.orchestrator.wait(job_id)?;
        info!("job {job_id} finished: {}", final_state.as_str());

        // A missing transcript degrades the report, it does not fail the run.
        let full_log = match self.orchestrator.stdout(job_id) {
            Ok(text) => text,
            Err(err) => {
                warn!("fetching stdout for job {job_id} failed: {err:#}");
                String::new()
            }
        };

        let header = format!(
            "Job {job_id} (`{}`) finished: {}",
            resolved.name,
            final_state.as_str().to_uppercase()
        );

        let summary_lines = transcript::summarize(&full_log);
        let is_sysout_run = resolved.name == self.cfg.templates.sysout_template;

        let (inner_log, log_analysis) = if is_sysout_run {
            match transcript::extract_inner_log(&full_log) {
                Some(log) => {
                    let result = analysis::analyze(&log);
                    (Some(log), Some(result))
                }
                None => {
                    warn!("could not locate the mainframe sysout in the job transcript");
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        let analysis_markdown = log_analysis.as_ref().map(analysis::render_markdown);
        let report = JobReport {
            request: request.to_string(),
            template_name: resolved.name,
            template_id: resolved.id,
            job_id,
            final_state,
            inner_log_present: inner_log.is_some(),
            analysis: log_analysis,
            summary: summary_lines.clone(),
        };

        Ok(RunOutput {
            header,
            summary: transcript::render_summary(&summary_lines),
            inner_log,
            analysis_markdown,
            report,
        })
    }

    // The sysout template is a command form taking a job name argument;
    // everything else matches on the first configured template name the
    // request mentions.
    fn resolve_request(&self, request: &str) -> Result<ResolvedTemplate> {
        let templates = &self.cfg.templates;
        let lowered = request.to_lowercase();
        let mut words = lowered.split_whitespace();
        let trigger = words.next().unwrap_or_default();

        if trigger == templates.sysout_template {
            let id = *templates.mapping.get(trigger).ok_or_else(|| {
                anyhow!("template `{trigger}` has no configured id")
            })?;
            let jobname = words.next().ok_or_else(|| {
                anyhow!(
                    "this command requires a job name. Usage: `{} <job_name>`",
                    templates.sysout_template
                )
            })?;
            return Ok(ResolvedTemplate {
                name: trigger.to_string(),
                id,
                extra_vars: Some(json!({ "jobname": jobname })),
            });
        }

        for (name, id) in &templates.mapping {
            if lowered.contains(name.as_str()) {
                return Ok(ResolvedTemplate {
                    name: name.clone(),
                    id: *id,
                    extra_vars: None,
                });
            }
        }

        let known = templates
            .mapping
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        Err(anyhow!(
            "could not identify a valid job in the request; known templates: {known}"
        ))
    }
}
