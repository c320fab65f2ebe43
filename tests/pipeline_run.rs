use anyhow::Result;
use std::cell::RefCell;
use sysout_triage::config::Config;
use sysout_triage::pipeline::Pipeline;
use sysout_triage::remote::{JobState, Orchestrator};
use sysout_triage::transcript::{BEGIN_MARKER, END_MARKER};

struct MockOrchestrator {
    transcript: String,
    launches: RefCell<Vec<(u32, Option<serde_json::Value>)>>,
}

impl MockOrchestrator {
    fn new(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            launches: RefCell::new(Vec::new()),
        }
    }
}

impl Orchestrator for &MockOrchestrator {
    fn launch(&self, template_id: u32, extra_vars: Option<serde_json::Value>) -> Result<u64> {
        self.launches.borrow_mut().push((template_id, extra_vars));
        Ok(140)
    }

    fn wait(&self, _job_id: u64) -> Result<JobState> {
        Ok(JobState::Successful)
    }

    fn stdout(&self, _job_id: u64) -> Result<String> {
        Ok(self.transcript.clone())
    }

    fn ping(&self) -> Result<u32> {
        Ok(4)
    }
}

fn sysout_transcript() -> String {
    format!(
        "TASK [fetch sysout] *****\n\
         {BEGIN_MARKER}\n\
         IEF403I SIDD01 - STARTED - TIME=10.15.32\\n$HASP395 SIDD01   ENDED - RC=0000\n\
         {END_MARKER}\n\
         ok: [zos01]\n"
    )
}

#[test]
fn sysout_command_requires_a_job_name() {
    let cfg = Config::default();
    let orchestrator = MockOrchestrator::new("");
    let pipeline = Pipeline::new(&cfg, &orchestrator);

    let err = pipeline.run_request("joboutput").unwrap_err();
    assert!(err.to_string().contains("requires a job name"));
    assert!(orchestrator.launches.borrow().is_empty());
}

#[test]
fn sysout_command_passes_jobname_extra_var() {
    let cfg = Config::default();
    let orchestrator = MockOrchestrator::new(&sysout_transcript());
    let pipeline = Pipeline::new(&cfg, &orchestrator);

    let out = pipeline.run_request("joboutput SIDD01").unwrap();

    let launches = orchestrator.launches.borrow();
    assert_eq!(launches.len(), 1);
    assert_eq!(launches[0].0, 15);
    assert_eq!(
        launches[0].1,
        Some(serde_json::json!({ "jobname": "sidd01" }))
    );

    assert_eq!(out.header, "Job 140 (`joboutput`) finished: SUCCESSFUL");
    assert!(out.report.inner_log_present);
    let inner = out.inner_log.as_deref().unwrap();
    assert!(inner.contains("IEF403I"));
    assert!(inner.contains('\n'), "escape tokens must become line breaks");
    assert!(out.analysis_markdown.as_deref().unwrap().contains("Successful"));
    // Inner-log lines never leak into the summary.
    assert!(!out.summary.contains("HASP395"));
}

#[test]
fn named_template_matches_by_substring() {
    let cfg = Config::default();
    let transcript = "PLAY [site] *****\nok: [zos01]\n";
    let orchestrator = MockOrchestrator::new(transcript);
    let pipeline = Pipeline::new(&cfg, &orchestrator);

    let out = pipeline.run_request("please run SIDDCUF now").unwrap();

    let launches = orchestrator.launches.borrow();
    assert_eq!(launches[0].0, 14);
    assert!(launches[0].1.is_none());
    assert!(out.analysis_markdown.is_none());
    assert!(out.summary.contains("PLAY [site]"));
    assert_eq!(out.report.template_name, "siddcuf");
}

#[test]
fn unknown_request_lists_known_templates() {
    let cfg = Config::default();
    let orchestrator = MockOrchestrator::new("");
    let pipeline = Pipeline::new(&cfg, &orchestrator);

    let err = pipeline.run_request("frobnicate the mainframe").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("could not identify"));
    assert!(msg.contains("siddcuf"));
}

#[test]
fn missing_sysout_degrades_to_warning_not_failure() {
    let cfg = Config::default();
    let orchestrator = MockOrchestrator::new("TASK [fetch sysout] *****\nok: [zos01]\n");
    let pipeline = Pipeline::new(&cfg, &orchestrator);

    let out = pipeline.run_request("joboutput sidd01").unwrap();
    assert!(!out.report.inner_log_present);
    assert!(out.inner_log.is_none());
    assert!(out.analysis_markdown.is_none());
}
