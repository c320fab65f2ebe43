use anyhow::{Result, bail};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use sysout_triage::config::Config;
use sysout_triage::remote::{Generator, KnowledgeBase, WorkInstruction};
use sysout_triage::triage::{CancelToken, Triage, TriageOutcome};

struct MockKnowledge {
    calls: Cell<u32>,
    fail_times: u32,
    results: Vec<WorkInstruction>,
}

impl MockKnowledge {
    fn new(fail_times: u32, results: Vec<WorkInstruction>) -> Self {
        Self {
            calls: Cell::new(0),
            fail_times,
            results,
        }
    }
}

impl KnowledgeBase for &MockKnowledge {
    fn lookup(&self, _key: &str, _top_k: u32) -> Result<Vec<WorkInstruction>> {
        let n = self.calls.get() + 1;
        self.calls.set(n);
        if n <= self.fail_times {
            bail!("connection refused");
        }
        Ok(self.results.clone())
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }
}

struct MockGenerator {
    calls: Cell<u32>,
    // None = the call fails.
    responses: RefCell<VecDeque<Option<String>>>,
}

impl MockGenerator {
    fn new(responses: Vec<Option<&str>>) -> Self {
        Self {
            calls: Cell::new(0),
            responses: RefCell::new(
                responses
                    .into_iter()
                    .map(|r| r.map(str::to_string))
                    .collect(),
            ),
        }
    }
}

impl Generator for &MockGenerator {
    fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.set(self.calls.get() + 1);
        match self.responses.borrow_mut().pop_front() {
            Some(Some(text)) => Ok(text),
            Some(None) => bail!("generator down"),
            None => bail!("unexpected generator call"),
        }
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }
}

fn instruction(title: &str) -> WorkInstruction {
    WorkInstruction {
        error_code: Some("S0C7".to_string()),
        title: title.to_string(),
        resolution_steps: "Check the input data for invalid packed decimals.".to_string(),
    }
}

#[test]
fn scenario_e_clean_run_short_circuits() {
    let cfg = Config::default();
    let knowledge = MockKnowledge::new(0, vec![instruction("unused")]);
    let generator = MockGenerator::new(vec![Some("RC=0000")]);
    let triage = Triage::new(&cfg, &knowledge, &generator);

    let report = triage
        .run("$HASP395 JOB1 ENDED - RC=0000", &CancelToken::new())
        .unwrap();

    assert_eq!(report.outcome, TriageOutcome::CleanRun);
    assert_eq!(report.key, "RC=0000");
    assert_eq!(knowledge.calls.get(), 0, "lookup must be skipped");
    assert_eq!(generator.calls.get(), 1, "only key inference may run");
}

#[test]
fn abend_code_bypasses_inference() {
    let cfg = Config::default();
    let knowledge = MockKnowledge::new(0, vec![instruction("S0C7 data exception")]);
    let generator = MockGenerator::new(vec![Some("Executive summary...")]);
    let triage = Triage::new(&cfg, &knowledge, &generator);

    let report = triage
        .run("STEP1 - ABEND=S0C7\nRC=0012", &CancelToken::new())
        .unwrap();

    assert_eq!(report.key, "S0C7");
    assert_eq!(report.outcome, TriageOutcome::Remediation);
    assert_eq!(report.body, "Executive summary...");
    // One generator call: synthesis. Key inference never ran.
    assert_eq!(generator.calls.get(), 1);
    assert_eq!(knowledge.calls.get(), 1);
}

#[test]
fn generator_fault_degrades_to_key_undetermined() {
    let cfg = Config::default();
    let knowledge = MockKnowledge::new(0, vec![]);
    let generator = MockGenerator::new(vec![None]);
    let triage = Triage::new(&cfg, &knowledge, &generator);

    let report = triage.run("no recognizable codes", &CancelToken::new()).unwrap();

    assert_eq!(report.outcome, TriageOutcome::KeyUndetermined);
    assert_eq!(report.key, "unknown");
    assert_eq!(knowledge.calls.get(), 0);
}

#[test]
fn lookup_fault_is_retried_once_then_degrades() {
    let cfg = Config::default();
    let knowledge = MockKnowledge::new(2, vec![instruction("unreached")]);
    let generator = MockGenerator::new(vec![]);
    let triage = Triage::new(&cfg, &knowledge, &generator);

    let report = triage.run("ABEND=S0C7", &CancelToken::new()).unwrap();

    assert_eq!(report.outcome, TriageOutcome::KnowledgeUnavailable);
    assert_eq!(knowledge.calls.get(), 2, "exactly one retry");
    assert_eq!(generator.calls.get(), 0, "synthesis must be skipped");
}

#[test]
fn lookup_retry_can_recover() {
    let cfg = Config::default();
    let knowledge = MockKnowledge::new(1, vec![instruction("S0C7 data exception")]);
    let generator = MockGenerator::new(vec![Some("Root cause...")]);
    let triage = Triage::new(&cfg, &knowledge, &generator);

    let report = triage.run("ABEND=S0C7", &CancelToken::new()).unwrap();

    assert_eq!(report.outcome, TriageOutcome::Remediation);
    assert_eq!(knowledge.calls.get(), 2);
}

#[test]
fn empty_result_set_reports_no_instructions() {
    let cfg = Config::default();
    let knowledge = MockKnowledge::new(0, vec![]);
    let generator = MockGenerator::new(vec![]);
    let triage = Triage::new(&cfg, &knowledge, &generator);

    let report = triage.run("ABEND=U4038", &CancelToken::new()).unwrap();

    assert_eq!(report.outcome, TriageOutcome::NoInstructions);
    assert_eq!(generator.calls.get(), 0);
}

#[test]
fn synthesis_fault_degrades_to_message() {
    let cfg = Config::default();
    let knowledge = MockKnowledge::new(0, vec![instruction("S0C7 data exception")]);
    let generator = MockGenerator::new(vec![None]);
    let triage = Triage::new(&cfg, &knowledge, &generator);

    let report = triage.run("ABEND=S0C7", &CancelToken::new()).unwrap();

    assert_eq!(report.outcome, TriageOutcome::SynthesisFailed);
    assert_eq!(report.key, "S0C7");
}

#[test]
fn explicit_key_skips_inference() {
    let cfg = Config::default();
    let knowledge = MockKnowledge::new(0, vec![instruction("S0C7 data exception")]);
    let generator = MockGenerator::new(vec![Some("Step-by-step...")]);
    let triage = Triage::new(&cfg, &knowledge, &generator);

    let report = triage
        .run_keyed("some log", "S0C7", &CancelToken::new())
        .unwrap();

    assert_eq!(report.outcome, TriageOutcome::Remediation);
    assert_eq!(generator.calls.get(), 1);
}

#[test]
fn cancelled_run_returns_error() {
    let cfg = Config::default();
    let knowledge = MockKnowledge::new(0, vec![]);
    let generator = MockGenerator::new(vec![]);
    let triage = Triage::new(&cfg, &knowledge, &generator);

    let cancel = CancelToken::new();
    cancel.cancel();
    assert!(triage.run("ABEND=S0C7", &cancel).is_err());
    assert_eq!(knowledge.calls.get(), 0);
}

#[test]
fn report_header_names_the_key() {
    let cfg = Config::default();
    let knowledge = MockKnowledge::new(0, vec![instruction("S0C7 data exception")]);
    let generator = MockGenerator::new(vec![Some("body")]);
    let triage = Triage::new(&cfg, &knowledge, &generator);

    let report = triage.run("ABEND=S0C7", &CancelToken::new()).unwrap();
    assert!(report.render().starts_with("### Remediation report for `S0C7`"));
}
