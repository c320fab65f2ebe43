use crate::analysis;
use crate::config::Config;
use crate::remote::{Generator, KnowledgeBase, WorkInstruction};
use crate::util::truncate_chars;
use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Canonical key token for a clean run. The key-inference prompt contract
/// requires the generator to answer with exactly this token when the job
/// completed without error.
pub const CLEAN_RUN_KEY: &str = "RC=0000";

const CLEAN_RUN_MESSAGE: &str =
    "The job completed successfully (RC=0000). No remediation is required.";
const KEY_UNDETERMINED_MESSAGE: &str =
    "Could not determine the error code from the log. Review the full log manually.";
const KNOWLEDGE_UNAVAILABLE_MESSAGE: &str =
    "The work-instruction knowledge base is unavailable. Try again once the service is reachable.";
const NO_INSTRUCTIONS_MESSAGE: &str =
    "No matching work instructions were found for this error code.";
const SYNTHESIS_FAILED_MESSAGE: &str =
    "The resolution synthesis service failed. Consult the retrieved work instructions directly.";

/// Coarse-grained cancellation: the dispatcher checks between steps, never
/// mid-call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriageOutcome {
    CleanRun,
    Remediation,
    KeyUndetermined,
    KnowledgeUnavailable,
    NoInstructions,
    SynthesisFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageReport {
    pub key: String,
    pub outcome: TriageOutcome,
    pub body: String,
}

impl TriageReport {
    pub fn render(&self) -> String {
        format!("### Remediation report for `{}`\n\n{}", self.key, self.body)
    }
}

/// Turns a raw job log into a remediation report: determine the triage key,
/// short-circuit clean runs, look up work instructions, synthesize a
/// resolution narrative.
///
/// Every external fault degrades to a fixed user-visible body; cancellation
/// is the only error this dispatcher returns.
pub struct Triage<K: KnowledgeBase, G: Generator> {
    cfg: Config,
    knowledge: K,
    generator: G,
}

impl<K: KnowledgeBase, G: Generator> Triage<K, G> {
    pub fn new(cfg: &Config, knowledge: K, generator: G) -> Self {
        Self {
            cfg: cfg.clone(),
            knowledge,
            generator,
        }
    }

    pub fn run(&self, log: &str, cancel: &CancelToken) -> Result<TriageReport> {
        check_cancel(cancel)?;

        let key = match self.determine_key(log) {
            Ok(key) => key,
            Err(err) => {
                warn!("triage key inference failed: {err:#}");
                return Ok(TriageReport {
                    key: "unknown".to_string(),
                    outcome: TriageOutcome::KeyUndetermined,
                    body: KEY_UNDETERMINED_MESSAGE.to_string(),
                });
            }
        };

        self.run_keyed(log, &key, cancel)
    }

    /// Remediation for an already-determined key. Entry point for callers
    /// that know the error code up front.
    pub fn run_keyed(&self, log: &str, key: &str, cancel: &CancelToken) -> Result<TriageReport> {
        check_cancel(cancel)?;

        if key == CLEAN_RUN_KEY {
            info!("clean run, skipping remediation lookup");
            return Ok(report(key, TriageOutcome::CleanRun, CLEAN_RUN_MESSAGE));
        }

        let instructions = match self.lookup_with_retry(key) {
            Ok(mut results) => {
                // The service is asked for top_k; hold it to that even if it
                // over-returns.
                results.truncate(self.cfg.triage.top_k as usize);
                results
            }
            Err(err) => {
                warn!("knowledge lookup failed for {key}: {err:#}");
                return Ok(report(
                    key,
                    TriageOutcome::KnowledgeUnavailable,
                    KNOWLEDGE_UNAVAILABLE_MESSAGE,
                ));
            }
        };
        if instructions.is_empty() {
            info!("no work instructions matched {key}");
            return Ok(report(
                key,
                TriageOutcome::NoInstructions,
                NO_INSTRUCTIONS_MESSAGE,
            ));
        }

        check_cancel(cancel)?;

        let prompt = synthesis_prompt(
            truncate_chars(log, self.cfg.triage.max_log_chars),
            key,
            &instructions,
        );
        match self.generator.complete(&prompt) {
            Ok(text) => Ok(report(key, TriageOutcome::Remediation, text.trim())),
            Err(err) => {
                warn!("resolution synthesis failed for {key}: {err:#}");
                Ok(report(
                    key,
                    TriageOutcome::SynthesisFailed,
                    SYNTHESIS_FAILED_MESSAGE,
                ))
            }
        }
    }

    // Reduced extraction first: an abend code pattern-matched out of the log
    // is the key, no inference needed.
    fn determine_key(&self, log: &str) -> Result<String> {
        if let Some(code) = analysis::find_abend_code(log) {
            info!("abend code {code} extracted directly from the log");
            return Ok(code);
        }

        let prompt = key_inference_prompt(truncate_chars(log, self.cfg.triage.max_log_chars));
        let raw = self.generator.complete(&prompt)?;
        let token = raw
            .split_whitespace()
            .next()
            .ok_or_else(|| anyhow!("generator returned an empty key"))?;
        Ok(token.to_string())
    }

    // One retry on a transport fault, then the caller degrades.
    fn lookup_with_retry(&self, key: &str) -> Result<Vec<WorkInstruction>> {
        let top_k = self.cfg.triage.top_k;
        match self.knowledge.lookup(key, top_k) {
            Ok(results) => Ok(results),
            Err(err) => {
                warn!("knowledge lookup fault, retrying once: {err:#}");
                self.knowledge.lookup(key, top_k)
            }
        }
    }
}

fn check_cancel(cancel: &CancelToken) -> Result<()> {
    if cancel.is_cancelled() {
        bail!("triage run cancelled");
    }
    Ok(())
}

fn report(key: &str, outcome: TriageOutcome, body: &str) -> TriageReport {
    TriageReport {
        key: key.to_string(),
        outcome,
        body: body.to_string(),
    }
}

fn key_inference_prompt(log_prefix: &str) -> String {
    format!(
        "Extract the single error code that terminated the mainframe job log below.\n\
         Respond with only the bare code token (for example S0C7 or U4038).\n\
         If the job completed cleanly, respond with exactly RC=0000.\n\n\
         Job log:\n{log_prefix}"
    )
}

fn synthesis_prompt(log_prefix: &str, key: &str, instructions: &[WorkInstruction]) -> String {
    let mut snippets = String::new();
    for (i, wi) in instructions.iter().enumerate() {
        snippets.push_str(&format!(
            "Work instruction {}: {}\n{}\n\n",
            i + 1,
            wi.title,
            wi.resolution_steps
        ));
    }
    format!(
        "A mainframe job failed with error code {key}. Using the job log and the work \
         instructions below, write a resolution report with exactly three sections: \
         Executive summary, Root cause, and Step-by-step remediation.\n\n\
         {snippets}Job log:\n{log_prefix}"
    )
}
