use super::types::*;
use super::{Generator, KnowledgeBase, Orchestrator};
use crate::config::Config;
use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::Client;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// REST client for the AWX job orchestrator.
///
/// AWX splits credentials by scope: launches need the write token, reads use
/// the read token. `verify_ssl=false` accepts the self-signed certificates
/// the orchestrator is commonly deployed with.
pub struct AwxClient {
    client: Client,
    host: String,
    read_token: String,
    write_token: String,
    poll_interval: Duration,
    max_poll: Duration,
    poll_retry_limit: u32,
}

impl AwxClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.awx.request_timeout_seconds))
            .danger_accept_invalid_certs(!cfg.awx.verify_ssl)
            .build()
            .with_context(|| "building AWX http client")?;

        Ok(Self {
            client,
            host: cfg.awx.host.trim_end_matches('/').to_string(),
            read_token: cfg.awx.read_token.clone(),
            write_token: cfg.awx.write_token.clone(),
            poll_interval: Duration::from_secs(cfg.awx.poll_interval_seconds.max(1)),
            max_poll: Duration::from_secs(cfg.awx.max_poll_seconds),
            poll_retry_limit: cfg.awx.poll_retry_limit,
        })
    }

    fn poll_once(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.read_token)
            .send()
            .with_context(|| "polling job status")?;
        if !resp.status().is_success() {
            bail!("job status request failed with status {}", resp.status());
        }
        let detail: JobDetail = resp.json().with_context(|| "parsing job status response")?;
        Ok(detail.status)
    }
}

impl Orchestrator for AwxClient {
    fn launch(&self, template_id: u32, extra_vars: Option<Value>) -> Result<u64> {
        let url = format!("{}/api/v2/job_templates/{template_id}/launch/", self.host);
        let payload = match extra_vars {
            Some(vars) => json!({ "extra_vars": vars }),
            None => json!({}),
        };

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.write_token)
            .json(&payload)
            .send()
            .with_context(|| format!("launching template {template_id}"))?;
        if !resp.status().is_success() {
            bail!(
                "launch of template {template_id} failed with status {}",
                resp.status()
            );
        }

        let body: LaunchResponse = resp.json().with_context(|| "parsing launch response")?;
        body.job
            .ok_or_else(|| anyhow!("launch response carried no job id"))
    }

    fn wait(&self, job_id: u64) -> Result<JobState> {
        let url = format!("{}/api/v2/jobs/{job_id}/", self.host);
        let started = Instant::now();
        let mut consecutive_faults = 0u32;

        loop {
            match self.poll_once(&url) {
                Ok(status) => {
                    consecutive_faults = 0;
                    debug!("job {job_id} status: {status}");
                    if let Some(state) = JobState::parse_terminal(&status) {
                        return Ok(state);
                    }
                }
                Err(err) => {
                    consecutive_faults += 1;
                    warn!(
                        "poll fault for job {job_id} ({consecutive_faults}/{}): {err:#}",
                        self.poll_retry_limit
                    );
                    if consecutive_faults > self.poll_retry_limit {
                        return Ok(JobState::Error);
                    }
                }
            }

            if started.elapsed() > self.max_poll {
                bail!(
                    "job {job_id} did not reach a terminal state within {}s",
                    self.max_poll.as_secs()
                );
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    fn stdout(&self, job_id: u64) -> Result<String> {
        let url = format!("{}/api/v2/jobs/{job_id}/stdout/?format=txt", self.host);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.read_token)
            .send()
            .with_context(|| format!("fetching stdout for job {job_id}"))?;
        if !resp.status().is_success() {
            bail!(
                "stdout request for job {job_id} failed with status {}",
                resp.status()
            );
        }
        resp.text().with_context(|| "reading job stdout body")
    }

    fn ping(&self) -> Result<u32> {
        let url = format!("{}/api/v2/job_templates/", self.host);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.read_token)
            .send()
            .with_context(|| "listing job templates")?;
        if !resp.status().is_success() {
            bail!("template list request failed with status {}", resp.status());
        }
        let page: TemplatePage = resp.json().with_context(|| "parsing template list")?;
        Ok(page.count)
    }
}

/// HTTP front of the work-instruction similarity store.
pub struct HttpKnowledgeBase {
    client: Client,
    url: String,
}

impl HttpKnowledgeBase {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.triage.lookup_timeout_seconds))
            .build()
            .with_context(|| "building knowledge http client")?;
        Ok(Self {
            client,
            url: cfg.triage.knowledge_url.trim_end_matches('/').to_string(),
        })
    }
}

impl KnowledgeBase for HttpKnowledgeBase {
    fn lookup(&self, key: &str, top_k: u32) -> Result<Vec<WorkInstruction>> {
        let url = format!("{}/search", self.url);
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "query": key, "top_k": top_k }))
            .send()
            .with_context(|| "querying knowledge base")?;
        if !resp.status().is_success() {
            bail!("knowledge lookup failed with status {}", resp.status());
        }
        let body: LookupResponse = resp.json().with_context(|| "parsing lookup response")?;
        Ok(body.results)
    }

    fn ping(&self) -> Result<()> {
        let url = format!("{}/health", self.url);
        let resp = self
            .client
            .get(&url)
            .send()
            .with_context(|| "pinging knowledge base")?;
        if !resp.status().is_success() {
            bail!("knowledge base health check returned {}", resp.status());
        }
        Ok(())
    }
}

/// OpenAI-compatible chat-completions client. Works against any service
/// exposing `POST {base}/v1/chat/completions` (local runtimes included).
pub struct HttpGenerator {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl HttpGenerator {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.llm.timeout_seconds))
            .build()
            .with_context(|| "building generator http client")?;

        // The key is named by env var in config, never stored in the file.
        let api_key = if cfg.llm.api_key_env.is_empty() {
            None
        } else {
            std::env::var(&cfg.llm.api_key_env).ok()
        };

        Ok(Self {
            client,
            base_url: cfg.llm.base_url.trim_end_matches('/').to_string(),
            model: cfg.llm.model.clone(),
            temperature: cfg.llm.temperature,
            api_key,
        })
    }
}

impl Generator for HttpGenerator {
    fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let payload = json!({
            "model": self.model,
            "messages": [ { "role": "user", "content": prompt } ],
            "temperature": self.temperature,
        });

        let mut req = self.client.post(&url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().with_context(|| "calling generator")?;
        if !resp.status().is_success() {
            bail!("generator call failed with status {}", resp.status());
        }

        let body: Value = resp.json().with_context(|| "parsing generator response")?;
        let text = body
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|arr| arr.first())
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .context("generator response missing message content")?;
        Ok(text.to_string())
    }

    fn ping(&self) -> Result<()> {
        let url = format!("{}/v1/models", self.base_url);
        let mut req = self.client.get(&url);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().with_context(|| "pinging generator")?;
        if !resp.status().is_success() {
            bail!("generator model list returned {}", resp.status());
        }
        Ok(())
    }
}
