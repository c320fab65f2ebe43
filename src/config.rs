use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub awx: Awx,
    #[serde(default)]
    pub templates: Templates,
    #[serde(default)]
    pub triage: Triage,
    #[serde(default)]
    pub llm: Llm,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub output: Output,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Global {
    pub print_report: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self { print_report: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub out_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            out_dir: "out".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Awx {
    pub host: String,
    /// Token with read scope: job status, stdout, template listing.
    pub read_token: String,
    /// Token with write scope: template launches.
    pub write_token: String,
    pub verify_ssl: bool,
    pub request_timeout_seconds: u64,
    pub poll_interval_seconds: u64,
    pub max_poll_seconds: u64,
    pub poll_retry_limit: u32,
}
impl Default for Awx {
    fn default() -> Self {
        Self {
            host: "https://awx.example.com".into(),
            read_token: "".into(),
            write_token: "".into(),
            verify_ssl: true,
            request_timeout_seconds: 20,
            poll_interval_seconds: 10,
            max_poll_seconds: 1800,
            poll_retry_limit: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Templates {
    /// Template whose transcript embeds a marker-delimited mainframe sysout.
    /// Needs a `jobname` extra var when launched.
    pub sysout_template: String,
    pub mapping: BTreeMap<String, u32>,
}
impl Default for Templates {
    fn default() -> Self {
        let mut mapping = BTreeMap::new();
        mapping.insert("siddcuf".to_string(), 14);
        mapping.insert("joboutput".to_string(), 15);
        mapping.insert("sidcom2".to_string(), 16);
        mapping.insert("siddcub".to_string(), 17);
        Self {
            sysout_template: "joboutput".into(),
            mapping,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Triage {
    pub knowledge_url: String,
    pub top_k: u32,
    /// Character cap on the log prefix sent to the generator.
    pub max_log_chars: usize,
    pub lookup_timeout_seconds: u64,
}
impl Default for Triage {
    fn default() -> Self {
        Self {
            knowledge_url: "http://127.0.0.1:8099".into(),
            top_k: 2,
            max_log_chars: 4000,
            lookup_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Llm {
    pub base_url: String,
    pub model: String,
    /// Name of the env var holding the bearer key; empty means no auth.
    pub api_key_env: String,
    pub timeout_seconds: u64,
    pub temperature: f32,
}
impl Default for Llm {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".into(),
            model: "llama3.1".into(),
            api_key_env: "".into(),
            timeout_seconds: 60,
            temperature: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub write_summary: bool,
    pub write_sysout: bool,
    pub write_analysis: bool,
    pub write_report_json: bool,
    pub write_index_json: bool,
    pub summary_filename: String,
    pub sysout_filename: String,
    pub analysis_filename: String,
    pub report_filename: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_summary: true,
            write_sysout: true,
            write_analysis: true,
            write_report_json: true,
            write_index_json: true,
            summary_filename: "summary.txt".into(),
            sysout_filename: "sysout.txt".into(),
            analysis_filename: "analysis.md".into(),
            report_filename: "report.json".into(),
        }
    }
}
