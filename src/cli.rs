use crate::{
    analysis,
    config::Config,
    pipeline::Pipeline,
    remote::http::{AwxClient, HttpGenerator, HttpKnowledgeBase},
    remote::{Generator, KnowledgeBase, Orchestrator, ServiceDiag},
    transcript,
    triage::{CancelToken, Triage},
    util::{ensure_dir, now_rfc3339, sha256_hex},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sysout-triage")]
#[command(about = "Mainframe job log triage (AWX launch/poll + sysout analysis + remediation lookup)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./sysout-triage.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check connectivity to the orchestrator, knowledge base, and generator.
    Doctor {},
    /// Print the summary line set of a local transcript.
    Summarize {
        #[arg(long)]
        input: PathBuf,
    },
    /// Classify a local sysout and print the analysis.
    Analyze {
        #[arg(long)]
        input: PathBuf,
        /// Also print the structured analysis as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Produce a remediation report for a local log.
    Triage {
        #[arg(long)]
        input: PathBuf,
        /// Skip key inference and use this error code directly.
        #[arg(long)]
        key: Option<String>,
    },
    /// Launch a job from a natural-language request and report on it.
    Run {
        #[arg(long)]
        request: String,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref())?;
    let cfg = Config::load(&cfg_path)?;

    match &args.cmd {
        Command::Doctor {} => {
            let _guard = init_logging(&args, &cfg, None)?;
            doctor(&cfg)
        }
        Command::Summarize { input } => {
            let _guard = init_logging(&args, &cfg, None)?;
            summarize(input)
        }
        Command::Analyze { input, json } => {
            let _guard = init_logging(&args, &cfg, None)?;
            analyze(input, *json)
        }
        Command::Triage { input, key } => {
            let _guard = init_logging(&args, &cfg, None)?;
            triage(&cfg, input, key.as_deref())
        }
        Command::Run { request, out_dir } => run(&args, &cfg, request, out_dir.as_deref()),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = user {
        return Ok(p.to_path_buf());
    }
    let default = PathBuf::from("sysout-triage.toml");
    if default.exists() {
        Ok(default)
    } else {
        Ok(PathBuf::from("sysout-triage.example.toml"))
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn doctor(cfg: &Config) -> Result<()> {
    let awx = AwxClient::new(cfg)?;
    let knowledge = HttpKnowledgeBase::new(cfg)?;
    let generator = HttpGenerator::new(cfg)?;

    let (awx_ok, awx_templates, awx_error) = match awx.ping() {
        Ok(count) => (true, Some(count), None),
        Err(err) => (false, None, Some(format!("{err:#}"))),
    };
    let (knowledge_ok, knowledge_error) = match knowledge.ping() {
        Ok(()) => (true, None),
        Err(err) => (false, Some(format!("{err:#}"))),
    };
    let (generator_ok, generator_error) = match generator.ping() {
        Ok(()) => (true, None),
        Err(err) => (false, Some(format!("{err:#}"))),
    };

    let diag = ServiceDiag {
        awx_ok,
        awx_templates,
        awx_error,
        knowledge_ok,
        knowledge_error,
        generator_ok,
        generator_error,
    };
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

fn summarize(input: &Path) -> Result<()> {
    let raw = read_input(input)?;
    let lines = transcript::summarize(&raw);
    if lines.is_empty() {
        println!("No play/task summary found in the transcript.");
    } else {
        println!("{}", transcript::render_summary(&lines));
    }
    Ok(())
}

fn analyze(input: &Path, json: bool) -> Result<()> {
    let raw = read_input(input)?;
    info!("analysis context {}", input_context_id(&raw));

    // Marker-delimited transcripts analyze the embedded sysout; bare logs
    // analyze as-is.
    let log = transcript::extract_inner_log(&raw).unwrap_or(raw);
    let result = analysis::analyze(&log);

    println!("{}", analysis::render_markdown(&result));
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}

fn triage(cfg: &Config, input: &Path, key: Option<&str>) -> Result<()> {
    let raw = read_input(input)?;
    info!("triage context {}", input_context_id(&raw));

    let log = transcript::extract_inner_log(&raw).unwrap_or(raw);
    let knowledge = HttpKnowledgeBase::new(cfg)?;
    let generator = HttpGenerator::new(cfg)?;
    let dispatcher = Triage::new(cfg, knowledge, generator);

    let cancel = CancelToken::new();
    let report = match key {
        Some(code) => dispatcher.run_keyed(&log, code, &cancel)?,
        None => dispatcher.run(&log, &cancel)?,
    };
    println!("{}", report.render());
    Ok(())
}

fn run(args: &Args, cfg: &Config, request: &str, out_override: Option<&Path>) -> Result<()> {
    let out_root = out_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.out_dir));
    ensure_dir(&out_root)?;

    let log_path = resolve_log_path(cfg, &out_root);
    let _guard = init_logging(args, cfg, log_path.as_deref())?;

    let awx = AwxClient::new(cfg)?;
    let pipeline = Pipeline::new(cfg, awx);

    let started = now_rfc3339();
    let out = pipeline.run_request(request)?;

    let job_dir = out_root.join(format!("job_{}", out.report.job_id));
    let final_dir = job_dir.join("final");
    ensure_dir(&final_dir)?;
    info!("job_id={} out={}", out.report.job_id, job_dir.display());

    if cfg.output.write_summary && !out.summary.is_empty() {
        std::fs::write(final_dir.join(&cfg.output.summary_filename), &out.summary)?;
    }
    if cfg.output.write_sysout {
        if let Some(sysout) = &out.inner_log {
            std::fs::write(final_dir.join(&cfg.output.sysout_filename), sysout)?;
        }
    }
    if cfg.output.write_analysis {
        if let Some(md) = &out.analysis_markdown {
            std::fs::write(final_dir.join(&cfg.output.analysis_filename), md)?;
        }
    }
    if cfg.output.write_report_json {
        std::fs::write(
            final_dir.join(&cfg.output.report_filename),
            serde_json::to_string_pretty(&out.report)?,
        )?;
    }
    if cfg.output.write_index_json {
        let index = serde_json::json!({
            "job_id": out.report.job_id,
            "template": out.report.template_name,
            "final_state": out.report.final_state,
            "started": started,
            "finished": now_rfc3339(),
            "report": format!("final/{}", cfg.output.report_filename),
        });
        std::fs::write(
            job_dir.join("index.json"),
            serde_json::to_string_pretty(&index)?,
        )?;
    }

    if cfg.global.print_report {
        println!("{}", out.header);
        if let Some(md) = &out.analysis_markdown {
            println!("\n{md}");
        } else if out.report.inner_log_present {
            // Unreachable today (analysis always accompanies an inner log),
            // but keeps the print honest if that pairing ever changes.
            warn!("inner log present without analysis");
        } else if !out.summary.is_empty() {
            println!("\n#### Execution Summary\n{}", out.summary);
        }
    }

    Ok(())
}

fn resolve_log_path(cfg: &Config, out_root: &Path) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(out_root.join("sysout-triage.log"))
}

fn read_input(input: &Path) -> Result<String> {
    std::fs::read_to_string(input).with_context(|| format!("reading input: {}", input.display()))
}

// Content-addressed id naming the run in logs; local inputs have no job id.
fn input_context_id(raw: &str) -> String {
    sha256_hex(raw.as_bytes())[..12].to_string()
}
