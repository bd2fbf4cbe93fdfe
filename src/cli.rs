//! CLI: plan | transform | render over JSON program files.
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;

use guard_synth::codegen::Codegen;
use guard_synth::config::Options;
use guard_synth::diag::{Diagnostic, Diagnostics, Severity};
use guard_synth::input::{load_program, resolve_file_path_patterns};
use guard_synth::ir::Program;
use guard_synth::logging::{LogConfig, init_logging};
use guard_synth::processor::{Outcome, Plan, Processor};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// synthesize guard clauses and invalid-check predicates from rule annotations
#[derive(Parser, Debug)]
#[command(name = "guard-synth", version)]
pub struct CommandLineInterface {
    /// more logging (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON options file; GUARD_SYNTH_* environment variables apply on top
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// plain diagnostics without ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// classify methods and build the rule registry, without rewriting anything
    Plan(PlanOut),
    /// run a full round on each file and write the instrumented program
    Transform(TransformOut),
    /// print programs as Java-like source, unchanged
    Render(RenderOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more program files. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct PlanOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// the instrumented program model
    Json,
    /// Java-like source
    Source,
}

#[derive(clap::Parser, Debug)]
struct TransformOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// directory for one output per input (stdout if omitted)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Emit::Json)]
    emit: Emit,

    /// also write a JSON run report here
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct RenderOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One input file after a round.
struct FileRun {
    path: PathBuf,
    diagnostics: Vec<Diagnostic>,
    result: anyhow::Result<(Program, Outcome)>,
}

#[derive(Serialize)]
struct PlanEntry<'a> {
    path: String,
    plan: &'a Plan,
    diagnostics: &'a [Diagnostic],
}

#[derive(Serialize)]
struct RunReport<'a> {
    generated_at: String,
    files: Vec<FileReport<'a>>,
}

#[derive(Serialize)]
struct FileReport<'a> {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'a Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
    diagnostics: &'a [Diagnostic],
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn paths(&self) -> anyhow::Result<Vec<PathBuf>> {
        resolve_file_path_patterns(&self.input)
            .map_err(|error| anyhow::anyhow!("failed to resolve input file paths: {error}"))
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// `Ok(true)` when every file went through without error diagnostics.
    pub fn run(&self) -> anyhow::Result<bool> {
        if self.no_color {
            colored::control::set_override(false);
        }
        init_logging(&LogConfig::from_verbosity(self.verbose).with_ansi(!self.no_color));

        let options = Options::load(self.config.as_deref()).context("failed to load options")?;
        tracing::debug!(?options, "options loaded");

        match &self.cmd {
            Command::Plan(target) => run_plan(target, &options),
            Command::Transform(target) => run_transform(target, &options),
            Command::Render(target) => run_render(target),
        }
    }
}

fn run_plan(target: &PlanOut, options: &Options) -> anyhow::Result<bool> {
    let paths = target.input_settings.paths()?;
    let plans = paths
        .par_iter()
        .map(|path| -> anyhow::Result<_> {
            let program = load_program(path)?;
            let mut sink = Diagnostics::new();
            let plan = Processor::new(options).plan(&program, &mut sink);
            Ok((path.clone(), plan, sink.into_items()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut clean = true;
    let mut entries = Vec::with_capacity(plans.len());
    for (path, plan, diagnostics) in &plans {
        clean &= print_diagnostics(path, diagnostics);
        entries.push(PlanEntry { path: path.to_string_lossy().to_string(), plan, diagnostics });
    }
    let src = serde_json::to_string_pretty(&entries)?;
    write_or_print(target.out.as_deref(), &src)?;
    Ok(clean)
}

fn run_transform(target: &TransformOut, options: &Options) -> anyhow::Result<bool> {
    let paths = target.input_settings.paths()?;
    let runs: Vec<FileRun> = paths.par_iter().map(|path| transform_file(path, options)).collect();

    let mut clean = true;
    for run in &runs {
        clean &= print_diagnostics(&run.path, &run.diagnostics);
        let (program, outcome) = match &run.result {
            Ok(done) => done,
            Err(error) => {
                clean = false;
                eprintln!("{}: {} {error:#}", run.path.display(), "failed:".red().bold());
                continue;
            }
        };
        tracing::info!(
            path = %run.path.display(),
            predicates = outcome.predicates.len(),
            instrumented = outcome.instrumented.len(),
            "file transformed"
        );
        let src = match target.emit {
            Emit::Json => serde_json::to_string_pretty(program)?,
            Emit::Source => {
                let mut cg = Codegen::new();
                cg.emit(program);
                cg.into_string()
            }
        };
        let out = target.out_dir.as_ref().map(|dir| output_path(dir, &run.path, target.emit));
        write_or_print(out.as_deref(), &src)?;
    }

    if let Some(report) = target.report.as_ref() {
        write_report(report, &runs)?;
    }
    Ok(clean)
}

fn run_render(target: &RenderOut) -> anyhow::Result<bool> {
    let paths = target.input_settings.paths()?;
    let mut cg = Codegen::new();
    for path in paths {
        let program = load_program(&path)?;
        cg.emit(&program);
    }
    write_or_print(target.out.as_deref(), &cg.into_string())?;
    Ok(true)
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn transform_file(path: &Path, options: &Options) -> FileRun {
    let _span = tracing::info_span!("file", path = %path.display()).entered();
    let mut sink = Diagnostics::new();
    let result = load_program(path)
        .map_err(anyhow::Error::from)
        .and_then(|mut program| {
            let outcome = Processor::new(options).process(&mut program, &mut sink)?;
            Ok((program, outcome))
        });
    FileRun { path: path.to_path_buf(), diagnostics: sink.into_items(), result }
}

/// Prints to stderr; `true` when none of them is an error.
fn print_diagnostics(path: &Path, diagnostics: &[Diagnostic]) -> bool {
    for d in diagnostics {
        let label = match d.severity {
            Severity::Note => "note:".cyan().bold(),
            Severity::Warning => "warning:".yellow().bold(),
            Severity::Error => "error:".red().bold(),
        };
        eprintln!("{}: {label} {}: {}", path.display(), d.element.bold(), d.message);
    }
    diagnostics.iter().all(|d| d.severity != Severity::Error)
}

fn output_path(dir: &Path, input: &Path, emit: Emit) -> PathBuf {
    let stem = input.file_stem().map_or_else(|| "program".into(), |s| s.to_string_lossy());
    let extension = match emit {
        Emit::Json => "json",
        Emit::Source => "java",
    };
    dir.join(format!("{stem}.{extension}"))
}

fn write_or_print(out: Option<&Path>, src: &str) -> anyhow::Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, src).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{src}");
            Ok(())
        }
    }
}

fn write_report(path: &Path, runs: &[FileRun]) -> anyhow::Result<()> {
    let files = runs
        .iter()
        .map(|run| FileReport {
            path: run.path.to_string_lossy().to_string(),
            outcome: run.result.as_ref().ok().map(|(_, outcome)| outcome),
            failure: run.result.as_ref().err().map(|error| format!("{error:#}")),
            diagnostics: &run.diagnostics,
        })
        .collect();
    let report = RunReport { generated_at: chrono::Utc::now().to_rfc3339(), files };
    write_or_print(Some(path), &serde_json::to_string_pretty(&report)?)
}
