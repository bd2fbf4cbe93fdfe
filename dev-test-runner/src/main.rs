//! Golden fixture runner.
//!
//! Every directory under `fixtures/` holds a `program.json`, optionally an
//! `options.json`, and the expected `expected.java` / `expected.diag` /
//! `outcome.json` produced by one transform round. `--bless` rewrites the
//! expectations from the current output.
//!
//! ```text
//! cargo run -p dev-test-runner -- [--bless] [NAME_REGEX]
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use regex::Regex;

use guard_synth::codegen::Codegen;
use guard_synth::config::Options;
use guard_synth::diag::Diagnostics;
use guard_synth::input::load_program;
use guard_synth::processor::Processor;

struct Settings {
    bless: bool,
    filter: Option<Regex>,
}

fn main() -> ExitCode {
    let settings = match parse_args() {
        Ok(settings) => settings,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("fixtures");
    let mut fixtures = match std::fs::read_dir(&root) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.join("program.json").is_file())
            .collect::<Vec<_>>(),
        Err(error) => {
            eprintln!("cannot read {}: {error}", root.display());
            return ExitCode::FAILURE;
        }
    };
    fixtures.sort();

    let mut failed = 0usize;
    let mut ran = 0usize;
    for dir in fixtures {
        let name = dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        if settings.filter.as_ref().is_some_and(|re| !re.is_match(&name)) {
            continue;
        }
        ran += 1;
        match run_fixture(&dir, settings.bless) {
            Ok(mismatches) if mismatches.is_empty() => eprintln!("✅ {name}"),
            Ok(mismatches) => {
                failed += 1;
                eprintln!("❌ {name}");
                for file in mismatches {
                    eprintln!("   mismatch: {}", file.display());
                }
            }
            Err(message) => {
                failed += 1;
                eprintln!("❌ {name}: {message}");
            }
        }
    }

    eprintln!("{ran} fixtures, {failed} failed");
    if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn parse_args() -> Result<Settings, String> {
    let mut settings = Settings { bless: false, filter: None };
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--bless" => settings.bless = true,
            pattern if settings.filter.is_none() => {
                let re = Regex::new(pattern).map_err(|e| format!("bad fixture filter: {e}"))?;
                settings.filter = Some(re);
            }
            other => return Err(format!("unexpected argument: {other}")),
        }
    }
    Ok(settings)
}

/// Files whose contents differ from the fresh output.
fn run_fixture(dir: &Path, bless: bool) -> Result<Vec<PathBuf>, String> {
    let options_path = dir.join("options.json");
    let options = if options_path.is_file() {
        Options::from_file(&options_path).map_err(|e| e.to_string())?
    } else {
        Options::default()
    };
    let mut program = load_program(&dir.join("program.json")).map_err(|e| e.to_string())?;
    let mut sink = Diagnostics::new();
    let outcome = Processor::new(&options)
        .process(&mut program, &mut sink)
        .map_err(|e| e.to_string())?;

    let mut cg = Codegen::new();
    cg.emit(&program);
    let diag: String = sink
        .items()
        .iter()
        .map(|d| format!("{:?} {}: {}\n", d.severity, d.element, d.message))
        .collect();
    let outcome = serde_json::to_string_pretty(&outcome).map_err(|e| e.to_string())? + "\n";

    let outputs = [
        (dir.join("expected.java"), cg.into_string()),
        (dir.join("expected.diag"), diag),
        (dir.join("outcome.json"), outcome),
    ];
    let mut mismatches = Vec::new();
    for (path, actual) in outputs {
        if bless {
            std::fs::write(&path, &actual).map_err(|e| format!("{}: {e}", path.display()))?;
            continue;
        }
        let expected = std::fs::read_to_string(&path).unwrap_or_default();
        if expected != actual {
            mismatches.push(path);
        }
    }
    Ok(mismatches)
}
