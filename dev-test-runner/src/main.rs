//! Data-driven codec cases.
//!
//! Each `fixtures/*.json` file declares types and a list of cases:
//!
//! ```json
//! { "types": { ... },
//!   "cases": [ { "name": "...", "type": "List[Person]", "input": ..., "expect": "ok",
//!                "output": ... } ] }
//! ```
//!
//! `expect` is `ok` or an error category (`TypeMismatch`, `KeyMissing`,
//! `ValueInvalid`, `UnsupportedType`). Successful cases are generated back and
//! compared with `output` (the input itself when omitted).
//!
//! usage: dev-test-runner [PATTERN]... [--filter REGEX]
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, anyhow};
use clap::Parser;
use colored::Colorize;
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use strong_typing::Registry;
use strong_typing::decl::{Declarations, TypeDecl};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Fixture {
    #[serde(default)]
    types: IndexMap<String, TypeDecl>,
    cases: Vec<Case>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Case {
    name: String,
    #[serde(rename = "type")]
    type_expr: String,
    input: Value,
    expect: String,
    #[serde(default)]
    output: Option<Value>,
}

/// run the data-driven codec fixtures
#[derive(Parser, Debug)]
#[command(name = "dev-test-runner")]
struct Settings {
    /// fixture files; literal paths or quoted glob patterns (default: the workspace `fixtures/**/*.json`)
    patterns: Vec<String>,

    /// only run cases whose `file/case` id matches this regex
    #[arg(long)]
    filter: Option<Regex>,
}

impl Settings {
    /// Matched fixture files, sorted and without repeats.
    fn fixture_files(&self) -> anyhow::Result<Vec<PathBuf>> {
        let default_pattern;
        let patterns = if self.patterns.is_empty() {
            default_pattern = [format!("{}/../fixtures/**/*.json", env!("CARGO_MANIFEST_DIR"))];
            &default_pattern[..]
        } else {
            &self.patterns[..]
        };
        let mut files = Vec::new();
        for pattern in patterns {
            let before = files.len();
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                files.push(entry?);
            }
            if files.len() == before {
                return Err(anyhow!("pattern matched no fixture files: {pattern}"));
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }
}

fn load_fixture(path: &Path) -> anyhow::Result<Fixture> {
    let src = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let de = &mut serde_json::Deserializer::from_str(&src);
    serde_path_to_error::deserialize::<_, Fixture>(de).map_err(|err| {
        let path_in_doc = err.path().to_string();
        anyhow!("{}: at JSON path {path_in_doc} → {}", path.display(), err.into_inner())
    })
}

/// Runs one case; `Err` carries a human-readable mismatch.
fn run_case(registry: &Registry, types: &strong_typing::decl::TypeSet, case: &Case) -> Result<(), String> {
    let outcome = types.expr(&case.type_expr).and_then(|desc| {
        let typed = registry.parse_value(&desc, &case.input)?;
        registry.generate_value(&desc, &typed)
    });
    match (outcome, case.expect.as_str()) {
        (Ok(generated), "ok") => {
            let expected = case.output.as_ref().unwrap_or(&case.input);
            if &generated == expected {
                Ok(())
            } else {
                Err(format!("generated {generated} but expected {expected}"))
            }
        }
        (Ok(generated), category) => Err(format!("expected {category} but succeeded with {generated}")),
        (Err(error), "ok") => Err(format!("expected success but failed: {error}")),
        (Err(error), category) if error.category() == category => Ok(()),
        (Err(error), category) => Err(format!("expected {category} but got {}: {error}", error.category())),
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let settings = Settings::parse();
    let files = settings.fixture_files()?;

    let (mut passed, mut failed) = (0usize, 0usize);
    for file in &files {
        let fixture = load_fixture(file)?;
        let stem = file.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        let registry = Registry::new();
        let types = Declarations { types: fixture.types }
            .resolve(&registry)
            .with_context(|| format!("failed to resolve types in {}", file.display()))?;

        for case in &fixture.cases {
            let id = format!("{stem}/{}", case.name);
            if settings.filter.as_ref().is_some_and(|re| !re.is_match(&id)) {
                continue;
            }
            match run_case(&registry, &types, case) {
                Ok(()) => {
                    passed += 1;
                    println!("{} {id}", "✅".green());
                }
                Err(reason) => {
                    failed += 1;
                    println!("{} {}: {}", "❌".red(), id.bold(), reason.red());
                }
            }
        }
    }

    println!("{passed} passed, {failed} failed");
    Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
