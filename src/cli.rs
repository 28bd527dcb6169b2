//! CLI: check / normalize JSON documents against declared types, or describe
//! the declarations.
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;

use strong_typing::decl::{Declarations, TypeSet};
use strong_typing::{Presence, Registry, RegistryConfig, TypeDescriptor};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// parse and generate JSON documents against declared types
#[derive(Parser, Debug)]
#[command(name = "strong-typing", version)]
pub struct CommandLineInterface {
    /// log codec construction (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// ceiling on type nesting depth
    #[arg(long, global = true, default_value_t = RegistryConfig::default().max_depth)]
    max_depth: usize,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// parse each document and report which ones conform
    Check(CheckCmd),
    /// parse each document and write it back out in canonical form
    Normalize(NormalizeCmd),
    /// print the declared types
    Describe(DescribeCmd),
}

#[derive(Args, Debug, Clone)]
struct TypeSettings {
    /// type declaration document (.json)
    #[arg(long)]
    types: PathBuf,

    /// root type expression, e.g. `Person` or `List[Person]`
    #[arg(long)]
    root: String,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckCmd {
    #[command(flatten)]
    type_settings: TypeSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// only print failures
    #[arg(long, short)]
    quiet: bool,
}

#[derive(clap::Parser, Debug)]
struct NormalizeCmd {
    #[command(flatten)]
    type_settings: TypeSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct DescribeCmd {
    /// type declaration document (.json)
    #[arg(long)]
    types: PathBuf,

    /// describe only this type expression
    #[arg(long)]
    root: Option<String>,
}

/// One JSON document pulled from the inputs.
struct Document {
    label: String,
    value: Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Reads every input in parallel; documents keep input order.
    fn load(&self) -> anyhow::Result<Vec<Document>> {
        let sources = resolve_file_path_patterns(&self.input)?;
        let per_source = sources
            .par_iter()
            .map(|source| -> anyhow::Result<Vec<Document>> {
                let (label, text) = read_source(source)?;
                self.split(&label, &text)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(per_source.into_iter().flatten().collect())
    }

    fn split(&self, label: &str, text: &str) -> anyhow::Result<Vec<Document>> {
        let mut documents = Vec::new();
        if self.ndjson {
            for (i, line) in text.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let label = format!("{label}:{}", i + 1);
                let value = serde_json::from_str(line).with_context(|| format!("failed to parse JSON ({label})"))?;
                documents.push(self.select(label, value)?);
            }
        } else {
            let value = serde_json::from_str(text).with_context(|| format!("failed to parse JSON ({label})"))?;
            documents.push(self.select(label.to_owned(), value)?);
        }
        Ok(documents)
    }

    fn select(&self, label: String, value: Value) -> anyhow::Result<Document> {
        let Some(pointer) = self.json_pointer.as_deref() else {
            return Ok(Document { label, value });
        };
        match value.pointer(pointer) {
            Some(node) => Ok(Document { value: node.clone(), label: format!("{label}#{pointer}") }),
            None => bail!("JSON pointer {pointer} selects nothing in {label}"),
        }
    }
}

impl TypeSettings {
    fn load(&self, registry: &Registry) -> anyhow::Result<TypeDescriptor> {
        let types = load_types(&self.types, registry)?;
        types
            .expr(&self.root)
            .with_context(|| format!("failed to resolve root type `{}`", self.root))
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<ExitCode> {
        let registry = Registry::with_config(RegistryConfig { max_depth: self.max_depth });
        match &self.cmd {
            Command::Check(target) => target.run(&registry),
            Command::Normalize(target) => target.run(&registry),
            Command::Describe(target) => target.run(&registry),
        }
    }
}

impl CheckCmd {
    fn run(&self, registry: &Registry) -> anyhow::Result<ExitCode> {
        let root = self.type_settings.load(registry)?;
        let documents = self.input_settings.load()?;

        let outcomes: Vec<_> = documents
            .par_iter()
            .map(|doc| registry.parse_value(&root, &doc.value).err())
            .collect();

        let mut failed = 0usize;
        for (doc, outcome) in documents.iter().zip(&outcomes) {
            match outcome {
                None if self.quiet => {}
                None => println!("{} {}", "✅".green(), doc.label),
                Some(error) => {
                    failed += 1;
                    println!("{} {}: {}", "❌".red(), doc.label.bold(), error.to_string().red());
                }
            }
        }

        let passed = documents.len() - failed;
        let summary = format!("{passed} passed, {failed} failed against `{root}`");
        if failed == 0 {
            eprintln!("{}", summary.green());
            Ok(ExitCode::SUCCESS)
        } else {
            eprintln!("{}", summary.red());
            Ok(ExitCode::FAILURE)
        }
    }
}

impl NormalizeCmd {
    fn run(&self, registry: &Registry) -> anyhow::Result<ExitCode> {
        let root = self.type_settings.load(registry)?;
        let documents = self.input_settings.load()?;

        let rendered = documents
            .par_iter()
            .map(|doc| -> anyhow::Result<String> {
                let typed = registry.parse_value(&root, &doc.value).with_context(|| doc.label.clone())?;
                let value = registry.generate_value(&root, &typed).with_context(|| doc.label.clone())?;
                let text = if self.input_settings.ndjson {
                    serde_json::to_string(&value)?
                } else {
                    serde_json::to_string_pretty(&value)?
                };
                Ok(text)
            })
            .collect::<anyhow::Result<Vec<String>>>()?;

        let mut output = rendered.join("\n");
        output.push('\n');
        match self.out.as_ref() {
            Some(out) => {
                if let Some(parent) = out.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(out, &output).with_context(|| format!("failed to write {}", out.display()))?;
            }
            None => print!("{output}"),
        }
        Ok(ExitCode::SUCCESS)
    }
}

impl DescribeCmd {
    fn run(&self, registry: &Registry) -> anyhow::Result<ExitCode> {
        let types = load_types(&self.types, registry)?;
        match self.root.as_deref() {
            Some(root) => {
                let desc = types.expr(root).with_context(|| format!("failed to resolve `{root}`"))?;
                print!("{}", describe(&desc));
            }
            None => {
                for (_, desc) in types.iter() {
                    print!("{}", describe(desc));
                }
            }
        }
        Ok(ExitCode::SUCCESS)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn load_types(path: &Path, registry: &Registry) -> anyhow::Result<TypeSet> {
    let src = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let decls =
        Declarations::from_json_str(&src).with_context(|| format!("invalid declarations in {}", path.display()))?;
    decls
        .resolve(registry)
        .with_context(|| format!("failed to resolve declarations in {}", path.display()))
}

fn read_source(source: &Path) -> anyhow::Result<(String, String)> {
    if source == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).context("failed to read stdin")?;
        return Ok(("<stdin>".to_owned(), text));
    }
    let text = std::fs::read_to_string(source).with_context(|| format!("failed to read {}", source.display()))?;
    Ok((source.to_string_lossy().to_string(), text))
}

fn describe(desc: &TypeDescriptor) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    match desc {
        TypeDescriptor::Record(r) => {
            let _ = writeln!(out, "{} {}", "record".cyan(), r.name.bold());
            if let Some(text) = &r.description {
                let _ = writeln!(out, "  {}", text.dimmed());
            }
            for field in &r.fields {
                let presence = match &field.presence {
                    Presence::Required => "required".to_owned(),
                    Presence::OptionalNullable => "optional".to_owned(),
                    Presence::DefaultValue(v) => format!("default {v:?}"),
                    Presence::DefaultFactory(_) => "default factory".to_owned(),
                };
                let _ = writeln!(
                    out,
                    "  {} \"{}\": {} ({presence})",
                    field.name,
                    field.wire_name,
                    field.value_type.to_string().yellow()
                );
            }
        }
        TypeDescriptor::Enum(e) => {
            let _ = writeln!(out, "{} {}", "enum".cyan(), e.name.bold());
            if let Some(text) = &e.description {
                let _ = writeln!(out, "  {}", text.dimmed());
            }
            for (member, literal) in &e.members {
                let _ = writeln!(out, "  {member} = {literal}");
            }
        }
        other => {
            let _ = writeln!(out, "{}", other.to_string().yellow());
        }
    }
    out
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if !has_glob_chars(pattern) {
            out.push(PathBuf::from(pattern));
            continue;
        }
        let before = out.len();
        for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
            out.push(entry?);
        }
        if out.len() == before {
            return Err(anyhow!("glob pattern matched no files: {pattern}"));
        }
    }
    Ok(out)
}
