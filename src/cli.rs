//! Minimal CLI: load schemas → (display | convert | unify | traverse)
use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use log::debug;
use rayon::prelude::*;
use serde_json::json;

use crate::diag::{Diagnostic, Diagnostics, Severity};
use crate::schema::{Model, Schema};
use crate::traversal::parse_path;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// load type declarations from JSON schema documents and query the type model
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print the canonical display of every named type (or the listed ones)
    Display(DisplayCmd),
    /// print assignability and the conversion kind from one type to another
    Convert(ConvertCmd),
    /// print the unified type of two types
    Unify(UnifyCmd),
    /// resolve a property/index path against a type
    Traverse(TraverseCmd),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// One or more schema documents. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    schema: Vec<String>,

    /// emit JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(clap::Parser, Debug)]
struct DisplayCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// type names to render (all declared types if omitted)
    types: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct ConvertCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// source type
    #[arg(long)]
    from: String,

    /// destination type
    #[arg(long)]
    to: String,
}

#[derive(clap::Parser, Debug)]
struct UnifyCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    left: String,
    right: String,
}

#[derive(clap::Parser, Debug)]
struct TraverseCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// receiver type
    receiver: String,

    /// access path, e.g. `pets[0].name`
    path: String,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn load_model(&self) -> anyhow::Result<Model> {
        let source_paths = resolve_file_path_patterns(&self.schema).context("failed to resolve schema file paths")?;
        let mut schema = Schema::default();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            debug!("loading schema {source_path_str}");
            let document = Schema::from_file(&source_path)
                .with_context(|| format!("failed to read schema file ({source_path_str})"))?;
            schema.merge(document).with_context(|| format!("failed to merge schema file ({source_path_str})"))?;
        }
        Ok(schema.build()?)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Display(target) => {
                let model = target.schema_settings.load_model()?;
                let names = if target.types.is_empty() {
                    model.types.keys().cloned().collect::<Vec<_>>()
                } else {
                    target.types.clone()
                };
                let ids = names
                    .iter()
                    .map(|name| model.lookup(name).map(|id| (name.as_str(), id)))
                    .collect::<Result<Vec<_>, _>>()?;

                // rendering only reads the arena; each display string is cached once
                let mut rendered = ids
                    .par_iter()
                    .map(|&(name, id)| (name, model.arena.display(id)))
                    .collect::<Vec<_>>();
                rendered.sort_by(|a, b| a.0.cmp(b.0));

                if target.schema_settings.json {
                    let out = rendered
                        .iter()
                        .map(|(name, display)| (name.to_string(), json!(display)))
                        .collect::<serde_json::Map<_, _>>();
                    println!("{}", serde_json::to_string_pretty(&out)?);
                } else {
                    for (name, display) in rendered {
                        println!("{} = {display}", name.bold());
                    }
                }
            }
            Command::Convert(target) => {
                let model = target.schema_settings.load_model()?;
                let from = model.lookup(&target.from)?;
                let to = model.lookup(&target.to)?;
                let assignable = model.arena.assignable_from(to, from);
                let conversion = model.arena.conversion_from(to, from);
                if target.schema_settings.json {
                    let out = json!({
                        "from": model.arena.display(from),
                        "to": model.arena.display(to),
                        "assignable": assignable,
                        "conversion": conversion,
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                } else {
                    println!("assignable: {assignable}");
                    println!("conversion: {conversion}");
                }
            }
            Command::Unify(target) => {
                let mut model = target.schema_settings.load_model()?;
                let left = model.lookup(&target.left)?;
                let right = model.lookup(&target.right)?;
                let (unified, conversion) = model
                    .arena
                    .unify(left, right)
                    .with_context(|| format!("failed to unify `{}` with `{}`", target.left, target.right))?;
                if target.schema_settings.json {
                    let out = json!({ "type": model.arena.display(unified), "conversion": conversion });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                } else {
                    println!("{} ({conversion})", model.arena.display(unified));
                }
            }
            Command::Traverse(target) => {
                let mut model = target.schema_settings.load_model()?;
                let receiver = model.lookup(&target.receiver)?;
                let path = parse_path(&target.path)?;
                let (resolved, diagnostics) = model.arena.traverse_path(receiver, &path);
                if target.schema_settings.json {
                    let out = json!({ "type": model.arena.display(resolved), "diagnostics": diagnostics });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                } else if diagnostics.is_empty() {
                    println!("{}", model.arena.display(resolved));
                } else {
                    eprint!("{}", render_diagnostics(&diagnostics));
                }
                if diagnostics.has_errors() {
                    bail!("traversal of `{}` failed", target.path);
                }
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn render_diagnostics(diagnostics: &Diagnostics) -> String {
    diagnostics.iter().map(render_diagnostic).collect()
}

fn render_diagnostic(diagnostic: &Diagnostic) -> String {
    let label = match diagnostic.severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
    };
    format!(
        "{label}[{}]: {}\n  {} {}\n  {}\n",
        diagnostic.kind.as_str(),
        diagnostic.summary.bold(),
        "-->".blue(),
        diagnostic.range,
        diagnostic.detail,
    )
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

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                return Err(anyhow!("glob pattern matched no files: {pattern}"));
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{DiagnosticKind, SourceRange};

    #[test]
    fn parses_subcommands() {
        let cli = CommandLineInterface::try_parse_from([
            "hcl-model", "convert", "-s", "a.json", "b.json", "--from", "int", "--to", "number",
        ])
        .unwrap();
        let Command::Convert(cmd) = cli.cmd else {
            panic!("expected convert");
        };
        assert_eq!(cmd.schema_settings.schema, ["a.json", "b.json"]);
        assert_eq!((cmd.from.as_str(), cmd.to.as_str()), ("int", "number"));
        assert!(CommandLineInterface::try_parse_from(["hcl-model", "display"]).is_err());
    }

    #[test]
    fn literal_paths_pass_through_untouched() {
        let paths = resolve_file_path_patterns(["does/not/exist.json"]).unwrap();
        assert_eq!(paths, [PathBuf::from("does/not/exist.json")]);
        assert!(resolve_file_path_patterns(["no-such-dir-*/x.json"]).is_err());
    }

    #[test]
    fn diagnostics_render_with_location() {
        colored::control::set_override(false);
        let diagnostic = Diagnostic::error(
            DiagnosticKind::UnknownProperty,
            "unknown property `x`",
            "object({}) has no property `x`",
            SourceRange::single_line("<path>", 0, 1),
        );
        let text = render_diagnostic(&diagnostic);
        assert!(text.starts_with("error[unknown_property]: unknown property `x`"), "{text}");
        assert!(text.contains("--> <path>:1,1-2"), "{text}");
    }
}
