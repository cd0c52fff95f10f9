//! Command-line front end: reads JSON files and diagnoses each one through
//! a pipeline validator.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use shapecheck_kernel::{Pipeline, TypeSelector, ValidatorOptions};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "shapecheck", version, about)]
pub struct Args {
    /// Schema project root; `shapecheck.toml` there is read when present.
    #[arg(short, long, default_value = ".")]
    pub project: PathBuf,

    /// Module exporting the type, relative to the project root. Without it
    /// the type is resolved against global declarations.
    #[arg(short, long)]
    pub module: Option<String>,

    /// Type to validate against, e.g. `User` or `string[]`.
    #[arg(short = 't', long = "type")]
    pub type_name: String,

    /// Print one JSON report per file instead of text.
    #[arg(long)]
    pub json: bool,

    /// JSON files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

impl Args {
    pub fn selector(&self) -> TypeSelector {
        match &self.module {
            Some(module) => TypeSelector::module(module.clone(), self.type_name.clone()),
            None => TypeSelector::Expr(self.type_name.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    file: &'a std::path::Path,
    valid: bool,
    reasons: &'a [String],
}

/// Validate every file; `Ok(true)` when all of them are valid.
pub async fn run(args: &Args, out: &mut impl Write) -> Result<bool> {
    let options = ValidatorOptions::load(&args.project)
        .with_context(|| format!("loading options for {}", args.project.display()))?;
    let pipeline = Pipeline::new()?;
    let validator = pipeline.validator(options);
    if !validator.initialized().await {
        anyhow::bail!("failed to initialize validator for {}", args.project.display());
    }

    let selector = args.selector();
    let mut all_valid = true;
    for file in &args.files {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("reading {}", file.display()))?;
        let value: Value =
            serde_json::from_str(&text).with_context(|| format!("parsing {}", file.display()))?;
        debug!(file = %file.display(), "diagnosing");

        let reasons = validator
            .diagnose(selector.clone(), value)
            .await
            .with_context(|| format!("validating {}", file.display()))?
            .unwrap_or_default();
        all_valid &= reasons.is_empty();
        report(out, file, &reasons, args.json)?;
    }

    info!(files = args.files.len(), all_valid, "done");
    drop(validator);
    pipeline.shutdown().await;
    Ok(all_valid)
}

fn report(out: &mut impl Write, file: &std::path::Path, reasons: &[String], json: bool) -> Result<()> {
    if json {
        let line = serde_json::to_string(&Report {
            file,
            valid: reasons.is_empty(),
            reasons,
        })?;
        writeln!(out, "{line}")?;
    } else if reasons.is_empty() {
        writeln!(out, "{}: ok", file.display())?;
    } else {
        writeln!(out, "{}:", file.display())?;
        for reason in reasons {
            for line in reason.lines() {
                writeln!(out, "  {line}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::write(
            dir.path().join("index.d.ts"),
            "export interface User { /** @pattern ^[a-z]+$ */ name: string }",
        )
        .unwrap_or_else(|e| panic!("write: {e}"));
        std::fs::write(dir.path().join("good.json"), r#"{"name": "ada"}"#)
            .unwrap_or_else(|e| panic!("write: {e}"));
        std::fs::write(dir.path().join("bad.json"), r#"{"name": "ADA"}"#)
            .unwrap_or_else(|e| panic!("write: {e}"));
        dir
    }

    fn args(dir: &tempfile::TempDir, file: &str, json: bool) -> Args {
        Args {
            project: dir.path().to_path_buf(),
            module: Some(".".to_string()),
            type_name: "User".to_string(),
            json,
            files: vec![dir.path().join(file)],
        }
    }

    #[rstest]
    #[case("--type", None)]
    #[case("--module", Some("."))]
    fn parses_selector(#[case] flag: &str, #[case] module: Option<&str>) {
        let mut argv = vec!["shapecheck", "-t", "User"];
        if flag == "--module" {
            argv.extend(["--module", "."]);
        }
        argv.push("a.json");
        let args = Args::try_parse_from(argv).unwrap_or_else(|e| panic!("parse: {e}"));
        assert_eq!(args.module.as_deref(), module);
        let expected = match module {
            Some(m) => TypeSelector::module(m, "User"),
            None => TypeSelector::from("User"),
        };
        assert_eq!(args.selector(), expected);
    }

    #[test]
    fn files_are_required() {
        assert!(Args::try_parse_from(["shapecheck", "-t", "User"]).is_err());
    }

    #[tokio::test]
    async fn reports_valid_file() {
        let dir = project();
        let mut out = Vec::new();
        let valid = run(&args(&dir, "good.json", false), &mut out).await;
        assert!(matches!(valid, Ok(true)));
        let text = String::from_utf8_lossy(&out);
        assert!(text.ends_with("good.json: ok\n"), "{text}");
    }

    #[tokio::test]
    async fn reports_invalid_file_as_json() {
        let dir = project();
        let mut out = Vec::new();
        let valid = run(&args(&dir, "bad.json", true), &mut out).await;
        assert!(matches!(valid, Ok(false)));
        let report: Value = serde_json::from_slice(&out).unwrap_or_else(|e| panic!("json: {e}"));
        assert_eq!(report["valid"], Value::Bool(false));
        assert_eq!(
            report["reasons"][0],
            Value::String(
                "Diagnostic value path: [\"name\"]\n  Value \"ADA\" does not match pattern ^[a-z]+$".to_string()
            )
        );
    }
}
