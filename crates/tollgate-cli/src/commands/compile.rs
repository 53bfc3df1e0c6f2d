//! Compile command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};
use walkdir::WalkDir;

use tollgate_compiler::{CompiledDocument, Compiler, CompilerOptions};

/// Extension of policy source files.
const SOURCE_EXTENSION: &str = "cs";

/// Arguments for the compile command.
#[derive(Args)]
pub struct CompileArgs {
    /// Policy source file or directory to search for sources
    #[arg(default_value = "policies")]
    pub source: PathBuf,

    /// Directory the documents are written to
    #[arg(short, long, env = "TOLLGATE_OUTPUT", default_value = "out")]
    pub output: PathBuf,

    /// Write indented XML
    #[arg(long)]
    pub format: bool,

    /// Spaces per indentation level with --format
    #[arg(long, default_value = "4")]
    pub indent: usize,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Exit successfully even when diagnostics were reported
    #[arg(long)]
    pub no_fail: bool,
}

/// Runs the compile command.
pub fn run(args: &CompileArgs) -> Result<()> {
    info!(source = ?args.source, output = ?args.output, "Compiling policies");

    let sources = discover_sources(&args.source)?;
    if sources.is_empty() {
        println!("No policy sources found in {}", args.source.display());
        return Ok(());
    }

    let options = CompilerOptions::new()
        .with_format(args.format)
        .with_indent(args.indent)
        .with_fail_on_diagnostics(!args.no_fail);
    let compiler = Compiler::new(options);
    let documents = compiler.compile_files(&sources)?;

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory {}", args.output.display()))?;

    let mut written = Vec::with_capacity(documents.len());
    for document in &documents {
        let path = compiler.write(document, &args.output)?;
        if written.contains(&path) {
            warn!(path = ?path, "Document name used more than once, overwritten");
        }
        info!(document = %document.marker.name, path = ?path, "Wrote document");
        written.push(path);
    }

    if args.json {
        print_json(&documents, &written)?;
    } else {
        print_report(&documents, &written);
    }

    let diagnostics: usize = documents.iter().map(|d| d.diagnostics.len()).sum();
    if compiler.has_failed(&documents) {
        anyhow::bail!("Compilation reported {diagnostics} diagnostic(s)");
    }
    Ok(())
}

/// Finds policy sources: the file itself, or every `.cs` file below a directory.
fn discover_sources(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|e| e == SOURCE_EXTENSION)
        {
            sources.push(entry.into_path());
        }
    }
    Ok(sources)
}

fn print_report(documents: &[CompiledDocument], written: &[PathBuf]) {
    for (document, path) in documents.iter().zip(written) {
        for diagnostic in &document.diagnostics {
            println!("{diagnostic}");
        }
        let status = if document.is_clean() { "✓" } else { "✗" };
        println!("{status} {} -> {}", document.marker.name, path.display());
    }
    println!("\nCompiled {} document(s)", documents.len());
}

fn print_json(documents: &[CompiledDocument], written: &[PathBuf]) -> Result<()> {
    let report: Vec<_> = documents
        .iter()
        .zip(written)
        .map(|(document, path)| {
            serde_json::json!({
                "name": document.marker.name,
                "kind": document.marker.kind,
                "scope": document.marker.scope,
                "source": document.source,
                "output": path.display().to_string(),
                "diagnostics": document.diagnostics,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_sources_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.cs"), "").unwrap();
        std::fs::write(dir.path().join("a.cs"), "").unwrap();
        std::fs::write(dir.path().join("notes.md"), "").unwrap();
        std::fs::write(dir.path().join("nested").join("c.cs"), "").unwrap();

        let sources = discover_sources(dir.path()).unwrap();
        let names: Vec<_> = sources
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, ["a.cs", "b.cs", "nested/c.cs"]);
    }

    #[test]
    fn test_discover_missing_path() {
        assert!(discover_sources(Path::new("/nonexistent/policies")).is_err());
    }
}
