mod compile_file;

pub use compile_file::{FileReport, compile_file, output_path};

use anyhow::bail;
use clap::ValueEnum;
use std::{
    fmt::Display,
    fs,
    path::{Path, PathBuf},
};
use token::Position;

pub const SOURCE_EXTENSION: &str = "jack";

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[clap(rename_all = "kebab_case")]
pub enum Emit {
    /// VM instructions, written to `Foo.vm`
    #[default]
    Vm,
    /// the lexed token stream as XML, written to `FooT.xml`
    Tokens,
    /// the parse tree as XML, written to `Foo.xml`
    Tree,
}

/// A problem found in a source file, rendered `<file>:<line>:<column>: <message>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub source: PathBuf,
    pub position: Position,
    pub message: String,
}

impl Diagnostic {
    pub fn new(source: &Path, position: Position, message: impl Display) -> Self {
        Self {
            source: source.to_path_buf(),
            position,
            message: message.to_string(),
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.source.display(),
            self.position,
            self.message
        )
    }
}

/// The source files named by `path`: the file itself, or the `.jack` files
/// directly inside a directory in file-name order.
pub fn sources(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if path.is_dir() {
        let mut files = Vec::new();
        for entry in fs::read_dir(path)? {
            let file = entry?.path();
            if file.is_file() && has_source_extension(&file) {
                files.push(file);
            }
        }
        files.sort();

        if files.is_empty() {
            bail!("no .{SOURCE_EXTENSION} files found in {}", path.display());
        }
        return Ok(files);
    }

    if !path.exists() {
        bail!("{} does not exist", path.display());
    }
    if !has_source_extension(path) {
        bail!("{} is not a .{SOURCE_EXTENSION} file", path.display());
    }

    Ok(vec![path.to_path_buf()])
}

/// Compiles every source file under `path` independently, printing
/// diagnostics to stderr as it goes. Returns whether every file compiled
/// cleanly.
pub fn compile_path(path: &Path, emit: Emit) -> anyhow::Result<bool> {
    let files = sources(path)?;
    log::info!("compiling {} file(s) from {}", files.len(), path.display());

    let mut failed = 0;
    for file in &files {
        match compile_file(file, emit) {
            Ok(report) if report.is_ok() => {}
            Ok(report) => {
                failed += 1;
                for diagnostic in &report.diagnostics {
                    eprintln!("{diagnostic}");
                }
                eprintln!(
                    "error: could not compile {} due to {} error(s)",
                    report.source.display(),
                    report.diagnostics.len()
                );
            }
            Err(err) => {
                failed += 1;
                eprintln!("error: {err:#}");
            }
        }
    }

    if failed > 0 {
        log::warn!("{failed} of {} file(s) failed to compile", files.len());
    }

    Ok(failed == 0)
}

fn has_source_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION)
}
