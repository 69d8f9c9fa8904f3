use crate::{Diagnostic, Emit};
use anyhow::Context;
use compiler::Compilation;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Outcome of compiling one source file.
#[derive(Debug)]
pub struct FileReport {
    pub source: PathBuf,
    /// `None` when the file had errors; nothing is written then.
    pub output: Option<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileReport {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// `Foo.jack` becomes `Foo.vm`, `FooT.xml` for a token dump or `Foo.xml`
/// for a parse tree.
pub fn output_path(source: &Path, emit: Emit) -> PathBuf {
    match emit {
        Emit::Vm => source.with_extension("vm"),
        Emit::Tree => source.with_extension("xml"),
        Emit::Tokens => {
            let stem = source.file_stem().unwrap_or_default().to_string_lossy();
            source.with_file_name(format!("{stem}T.xml"))
        }
    }
}

/// Compiles one file and writes its sibling output. Only I/O failures are
/// returned as errors; problems in the source end up in the report.
pub fn compile_file(source: &Path, emit: Emit) -> anyhow::Result<FileReport> {
    let input = fs::read_to_string(source)
        .with_context(|| format!("{} could not be read", source.display()))?;

    let rendered = match emit {
        Emit::Vm => render_vm(source, &input),
        Emit::Tokens => render_tokens(source, &input),
        Emit::Tree => render_tree(source, &input),
    };

    let text = match rendered {
        Ok(text) => text,
        Err(diagnostics) => {
            return Ok(FileReport {
                source: source.to_path_buf(),
                output: None,
                diagnostics,
            });
        }
    };

    let output = output_path(source, emit);
    fs::write(&output, text)
        .with_context(|| format!("{} could not be written", output.display()))?;
    log::info!("wrote {}", output.display());

    Ok(FileReport {
        source: source.to_path_buf(),
        output: Some(output),
        diagnostics: Vec::new(),
    })
}

fn render_vm(source: &Path, input: &str) -> Result<String, Vec<Diagnostic>> {
    let compilation = compiler::compile(input)
        .map_err(|err| vec![Diagnostic::new(source, err.position(), &err)])?;

    log::debug!(
        "class {} compiled to {} instructions",
        compilation.class_name,
        compilation.instructions.len()
    );

    check(source, &compilation)?;

    Ok(compilation.output())
}

fn render_tree(source: &Path, input: &str) -> Result<String, Vec<Diagnostic>> {
    let compilation = compiler::analyze(input)
        .map_err(|err| vec![Diagnostic::new(source, err.position(), &err)])?;

    check(source, &compilation)?;

    Ok(compilation.tree.unwrap_or_default())
}

fn check(source: &Path, compilation: &Compilation) -> Result<(), Vec<Diagnostic>> {
    if compilation.is_ok() {
        return Ok(());
    }

    Err(compilation
        .errors
        .iter()
        .map(|err| Diagnostic::new(source, err.position, err))
        .collect())
}

fn render_tokens(source: &Path, input: &str) -> Result<String, Vec<Diagnostic>> {
    let tokens = lexer::tokenize(input)
        .map_err(|err| vec![Diagnostic::new(source, err.position(), &err)])?;

    Ok(lexer::tokens_to_xml(&tokens))
}
