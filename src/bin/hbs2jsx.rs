//! hbs2jsx
//!
//! Compiles Handlebars templates to JSX.
//!
//! ```bash
//! hbs2jsx template.hbs                     # prints to stdout
//! cat template.hbs | hbs2jsx --module      # reads stdin
//! hbs2jsx templates/ --out-dir build/jsx   # compiles a tree in parallel
//! ```

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use hbs_jsx_compiler::{compile, CompileError, CompileOptions};
use rayon::prelude::*;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

const TEMPLATE_EXTENSIONS: &[&str] = &["hbs", "handlebars"];

#[derive(Parser, Debug)]
#[command(name = "hbs2jsx")]
#[command(about = "Compile Handlebars templates to JSX", long_about = None)]
#[command(version)]
struct Cli {
    /// Template file or directory. Reads stdin when omitted.
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output directory for compiled `.jsx` files (required for directory input)
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Emit a bare JSX expression instead of a `(props) => ...` component
    #[arg(long)]
    no_component: bool,

    /// Export the result as the module default
    #[arg(short, long)]
    module: bool,

    /// Emit framework, partial and helper imports (with --module)
    #[arg(short, long)]
    include_import: bool,

    /// Read template data from `props.context`
    #[arg(long)]
    always_include_context: bool,

    /// Rewrite blocks inside attributes and attribute-generating helpers
    #[arg(short = 'x', long)]
    experimental: bool,

    /// Re-parse the generated code and fail on syntax errors
    #[arg(long)]
    verify: bool,
}

impl Cli {
    fn options(&self) -> CompileOptions {
        CompileOptions {
            is_component: !self.no_component,
            is_module: self.module,
            include_import: self.include_import,
            always_include_context: self.always_include_context,
            include_experimental_features: self.experimental,
            verify_output: self.verify,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] io::Error),

    #[error("{}: [{}] {}", .0.display(), .1.code(), .1)]
    Compile(PathBuf, #[source] CompileError),

    #[error("--out-dir is required when compiling a directory")]
    MissingOutDir,
}

fn read_template(path: &Path) -> Result<String, CliError> {
    let source = fs::read_to_string(path).map_err(|e| CliError::Io(path.to_path_buf(), e))?;
    Ok(source.trim_end().to_string())
}

fn is_template(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext))
}

fn compile_file(path: &Path, options: CompileOptions) -> Result<String, CliError> {
    let source = read_template(path)?;
    compile(&source, options).map_err(|e| CliError::Compile(path.to_path_buf(), e))
}

/// Compiles every template under `root` into `out_dir`, mirroring the tree.
fn compile_tree(root: &Path, out_dir: &Path, options: CompileOptions) -> Vec<CliError> {
    let mut files = Vec::new();
    let mut errors = Vec::new();
    for entry in WalkDir::new(root) {
        match entry {
            Ok(entry) if entry.file_type().is_file() && is_template(entry.path()) => {
                files.push(entry.into_path())
            }
            Ok(_) => {}
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                errors.push(CliError::Io(path, io::Error::from(e)));
            }
        }
    }
    debug!(count = files.len(), root = %root.display(), "compiling templates");

    errors.par_extend(files.par_iter().filter_map(|path| {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let target = out_dir.join(relative).with_extension("jsx");
        let result = compile_file(path, options).and_then(|code| {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| CliError::Io(parent.to_path_buf(), e))?;
            }
            fs::write(&target, code + "\n").map_err(|e| CliError::Io(target.clone(), e))
        });
        result.err()
    }));
    errors
}

fn run(cli: &Cli) -> Vec<CliError> {
    let options = cli.options();
    match &cli.input {
        None => {
            let mut source = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut source) {
                return vec![CliError::Io(PathBuf::from("<stdin>"), e)];
            }
            match compile(source.trim_end(), options) {
                Ok(code) => {
                    println!("{}", code);
                    Vec::new()
                }
                Err(e) => vec![CliError::Compile(PathBuf::from("<stdin>"), e)],
            }
        }
        Some(input) if input.is_dir() => match &cli.out_dir {
            Some(out_dir) => compile_tree(input, out_dir, options),
            None => vec![CliError::MissingOutDir],
        },
        Some(input) => match compile_file(input, options) {
            Ok(code) => match &cli.out_dir {
                Some(out_dir) => {
                    let name = input.file_name().map(PathBuf::from).unwrap_or_default();
                    let target = out_dir.join(name).with_extension("jsx");
                    let written = fs::create_dir_all(out_dir)
                        .and_then(|_| fs::write(&target, code + "\n"))
                        .map_err(|e| CliError::Io(target, e));
                    written.err().into_iter().collect()
                }
                None => {
                    println!("{}", code);
                    Vec::new()
                }
            },
            Err(e) => vec![e],
        },
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let errors = run(&cli);
    if !errors.is_empty() {
        for e in &errors {
            error!("{}", e);
        }
        process::exit(1);
    }
}
