//! # Handlebars → JSX compiler
//!
//! ## Pipeline
//!
//! 1. **Pre-processing** (`includeExperimentalFeatures` only): textual rewrite
//!    of blocks inside/around attributes and attribute-generating helpers.
//! 2. **Parse**: mustache normalization, `html5ever` tokenizing, strict tree
//!    building into the template AST.
//! 3. **Namespace resolution**: every value path is mapped to its scope
//!    (`props`, `props.context`, `item`, a `with` narrowing). Read-only
//!    annotations; the AST is never mutated.
//! 4. **Conversion**: statements, elements, blocks and styles become an
//!    `oxc_ast` JSX tree in a per-call arena, assembled into a program.
//! 5. **Print + finalize**: `oxc_codegen` output joined to a single line,
//!    imports on their own lines.
//! 6. **Verify** (`verifyOutput` only): the output is re-parsed with `oxc_parser`.
//!
//! All state lives in a [`context::CompileContext`] built per call, so
//! compiles can run concurrently.
//!
//! ```no_run
//! let jsx = hbs_jsx_compiler::compile("<div>{{#if variable}}<div/>{{/if}}</div>", true)?;
//! assert_eq!(jsx, "(props) => <div>{Boolean(props.variable) && <div />}</div>;");
//! # Ok::<(), hbs_jsx_compiler::CompileError>(())
//! ```

#[cfg(feature = "napi")]
use napi_derive::napi;
use oxc_allocator::Allocator;
use tracing::debug;

pub mod ast;
mod blocks;
pub mod codegen;
pub mod context;
mod elements;
pub mod error;
mod expressions;
pub mod finalize;
pub mod mustache;
pub mod options;
pub mod parse;
pub mod preprocess;
mod program;
pub mod scope;
mod styles;
pub mod verify;
pub mod visitor;


pub use error::{CompileError, Result};
pub use options::CompileOptions;
pub use preprocess::{preprocess, PreparedTemplate};

use context::CompileContext;

/// Compiles a Handlebars template to JSX source.
///
/// `options` may be a `bool` (shorthand for `isComponent`) or a full
/// [`CompileOptions`].
pub fn compile(template: &str, options: impl Into<CompileOptions>) -> Result<String> {
    let options = options.into();

    let prepared = if options.include_experimental_features {
        preprocess(template)?
    } else {
        PreparedTemplate::unchanged(template)
    };

    let ast = parse::parse_template(&prepared.template)?;
    let scopes = scope::resolve_namespaces(&ast, &options)?;
    let allocator = Allocator::default();
    let ctx = CompileContext::new(&allocator, &options, &scopes);
    let program = ctx.create_program(&ast, &prepared.helpers)?;

    let code = finalize::finalize_output(&codegen::print_program(&program));
    if options.verify_output {
        verify::verify_output(&code)?;
    }
    debug!(bytes = code.len(), "compiled template");
    Ok(code)
}

#[cfg(feature = "napi")]
#[napi]
pub fn compile_template(template: String, options_json: Option<String>) -> napi::Result<String> {
    let options = match options_json {
        Some(json) => CompileOptions::from_json(&json)
            .map_err(|e| napi::Error::from_reason(format!("{}: {}", e.code(), e)))?,
        None => CompileOptions::default(),
    };
    compile(&template, options).map_err(|e| napi::Error::from_reason(format!("{}: {}", e.code(), e)))
}
