//! Syntax check of generated code with `oxc_parser`.

use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_span::SourceType;
use tracing::debug;

use crate::error::{CompileError, Result};

/// Parses `code` as a JSX module and reports any diagnostic.
pub fn verify_output(code: &str) -> Result<()> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(true).with_jsx(true);
    let ret = Parser::new(&allocator, code, source_type).parse();

    if ret.panicked || !ret.errors.is_empty() {
        let diagnostics = ret
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(CompileError::InvalidOutput {
            diagnostics: if diagnostics.is_empty() {
                "parser aborted".to_string()
            } else {
                diagnostics
            },
        });
    }

    debug!(statements = ret.program.body.len(), "verified output");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_generated_shapes() {
        verify_output("import React from \"react\";\nexport default (props) => <div className={props.a}>{/* c */}</div>;").unwrap();
        verify_output("(props) => props.list.map((item, i) => <React.Fragment key={i}>{item}</React.Fragment>);").unwrap();
    }

    #[test]
    fn test_rejects_broken_jsx() {
        assert!(matches!(
            verify_output("<div>{</div>;"),
            Err(CompileError::InvalidOutput { .. })
        ));
    }
}
