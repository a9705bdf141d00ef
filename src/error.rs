//! Compile errors.
//!
//! Every failure is fatal: the first error aborts the compile and is returned
//! to the caller unchanged. Each variant carries a stable code so tooling can
//! match on failures without parsing messages.

use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_PARSE: &str = "HBS-ERR-PARSE-001";
pub const ERR_EMPTY_PATH: &str = "HBS-ERR-PATH-001";
pub const ERR_PARENT_TRAVERSAL: &str = "HBS-ERR-PATH-002";
pub const ERR_UNSUPPORTED_EXPRESSION: &str = "HBS-ERR-EXPR-001";
pub const ERR_UNEXPECTED_STATEMENT: &str = "HBS-ERR-STMT-001";
pub const ERR_TOP_LEVEL_COMMENT: &str = "HBS-ERR-STMT-002";
pub const ERR_ATTRIBUTE_VALUE: &str = "HBS-ERR-ATTR-001";
pub const ERR_BLOCK_STATEMENT: &str = "HBS-ERR-BLOCK-001";
pub const ERR_BLOCK_PARAMS: &str = "HBS-ERR-BLOCK-002";
pub const ERR_BLOCK_IN_ATTRIBUTE: &str = "HBS-ERR-PRE-001";
pub const ERR_OVERLAPPING_REWRITE: &str = "HBS-ERR-PRE-002";
pub const ERR_INVALID_OUTPUT: &str = "HBS-ERR-OUT-001";
pub const ERR_INVALID_OPTIONS: &str = "HBS-ERR-OPT-001";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("Parse error at offset {offset}: {message}")]
    Parse { message: String, offset: usize },

    #[error("Unexpected empty expression parts")]
    EmptyPath,

    #[error("Unsupported parent context traversal in `{path}`")]
    UnsupportedParentTraversal { path: String },

    #[error("Unexpected expression type: {kind}")]
    UnsupportedExpression { kind: String },

    #[error("Unexpected statement type: {kind}")]
    UnexpectedStatement { kind: String },

    #[error("Top level comments currently is not supported")]
    TopLevelCommentUnsupported,

    #[error("Unexpected attribute value of `{attribute}`: {kind}")]
    UnsupportedAttributeValue { attribute: String, kind: String },

    #[error("Unexpected {name} statement")]
    UnexpectedBlockStatement { name: String },

    #[error("Block `{name}` expects {expected}")]
    InvalidBlockParams { name: String, expected: String },

    #[error("Unsupported block statement in attribute `{attribute}`: {reason}")]
    UnsupportedBlockInAttribute { attribute: String, reason: String },

    #[error("Template rewrites overlap at offset {offset}")]
    OverlappingRewrite { offset: usize },

    #[error("Generated code failed to parse: {diagnostics}")]
    InvalidOutput { diagnostics: String },

    #[error("Invalid compile options: {0}")]
    InvalidOptions(String),
}

impl CompileError {
    pub fn parse(message: impl Into<String>, offset: usize) -> Self {
        CompileError::Parse {
            message: message.into(),
            offset,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CompileError::Parse { .. } => ERR_PARSE,
            CompileError::EmptyPath => ERR_EMPTY_PATH,
            CompileError::UnsupportedParentTraversal { .. } => ERR_PARENT_TRAVERSAL,
            CompileError::UnsupportedExpression { .. } => ERR_UNSUPPORTED_EXPRESSION,
            CompileError::UnexpectedStatement { .. } => ERR_UNEXPECTED_STATEMENT,
            CompileError::TopLevelCommentUnsupported => ERR_TOP_LEVEL_COMMENT,
            CompileError::UnsupportedAttributeValue { .. } => ERR_ATTRIBUTE_VALUE,
            CompileError::UnexpectedBlockStatement { .. } => ERR_BLOCK_STATEMENT,
            CompileError::InvalidBlockParams { .. } => ERR_BLOCK_PARAMS,
            CompileError::UnsupportedBlockInAttribute { .. } => ERR_BLOCK_IN_ATTRIBUTE,
            CompileError::OverlappingRewrite { .. } => ERR_OVERLAPPING_REWRITE,
            CompileError::InvalidOutput { .. } => ERR_INVALID_OUTPUT,
            CompileError::InvalidOptions(_) => ERR_INVALID_OPTIONS,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_runtime_wording() {
        assert_eq!(
            CompileError::EmptyPath.to_string(),
            "Unexpected empty expression parts"
        );
        assert_eq!(
            CompileError::UnexpectedBlockStatement {
                name: "custom".into()
            }
            .to_string(),
            "Unexpected custom statement"
        );
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(CompileError::parse("x", 3).code(), "HBS-ERR-PARSE-001");
        assert_eq!(
            CompileError::TopLevelCommentUnsupported.code(),
            "HBS-ERR-STMT-002"
        );
    }
}
