//! Compile options and the fixed names shared by every pass.

use serde::Deserialize;

use crate::error::{CompileError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED NAMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Parameter of the generated component function.
pub const ROOT_PARAM: &str = "props";
/// Property holding the data context when `alwaysIncludeContext` is set.
pub const CONTEXT_PROPERTY: &str = "context";
/// Per-iteration item of an `each` loop.
pub const EACH_ITEM: &str = "item";
/// Per-iteration index of an `each` loop.
pub const EACH_INDEX: &str = "i";
pub const FRAMEWORK_NAME: &str = "React";
pub const FRAMEWORK_SOURCE: &str = "react";
pub const FRAGMENT_PROPERTY: &str = "Fragment";
/// Attribute the pre-processor binds attribute-generating helper calls to.
pub const ATTRIBUTE_GENERATOR_PLACEHOLDER: &str = "hbs-attribute-generator";
/// Helper converting an attribute string into a props object.
pub const ATTRIBUTE_GENERATOR_HELPER: &str = "generateAttributes";
pub const LINK_COMPONENT: &str = "Link";

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Wrap the template in a `(props) => ...` component function.
    pub is_component: bool,
    /// Emit `export default` instead of a bare expression statement.
    pub is_module: bool,
    /// Emit framework, partial and helper imports. Only honored for modules.
    pub include_import: bool,
    /// Resolve root paths against `props.context`.
    pub always_include_context: bool,
    /// Run the attribute block-statement rewriter before parsing.
    pub include_experimental_features: bool,
    /// Re-parse the generated code and fail on syntax errors.
    pub verify_output: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            is_component: true,
            is_module: false,
            include_import: false,
            always_include_context: false,
            include_experimental_features: false,
            verify_output: false,
        }
    }
}

impl From<bool> for CompileOptions {
    fn from(is_component: bool) -> Self {
        Self {
            is_component,
            ..Self::default()
        }
    }
}

impl CompileOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CompileError::InvalidOptions(e.to_string()))
    }

    pub fn emits_imports(&self) -> bool {
        self.include_import && self.is_module
    }

    /// Scope segments every root-level path is prefixed with, or none when
    /// the output is not a component.
    pub fn root_scope(&self) -> Vec<String> {
        if !self.is_component {
            return Vec::new();
        }
        let mut scope = vec![ROOT_PARAM.to_string()];
        if self.always_include_context {
            scope.push(CONTEXT_PROPERTY.to_string());
        }
        scope
    }
}
