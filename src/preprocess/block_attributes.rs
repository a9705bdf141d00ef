//! Rewrites `if`/`unless` blocks inside or around attribute values into
//! calls of synthesized helpers.
//!
//! ```text
//! <a class="btn {{#if active}}on{{/if}}">
//!   => const classIfHelper = (active) => active ? "btn on" : "btn ";
//!      <a class="{{classIfHelper active}}">
//! ```

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::debug;

use super::splice::{splice, Replacement};
use super::tags::{opening_tags, OpeningTag};
use super::{ConditionalHelper, HelperNames, HelperPart, PreparedTemplate};
use crate::error::{CompileError, Result};
use crate::expressions::is_identifier;

lazy_static! {
    /// `name="..."`, `name='...'` or `name=bare`; quoted values may hold mustaches.
    static ref ATTRIBUTE_RE: Regex = Regex::new(
        r#"([\w:-]+)\s?=\s?(?:"((?:\{\{.*?\}\}|[^"])*)"|'((?:\{\{.*?\}\}|[^'])*)'|([^\s"'>]+))"#
    )
    .unwrap();
    static ref CONTAINS_BLOCK_RE: Regex = Regex::new(r"(?s)\{\{.*\}\}.*\{\{/.*\}\}").unwrap();
    static ref VALUE_BLOCK_RE: Regex = Regex::new(
        r"(?s)^([^}]*)\{\{#(if|unless)\s+([^}]*?)\s*\}\}(.*)\{\{/(if|unless)\s*\}\}([^{]*)$"
    )
    .unwrap();
    static ref CHILD_MUSTACHE_RE: Regex = Regex::new(r"\{\{\s*(@?[\w.]+)\s*\}\}").unwrap();
    /// `{{else}}`, `{{else if x}}` and `{{^}}`, with optional `~`.
    static ref INVERSE_RE: Regex = Regex::new(r"\{\{~?\s*(?:else\b|\^)").unwrap();
    static ref CONDITION_PATH_RE: Regex = Regex::new(r"^@?[\w.]+$").unwrap();
    static ref NAME_SEPARATOR_RE: Regex = Regex::new(r"[-:]+([A-Za-z0-9])").unwrap();
}

const RESERVED: &[&str] = &[
    "this", "class", "default", "delete", "new", "function", "return", "var", "let", "const",
    "if", "else", "for", "while", "do", "in", "of", "typeof", "void", "null", "true", "false",
    "undefined", "switch", "case", "break", "continue", "with", "yield", "await", "import",
    "export", "extends", "super", "throw", "try", "catch", "finally", "instanceof", "enum",
];

/// One attribute located inside an opening tag.
#[derive(Debug, Clone, PartialEq)]
struct LocatedAttribute {
    name: String,
    value: String,
    /// Absolute span of the whole `name=value` text.
    start: usize,
    end: usize,
}

fn attributes_in(template: &str, tag: &OpeningTag) -> Vec<LocatedAttribute> {
    let text = tag.text(template);
    ATTRIBUTE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if tag.in_mustache(whole.start()) {
                return None;
            }
            let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4))?;
            Some(LocatedAttribute {
                name: caps[1].to_string(),
                value: value.as_str().to_string(),
                start: tag.start + whole.start(),
                end: tag.start + whole.end(),
            })
        })
        .collect()
}

/// What the helper returns when the condition fails.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Otherwise {
    /// Leading and trailing text of the value.
    Surrounding,
    /// `undefined`, removing the attribute.
    Undefined,
}

#[derive(Debug)]
struct ConditionalAttribute<'a> {
    attribute: &'a str,
    block: &'a str,
    condition: &'a str,
    body: &'a str,
    lead: &'a str,
    trail: &'a str,
    otherwise: Otherwise,
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Parameter name for an argument: last path segment, lower-cased first letter.
fn param_name(argument: &str, fallback: &str) -> String {
    if !CONDITION_PATH_RE.is_match(argument) {
        return fallback.to_string();
    }
    let last = argument.rsplit('.').next().unwrap_or(argument).trim_start_matches('@');
    let name = lowercase_first(last);
    if is_identifier(&name) && !RESERVED.contains(&name.as_str()) {
        name
    } else {
        fallback.to_string()
    }
}

/// `data-id` + `if` → `dataIdIfHelper`
fn helper_base_name(attribute: &str, block: &str) -> String {
    let lower = attribute.to_lowercase();
    let camel = NAME_SEPARATOR_RE.replace_all(&lower, |caps: &Captures| caps[1].to_uppercase());
    let cleaned: String = camel.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_').collect();
    format!("{}{}Helper", cleaned, capitalize(block))
}

impl ConditionalAttribute<'_> {
    fn unsupported(&self, reason: &str) -> CompileError {
        CompileError::UnsupportedBlockInAttribute {
            attribute: self.attribute.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Builds the helper and the replacement attribute text.
    fn build(&self, names: &mut HelperNames) -> Result<(ConditionalHelper, String)> {
        if INVERSE_RE.is_match(self.body) {
            return Err(self.unsupported("else branches are not supported"));
        }
        if self.body.contains("{{#") {
            return Err(self.unsupported("nested block statements are not supported"));
        }
        let children: Vec<_> = CHILD_MUSTACHE_RE.captures_iter(self.body).collect();
        if children.len() > 1 {
            return Err(self.unsupported("expected at most one mustache inside the block"));
        }
        if self.body.contains("{{") && children.is_empty() {
            return Err(self.unsupported("only plain value mustaches are supported inside the block"));
        }

        let condition = self.condition.trim();
        let condition_param = param_name(condition, "condition");
        let mut params = vec![condition_param.clone()];
        let mut arguments = vec![condition.to_string()];

        let consequent = match children.first() {
            Some(child) => {
                let whole = child.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
                let path = &child[1];
                let mut child_param = param_name(path, "value");
                if child_param == condition_param {
                    child_param.push_str("Value");
                }
                params.push(child_param.clone());
                arguments.push(path.to_string());

                let before = format!("{}{}", self.lead, &self.body[..whole.0]);
                let after = format!("{}{}", &self.body[whole.1..], self.trail);
                let mut parts = Vec::new();
                if !before.is_empty() {
                    parts.push(HelperPart::Text(before));
                }
                parts.push(HelperPart::Param(child_param));
                if !after.is_empty() {
                    parts.push(HelperPart::Text(after));
                }
                parts
            }
            None => vec![HelperPart::Text(format!("{}{}{}", self.lead, self.body, self.trail))],
        };
        let alternate = match self.otherwise {
            Otherwise::Surrounding => Some(format!("{}{}", self.lead, self.trail)),
            Otherwise::Undefined => None,
        };

        let name = names.unique(&helper_base_name(self.attribute, self.block));
        let replacement = format!("{}=\"{{{{{} {}}}}}\"", self.attribute, name, arguments.join(" "));
        let helper = ConditionalHelper {
            name,
            params,
            negate: self.block == "unless",
            consequent,
            alternate,
        };
        Ok((helper, replacement))
    }
}

fn tag_name(text: &str) -> &str {
    let name = text.trim_start_matches('<');
    let end = name
        .find(|c: char| c.is_whitespace() || matches!(c, '/' | '>' | '{'))
        .unwrap_or(name.len());
    &name[..end]
}

/// `class="a {{#if b}}c{{/if}} d"`
pub fn replace_blocks_within_attributes(template: &str, names: &mut HelperNames) -> Result<PreparedTemplate> {
    let mut replacements = Vec::new();
    let mut helpers = Vec::new();

    for tag in opening_tags(template) {
        for attr in attributes_in(template, &tag) {
            if !CONTAINS_BLOCK_RE.is_match(&attr.value) {
                continue;
            }
            let caps = VALUE_BLOCK_RE.captures(&attr.value).ok_or_else(|| {
                CompileError::UnsupportedBlockInAttribute {
                    attribute: attr.name.clone(),
                    reason: "expected a single if/unless block".into(),
                }
            })?;
            if caps[2] != caps[5] {
                return Err(CompileError::UnsupportedBlockInAttribute {
                    attribute: attr.name.clone(),
                    reason: format!("`{}` closed by `{}`", &caps[2], &caps[5]),
                });
            }
            let conditional = ConditionalAttribute {
                attribute: &attr.name,
                block: &caps[2],
                condition: &caps[3],
                body: &caps[4],
                lead: &caps[1],
                trail: &caps[6],
                otherwise: Otherwise::Surrounding,
            };
            let (helper, text) = conditional.build(names)?;
            debug!(attribute = %attr.name, "rewrote block inside attribute value");
            helpers.push(helper);
            replacements.push(Replacement::new(attr.start, attr.end - attr.start, text));
        }
    }

    Ok(PreparedTemplate {
        template: splice(template, replacements)?,
        helpers,
    })
}

/// `{{#if b}}class="c"{{/if}}`
pub fn replace_blocks_around_attributes(template: &str, names: &mut HelperNames) -> Result<PreparedTemplate> {
    let mut replacements: Vec<Replacement> = Vec::new();
    let mut helpers = Vec::new();

    for tag in opening_tags(template) {
        let text = tag.text(template);
        for attr in attributes_in(template, &tag) {
            let attr_text = &template[attr.start..attr.end];
            let pattern = format!(
                r"\{{\{{#(if|unless)\s+([^}}]*?)\s*\}}\}}\s*{}\s*\{{\{{/(if|unless)\s*\}}\}}",
                regex::escape(attr_text)
            );
            let Ok(surrounding) = Regex::new(&pattern) else {
                continue;
            };
            let Some(caps) = surrounding.captures(text) else {
                continue;
            };
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let start = tag.start + whole.start();
            if replacements.iter().any(|r| r.start == start) {
                continue;
            }
            if caps[1] != caps[3] {
                return Err(CompileError::UnsupportedBlockInAttribute {
                    attribute: attr.name.clone(),
                    reason: format!("`{}` closed by `{}`", &caps[1], &caps[3]),
                });
            }
            let conditional = ConditionalAttribute {
                attribute: &attr.name,
                block: &caps[1],
                condition: &caps[2],
                body: &attr.value,
                lead: "",
                trail: "",
                otherwise: Otherwise::Undefined,
            };
            let (helper, replacement) = conditional.build(names)?;
            debug!(attribute = %attr.name, "rewrote block around attribute");
            helpers.push(helper);
            replacements.push(Replacement::new(start, whole.len(), replacement));
        }

        // Any block left between attributes wraps something other than one attribute
        for mustache in tag.mustaches.iter().filter(|m| !m.in_value) {
            let at = tag.start + mustache.start;
            let opens_block = text[mustache.start..].trim_start_matches("{{").trim_start_matches('~').starts_with('#');
            let rewritten = replacements.iter().any(|r| r.start <= at && at < r.start + r.len);
            if opens_block && !rewritten {
                return Err(CompileError::UnsupportedBlockInAttribute {
                    attribute: tag_name(text).to_string(),
                    reason: "a block between attributes must wrap exactly one attribute".into(),
                });
            }
        }
    }

    Ok(PreparedTemplate {
        template: splice(template, replacements)?,
        helpers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::print_statement;
    use crate::context::CompileContext;
    use crate::options::CompileOptions;
    use crate::scope::ScopeAnnotations;
    use oxc_allocator::Allocator;

    fn printed(prepared: PreparedTemplate) -> (String, Vec<String>) {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let scopes = ScopeAnnotations::default();
        let ctx = CompileContext::new(&allocator, &options, &scopes);
        let helpers = prepared
            .helpers
            .iter()
            .map(|helper| print_statement(ctx.ast, ctx.create_helper(helper)))
            .collect();
        (prepared.template, helpers)
    }

    fn within(template: &str) -> (String, Vec<String>) {
        let mut names = HelperNames::default();
        printed(replace_blocks_within_attributes(template, &mut names).unwrap())
    }

    fn around(template: &str) -> (String, Vec<String>) {
        let mut names = HelperNames::default();
        printed(replace_blocks_around_attributes(template, &mut names).unwrap())
    }

    #[test]
    fn test_helper_base_name() {
        assert_eq!(helper_base_name("class", "if"), "classIfHelper");
        assert_eq!(helper_base_name("data-state", "unless"), "dataStateUnlessHelper");
    }

    #[test]
    fn test_param_name() {
        assert_eq!(param_name("isActive", "condition"), "isActive");
        assert_eq!(param_name("user.Active", "condition"), "active");
        assert_eq!(param_name("this", "condition"), "condition");
        assert_eq!(param_name("(eq a b)", "condition"), "condition");
    }

    #[test]
    fn test_literal_body_within_value() {
        let (template, helpers) = within(r#"<div class="btn {{#if active}}on{{/if}}"></div>"#);
        assert_eq!(template, r#"<div class="{{classIfHelper active}}"></div>"#);
        assert_eq!(
            helpers,
            vec![r#"const classIfHelper = (active) => active ? "btn on" : "btn ";"#]
        );
    }

    #[test]
    fn test_unless_with_dependent_child() {
        let (template, helpers) = within(r#"<i title="{{#unless hidden}}Hi {{name}}!{{/unless}}"></i>"#);
        assert_eq!(template, r#"<i title="{{titleUnlessHelper hidden name}}"></i>"#);
        assert_eq!(
            helpers,
            vec![r#"const titleUnlessHelper = (hidden, name) => !hidden ? "Hi " + name + "!" : "";"#]
        );
    }

    #[test]
    fn test_nested_block_is_rejected() {
        let mut names = HelperNames::default();
        let err = replace_blocks_within_attributes(
            r#"<a class="{{#if a}}{{#if b}}x{{/if}}{{/if}}"></a>"#,
            &mut names,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedBlockInAttribute { .. }));
    }

    #[test]
    fn test_leading_mustache_before_block_is_rejected() {
        let mut names = HelperNames::default();
        let err = replace_blocks_within_attributes(
            r#"<a class="{{x}} {{#if a}}y{{/if}}"></a>"#,
            &mut names,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedBlockInAttribute { .. }));
    }

    #[test]
    fn test_else_branch_is_rejected() {
        for template in [
            r#"<a class="{{#if a}}x{{else}}y{{/if}}"></a>"#,
            r#"<a class="{{#if a}}x{{~else~}}y{{/if}}"></a>"#,
            r#"<a class="{{#if a}}x{{else if b}}y{{/if}}"></a>"#,
            r#"<a class="{{#if a}}x{{^}}y{{/if}}"></a>"#,
        ] {
            let mut names = HelperNames::default();
            let err = replace_blocks_within_attributes(template, &mut names).unwrap_err();
            assert!(
                matches!(&err, CompileError::UnsupportedBlockInAttribute { attribute, .. } if attribute == "class"),
                "{template}: {err:?}"
            );
        }
    }

    #[test]
    fn test_block_around_several_attributes_is_rejected() {
        let mut names = HelperNames::default();
        let err = replace_blocks_around_attributes(
            r#"<a {{#if a}}class="x" id="y"{{/if}}></a>"#,
            &mut names,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnsupportedBlockInAttribute { attribute, .. } if attribute == "a"
        ));
    }

    #[test]
    fn test_surrounding_block() {
        let (template, helpers) = around(r#"<input {{#if locked}}disabled="disabled"{{/if}}>"#);
        assert_eq!(template, r#"<input disabled="{{disabledIfHelper locked}}">"#);
        assert_eq!(
            helpers,
            vec![r#"const disabledIfHelper = (locked) => locked ? "disabled" : undefined;"#]
        );
    }

    #[test]
    fn test_surrounding_block_with_dependent_value() {
        let (template, helpers) = around(r#"<a {{#if linked}}href="{{url}}"{{/if}}>x</a>"#);
        assert_eq!(template, r#"<a href="{{hrefIfHelper linked url}}">x</a>"#);
        assert_eq!(
            helpers,
            vec!["const hrefIfHelper = (linked, url) => linked ? url : undefined;"]
        );
    }

    #[test]
    fn test_same_shape_helpers_get_suffixes() {
        let (template, helpers) =
            within(r#"<a class="{{#if a}}x{{/if}}"></a><b class="{{#if b}}y{{/if}}"></b>"#);
        assert_eq!(
            template,
            r#"<a class="{{classIfHelper a}}"></a><b class="{{classIfHelper2 b}}"></b>"#
        );
        assert_eq!(helpers.len(), 2);
    }
}
