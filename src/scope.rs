//! Namespace resolution.
//!
//! Walks the template before conversion and decides, for every value path,
//! which enclosing scope it reads from. The result is a read-only
//! [`ScopeAnnotations`] table keyed by path id; the template itself is never
//! modified.

use std::collections::HashMap;

use tracing::debug;

use crate::ast::{
    Block, BlockStatement, Expression, MustacheStatement, NodeId, PartialStatement,
    PathExpression, SubExpression, Template,
};
use crate::error::{CompileError, Result};
use crate::options::{
    CompileOptions, ATTRIBUTE_GENERATOR_HELPER, ATTRIBUTE_GENERATOR_PLACEHOLDER, EACH_INDEX,
    EACH_ITEM, LINK_COMPONENT,
};
use crate::visitor::{walk_block, walk_block_statement, walk_hash, TemplateVisitor};

/// Resolved segments for every value path plus the names discovered on the way.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScopeAnnotations {
    paths: HashMap<NodeId, Vec<String>>,
    /// Partial templates referenced, in discovery order.
    pub partials: Vec<String>,
    /// Helper functions called, in discovery order.
    pub helpers: Vec<String>,
}

impl ScopeAnnotations {
    /// Fully scoped segments of `path`. Paths the resolver never saw keep
    /// their own segments.
    pub fn segments<'a>(&'a self, path: &'a PathExpression) -> &'a [String] {
        self.paths
            .get(&path.id)
            .map(Vec::as_slice)
            .unwrap_or(path.parts.as_slice())
    }

    fn add_partial(&mut self, name: &str) {
        if !self.partials.iter().any(|p| p == name) {
            self.partials.push(name.to_string());
        }
    }

    fn add_helper(&mut self, name: &str) {
        if !self.helpers.iter().any(|h| h == name) {
            self.helpers.push(name.to_string());
        }
    }
}

/// Name a helper call is imported and invoked under.
pub fn helper_name(callee: &PathExpression) -> Option<&str> {
    callee.parts.last().map(String::as_str)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScopeKind {
    Root,
    Each,
    With,
}

#[derive(Debug)]
struct Scope {
    /// Block body that introduced the scope; `None` for the template root.
    bound: Option<NodeId>,
    kind: ScopeKind,
    segments: Vec<String>,
}

struct NamespaceResolver {
    scopes: Vec<Scope>,
    /// Scope to open on the next block body, set when an `each`/`with` is entered.
    pending: Option<(ScopeKind, Vec<String>)>,
    annotations: ScopeAnnotations,
    error: Option<CompileError>,
}

impl NamespaceResolver {
    fn new(options: &CompileOptions) -> Self {
        let root = options.root_scope();
        let scopes = if root.is_empty() {
            Vec::new()
        } else {
            vec![Scope {
                bound: None,
                kind: ScopeKind::Root,
                segments: root,
            }]
        };
        Self {
            scopes,
            pending: None,
            annotations: ScopeAnnotations::default(),
            error: None,
        }
    }

    fn fail(&mut self, error: CompileError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn head_segments(&self) -> Vec<String> {
        self.scopes
            .last()
            .map(|s| s.segments.clone())
            .unwrap_or_default()
    }

    fn resolve(&self, path: &PathExpression) -> Result<Vec<String>> {
        if path.data {
            return self.resolve_data(path);
        }
        let base = match path.depth {
            0 => self.head_segments(),
            1 => {
                let nested = self.scopes.iter().filter(|s| s.kind != ScopeKind::Root).count();
                if nested == 0 {
                    return Err(CompileError::UnsupportedParentTraversal {
                        path: path.original.clone(),
                    });
                }
                let parent = self.scopes.len().checked_sub(2);
                parent
                    .and_then(|i| self.scopes.get(i))
                    .map(|s| s.segments.clone())
                    .unwrap_or_default()
            }
            _ => {
                return Err(CompileError::UnsupportedParentTraversal {
                    path: path.original.clone(),
                })
            }
        };
        Ok(base.into_iter().chain(path.parts.iter().cloned()).collect())
    }

    fn resolve_data(&self, path: &PathExpression) -> Result<Vec<String>> {
        match path.head() {
            Some("index") | Some("key") if path.parts.len() == 1 => {
                if self.scopes.iter().any(|s| s.kind == ScopeKind::Each) {
                    Ok(vec![EACH_INDEX.to_string()])
                } else {
                    Err(CompileError::UnsupportedExpression {
                        kind: format!("`{}` outside of an each block", path.original),
                    })
                }
            }
            Some("root") => {
                let root = match self.scopes.first() {
                    Some(s) if s.kind == ScopeKind::Root => s.segments.clone(),
                    _ => Vec::new(),
                };
                Ok(root.into_iter().chain(path.parts[1..].iter().cloned()).collect())
            }
            _ => Err(CompileError::UnsupportedExpression {
                kind: format!("data variable `{}`", path.original),
            }),
        }
    }

    fn collect_helper(&mut self, callee: &Expression) {
        if let Expression::Path(path) = callee {
            if let Some(name) = helper_name(path) {
                if !self.annotations.partials.iter().any(|p| p == name) {
                    self.annotations.add_helper(name);
                }
            }
        }
    }

    fn visit_arguments(&mut self, params: &[Expression], hash: &crate::ast::Hash) {
        for param in params {
            self.visit_expression(param);
        }
        walk_hash(self, hash);
    }
}

impl TemplateVisitor for NamespaceResolver {
    fn visit_attribute(&mut self, attribute: &crate::ast::AttrNode) {
        if attribute.name.starts_with(ATTRIBUTE_GENERATOR_PLACEHOLDER) {
            self.annotations.add_helper(ATTRIBUTE_GENERATOR_HELPER);
        }
        crate::visitor::walk_attribute(self, attribute);
    }

    fn visit_mustache(&mut self, mustache: &MustacheStatement) {
        if mustache.is_helper_call() {
            self.collect_helper(&mustache.path);
            self.visit_arguments(&mustache.params, &mustache.hash);
        } else {
            self.visit_expression(&mustache.path);
        }
    }

    fn visit_sub_expression(&mut self, sub: &SubExpression) {
        self.collect_helper(&sub.path);
        self.visit_arguments(&sub.params, &sub.hash);
    }

    fn visit_block_statement(&mut self, block: &BlockStatement) {
        match block.name() {
            "each" => self.pending = Some((ScopeKind::Each, vec![EACH_ITEM.to_string()])),
            "with" => match block.params.first() {
                Some(Expression::Path(arg)) => match self.resolve(arg) {
                    Ok(segments) => self.pending = Some((ScopeKind::With, segments)),
                    Err(e) => self.fail(e),
                },
                _ => self.fail(CompileError::InvalidBlockParams {
                    name: "with".into(),
                    expected: "a path argument".into(),
                }),
            },
            "linkTo" => self.annotations.add_partial(LINK_COMPONENT),
            _ => {}
        }
        walk_block_statement(self, block);
    }

    fn visit_block(&mut self, block: &Block) {
        if let Some((kind, segments)) = self.pending.take() {
            self.scopes.push(Scope {
                bound: Some(block.id),
                kind,
                segments,
            });
        }
        walk_block(self, block);
        if self.scopes.last().and_then(|s| s.bound) == Some(block.id) {
            self.scopes.pop();
        }
    }

    fn visit_partial(&mut self, partial: &PartialStatement) {
        self.annotations.add_partial(&partial.name);
        self.visit_arguments(&partial.params, &partial.hash);
    }

    fn visit_path(&mut self, path: &PathExpression) {
        match self.resolve(path) {
            Ok(segments) => {
                self.annotations.paths.insert(path.id, segments);
            }
            Err(e) => self.fail(e),
        }
    }
}

/// Resolves every value path of `template` against its enclosing scopes.
pub fn resolve_namespaces(template: &Template, options: &CompileOptions) -> Result<ScopeAnnotations> {
    let mut resolver = NamespaceResolver::new(options);
    resolver.visit_template(template);
    if let Some(error) = resolver.error {
        return Err(error);
    }
    let annotations = resolver.annotations;
    debug!(
        paths = annotations.paths.len(),
        partials = annotations.partials.len(),
        helpers = annotations.helpers.len(),
        "resolved namespaces"
    );
    Ok(annotations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Statement;
    use crate::parse::parse_template;
    use crate::visitor::TemplateVisitor;

    /// Resolved segments of every value path, in source order, joined with dots.
    fn resolved(source: &str, options: CompileOptions) -> Vec<String> {
        struct Collect<'a> {
            annotations: &'a ScopeAnnotations,
            out: Vec<String>,
        }
        impl TemplateVisitor for Collect<'_> {
            fn visit_path(&mut self, path: &PathExpression) {
                if self.annotations.paths.contains_key(&path.id) {
                    self.out.push(self.annotations.segments(path).join("."));
                }
            }
        }
        let template = parse_template(source).unwrap();
        let annotations = resolve_namespaces(&template, &options).unwrap();
        let mut collect = Collect {
            annotations: &annotations,
            out: vec![],
        };
        collect.visit_template(&template);
        collect.out
    }

    #[test]
    fn test_root_prefix_for_components() {
        assert_eq!(
            resolved("{{a.b}}<i id={{c}}></i>", CompileOptions::default()),
            vec!["props.a.b", "props.c"]
        );
        assert_eq!(resolved("{{a.b}}", false.into()), vec!["a.b"]);
    }

    #[test]
    fn test_context_namespace() {
        let opts = CompileOptions {
            always_include_context: true,
            ..Default::default()
        };
        assert_eq!(resolved("{{a}}", opts), vec!["props.context.a"]);
    }

    #[test]
    fn test_each_scope_applies_to_body_only() {
        assert_eq!(
            resolved(
                "{{#each list}}{{name}}{{#each list.nested}}{{x}}{{/each}}{{/each}}{{after}}",
                CompileOptions::default()
            ),
            vec!["props.list", "item.name", "item.list.nested", "item.x", "props.after"]
        );
    }

    #[test]
    fn test_each_inverse_stays_in_outer_scope() {
        assert_eq!(
            resolved(
                "{{#each list}}{{a}}{{else}}{{b}}{{/each}}",
                CompileOptions::default()
            ),
            vec!["props.list", "item.a", "props.b"]
        );
    }

    #[test]
    fn test_with_narrows_current_scope() {
        assert_eq!(
            resolved(
                "{{#with author}}{{name}}{{#with address}}{{city}}{{/with}}{{/with}}",
                CompileOptions::default()
            ),
            vec!["props.author", "props.author.name", "props.author.address", "props.author.address.city"]
        );
    }

    #[test]
    fn test_parent_and_data_paths() {
        assert_eq!(
            resolved(
                "{{#each list}}{{../title}}{{@index}}{{this.id}}{{@root.x}}{{/each}}",
                CompileOptions::default()
            ),
            vec!["props.list", "props.title", "i", "item.id", "props.x"]
        );
    }

    #[test]
    fn test_unsupported_parent_traversal() {
        let template = parse_template("{{#each a}}{{#each b}}{{../../x}}{{/each}}{{/each}}").unwrap();
        assert!(matches!(
            resolve_namespaces(&template, &CompileOptions::default()),
            Err(CompileError::UnsupportedParentTraversal { .. })
        ));
        let template = parse_template("{{../x}}").unwrap();
        assert!(resolve_namespaces(&template, &CompileOptions::default()).is_err());
        let template = parse_template("{{@index}}").unwrap();
        assert!(resolve_namespaces(&template, &CompileOptions::default()).is_err());
    }

    #[test]
    fn test_collects_partials_and_helpers() {
        let template = parse_template(
            "{{> Card}}{{format date}}{{format other}}{{#if (eq a b)}}{{> Card}}{{/if}}{{plain}}",
        )
        .unwrap();
        let annotations = resolve_namespaces(&template, &CompileOptions::default()).unwrap();
        assert_eq!(annotations.partials, vec!["Card"]);
        assert_eq!(annotations.helpers, vec!["format", "eq"]);
    }

    #[test]
    fn test_helper_callee_is_not_prefixed() {
        let template = parse_template("{{format date}}").unwrap();
        let annotations = resolve_namespaces(&template, &CompileOptions::default()).unwrap();
        let Statement::Mustache(m) = &template.body[0] else {
            panic!("expected mustache")
        };
        let callee = m.path.as_path().unwrap();
        assert_eq!(annotations.segments(callee), ["format"]);
        let arg = m.params[0].as_path().unwrap();
        assert_eq!(annotations.segments(arg), ["props", "date"]);
    }
}
