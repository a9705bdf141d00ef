//! Element, attribute, fragment and partial conversion.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use oxc_allocator::{Box as ArenaBox, Vec as ArenaVec};
use oxc_ast::ast::{
    Expression as JsExpression, JSXAttributeItem, JSXChild, JSXElement, JSXElementName,
};
use oxc_ast::NONE;
use oxc_span::SPAN;
use regex::Regex;
use tracing::warn;

use crate::ast::{AttrNode, AttrValue, ElementNode, Expression, PartialStatement, Statement};
use crate::context::CompileContext;
use crate::error::{CompileError, Result};
use crate::expressions::is_identifier;
use crate::options::{
    ATTRIBUTE_GENERATOR_HELPER, ATTRIBUTE_GENERATOR_PLACEHOLDER, CONTEXT_PROPERTY,
    FRAGMENT_PROPERTY, FRAMEWORK_NAME,
};

lazy_static! {
    static ref ATTRIBUTE_NAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
    static ref ENTITY_RE: Regex = Regex::new(r"&#?[A-Za-z0-9]+;").unwrap();

    /// HTML attribute names whose React prop is spelled differently.
    static ref REACT_ATTRIBUTES: HashMap<&'static str, &'static str> = [
        ("accept-charset", "acceptCharset"),
        ("accesskey", "accessKey"),
        ("allowfullscreen", "allowFullScreen"),
        ("autocomplete", "autoComplete"),
        ("autofocus", "autoFocus"),
        ("autoplay", "autoPlay"),
        ("cellpadding", "cellPadding"),
        ("cellspacing", "cellSpacing"),
        ("charset", "charSet"),
        ("class", "className"),
        ("colspan", "colSpan"),
        ("contenteditable", "contentEditable"),
        ("crossorigin", "crossOrigin"),
        ("datetime", "dateTime"),
        ("enctype", "encType"),
        ("for", "htmlFor"),
        ("formaction", "formAction"),
        ("frameborder", "frameBorder"),
        ("http-equiv", "httpEquiv"),
        ("inputmode", "inputMode"),
        ("maxlength", "maxLength"),
        ("minlength", "minLength"),
        ("novalidate", "noValidate"),
        ("onblur", "onBlur"),
        ("onchange", "onChange"),
        ("onclick", "onClick"),
        ("onfocus", "onFocus"),
        ("oninput", "onInput"),
        ("onkeydown", "onKeyDown"),
        ("onkeyup", "onKeyUp"),
        ("onsubmit", "onSubmit"),
        ("readonly", "readOnly"),
        ("referrerpolicy", "referrerPolicy"),
        ("rowspan", "rowSpan"),
        ("spellcheck", "spellCheck"),
        ("srcset", "srcSet"),
        ("tabindex", "tabIndex"),
        ("usemap", "useMap"),
        // SVG
        ("clip-path", "clipPath"),
        ("clip-rule", "clipRule"),
        ("fill-opacity", "fillOpacity"),
        ("fill-rule", "fillRule"),
        ("font-family", "fontFamily"),
        ("font-size", "fontSize"),
        ("font-weight", "fontWeight"),
        ("stop-color", "stopColor"),
        ("stop-opacity", "stopOpacity"),
        ("stroke-dasharray", "strokeDasharray"),
        ("stroke-dashoffset", "strokeDashoffset"),
        ("stroke-linecap", "strokeLinecap"),
        ("stroke-linejoin", "strokeLinejoin"),
        ("stroke-miterlimit", "strokeMiterlimit"),
        ("stroke-opacity", "strokeOpacity"),
        ("stroke-width", "strokeWidth"),
        ("text-anchor", "textAnchor"),
        ("viewbox", "viewBox"),
        ("xlink:href", "xlinkHref"),
        ("xml:lang", "xmlLang"),
        ("xml:space", "xmlSpace"),
        ("xmlns:xlink", "xmlnsXlink"),
    ]
    .into_iter()
    .collect();

    /// Void HTML elements plus SVG shapes that are written self-closing.
    static ref SELF_CLOSING_TAGS: HashSet<&'static str> = [
        "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "keygen",
        "link", "meta", "param", "source", "track", "wbr",
        "circle", "ellipse", "line", "path", "polygon", "polyline", "rect", "stop", "use",
    ]
    .into_iter()
    .collect();
}

/// React spelling of an HTML attribute name.
pub fn react_attribute_name(name: &str) -> &str {
    REACT_ATTRIBUTES
        .get(name.to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or(name)
}

pub fn is_self_closing_tag(tag: &str) -> bool {
    SELF_CLOSING_TAGS.contains(tag)
}

/// JSX attribute strings are raw: no escapes, entities decoded, and output
/// lines are joined, so such values go through an expression container.
fn is_raw_attribute_string(value: &str) -> bool {
    !value.contains(['"', '\n', '\r']) && !ENTITY_RE.is_match(value)
}

impl<'a> CompileContext<'a> {
    /// `div`, `UserCard` or `React.Fragment`.
    fn jsx_name(&self, name: &str) -> JSXElementName<'a> {
        match name.split_once('.') {
            Some((object, property)) => self.ast.jsx_element_name_member_expression(
                SPAN,
                self.ast
                    .jsx_member_expression_object_identifier_reference(SPAN, self.ast.atom(object)),
                self.ast.jsx_identifier(SPAN, self.ast.atom(property)),
            ),
            None if name.starts_with(|c: char| c.is_ascii_uppercase()) => self
                .ast
                .jsx_element_name_identifier_reference(SPAN, self.ast.atom(name)),
            None => self
                .ast
                .jsx_element_name_identifier(SPAN, self.ast.atom(name)),
        }
    }

    fn jsx_element_node(
        &self,
        name: &str,
        attributes: ArenaVec<'a, JSXAttributeItem<'a>>,
        children: ArenaVec<'a, JSXChild<'a>>,
        self_closing: bool,
    ) -> ArenaBox<'a, JSXElement<'a>> {
        let opening = self
            .ast
            .jsx_opening_element(SPAN, self.jsx_name(name), NONE, attributes);
        let closing = (!self_closing).then(|| self.ast.jsx_closing_element(SPAN, self.jsx_name(name)));
        self.ast.alloc_jsx_element(SPAN, opening, children, closing)
    }

    pub fn jsx_element(
        &self,
        name: &str,
        attributes: ArenaVec<'a, JSXAttributeItem<'a>>,
        children: ArenaVec<'a, JSXChild<'a>>,
        self_closing: bool,
    ) -> JsExpression<'a> {
        JsExpression::JSXElement(self.jsx_element_node(name, attributes, children, self_closing))
    }

    /// `name={value}`
    pub fn attribute_expression(&self, name: &str, value: JsExpression<'a>) -> JSXAttributeItem<'a> {
        let value = self
            .ast
            .jsx_attribute_value_expression_container(SPAN, value.into());
        self.ast.jsx_attribute_item_attribute(
            SPAN,
            self.ast.jsx_attribute_name_identifier(SPAN, self.ast.atom(name)),
            Some(value),
        )
    }

    /// `name="value"`, or `name={"value"}` when the raw form would change it.
    pub fn attribute_string(&self, name: &str, value: &str) -> JSXAttributeItem<'a> {
        if !is_raw_attribute_string(value) {
            return self.attribute_expression(name, self.string(value));
        }
        let value = self
            .ast
            .jsx_attribute_value_string_literal(SPAN, self.ast.atom(value), None);
        self.ast.jsx_attribute_item_attribute(
            SPAN,
            self.ast.jsx_attribute_name_identifier(SPAN, self.ast.atom(name)),
            Some(value),
        )
    }

    /// Converts one attribute. `None` drops it from the element.
    pub fn create_attribute(&self, attr: &AttrNode) -> Result<Option<JSXAttributeItem<'a>>> {
        if attr.name.starts_with(ATTRIBUTE_GENERATOR_PLACEHOLDER) {
            return self.create_attribute_spread(attr).map(Some);
        }

        let react_name = react_attribute_name(&attr.name);
        if !ATTRIBUTE_NAME_RE.is_match(&attr.name) && !ATTRIBUTE_NAME_RE.is_match(react_name) {
            warn!(attribute = %attr.name, "dropping attribute with unsupported name");
            return Ok(None);
        }

        let attribute = match &attr.value {
            AttrValue::Text(_) | AttrValue::Concat(_) if attr.name == "style" => {
                self.attribute_expression(react_name, self.create_style_object(&attr.value)?)
            }
            AttrValue::Text(text) => self.attribute_string(react_name, &text.chars),
            AttrValue::Mustache(mustache) => {
                self.attribute_expression(react_name, self.resolve_mustache(mustache)?)
            }
            AttrValue::Concat(parts) => {
                if let Some(part) = parts
                    .iter()
                    .find(|p| !matches!(p, Statement::Text(_) | Statement::Mustache(_)))
                {
                    return Err(CompileError::UnsupportedAttributeValue {
                        attribute: attr.name.clone(),
                        kind: part.kind().to_string(),
                    });
                }
                self.attribute_expression(react_name, self.create_concat(parts)?)
            }
        };
        Ok(Some(attribute))
    }

    /// `{...generateAttributes(helper(args))}`
    fn create_attribute_spread(&self, attr: &AttrNode) -> Result<JSXAttributeItem<'a>> {
        let generated = match &attr.value {
            AttrValue::Mustache(mustache) => self.resolve_mustache(mustache)?,
            AttrValue::Concat(parts) => self.create_concat(parts)?,
            AttrValue::Text(_) => {
                return Err(CompileError::UnsupportedAttributeValue {
                    attribute: attr.name.clone(),
                    kind: "TextNode".into(),
                })
            }
        };
        let spread = self.call(self.ident(ATTRIBUTE_GENERATOR_HELPER), vec![generated]);
        Ok(self.ast.jsx_attribute_item_spread_attribute(SPAN, spread))
    }

    pub fn convert_element(&self, element: &ElementNode) -> Result<JsExpression<'a>> {
        let mut attributes = self.ast.vec_with_capacity(element.attributes.len());
        for attr in &element.attributes {
            if let Some(attribute) = self.create_attribute(attr)? {
                attributes.push(attribute);
            }
        }

        let self_closing = element.self_closing || is_self_closing_tag(&element.tag);
        let children = if self_closing {
            if !element.children.is_empty() {
                warn!(tag = %element.tag, count = element.children.len(), "self-closing element drops its children");
            }
            self.ast.vec()
        } else {
            self.create_children(&element.children)?
        };

        Ok(self.jsx_element(&element.tag, attributes, children, self_closing))
    }

    /// `<React.Fragment>children</React.Fragment>`
    pub fn create_fragment(&self, children: ArenaVec<'a, JSXChild<'a>>) -> ArenaBox<'a, JSXElement<'a>> {
        let name = format!("{}.{}", FRAMEWORK_NAME, FRAGMENT_PROPERTY);
        self.jsx_element_node(&name, self.ast.vec(), children, false)
    }

    /// `{{> Name ctx key=value}}` renders `<Name context={ctx} key={value} />`.
    pub fn create_partial(&self, partial: &PartialStatement) -> Result<JsExpression<'a>> {
        if !is_identifier(&partial.name) {
            return Err(CompileError::UnsupportedExpression {
                kind: format!("partial name `{}`", partial.name),
            });
        }
        if partial.params.len() > 1 {
            return Err(CompileError::InvalidBlockParams {
                name: partial.name.clone(),
                expected: "at most one context argument".into(),
            });
        }

        let mut attributes = self
            .ast
            .vec_with_capacity(partial.params.len() + partial.hash.pairs.len());
        if let Some(context) = partial.params.first() {
            attributes.push(self.attribute_expression(CONTEXT_PROPERTY, self.resolve_expression(context)?));
        }
        for pair in &partial.hash.pairs {
            let attribute = match &pair.value {
                Expression::Literal(crate::ast::Literal::String(s)) => self.attribute_string(&pair.key, s),
                other => self.attribute_expression(&pair.key, self.resolve_expression(other)?),
            };
            attributes.push(attribute);
        }

        Ok(self.jsx_element(&partial.name, attributes, self.ast.vec(), true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{MustacheStatement, NodeId, PathExpression, TextNode};
    use crate::codegen::print_expression;
    use crate::options::CompileOptions;
    use crate::scope::ScopeAnnotations;
    use oxc_allocator::Allocator;

    fn text_attr(name: &str, value: &str) -> AttrNode {
        AttrNode {
            name: name.into(),
            value: AttrValue::Text(TextNode { chars: value.into() }),
        }
    }

    fn path(id: u32, name: &str) -> PathExpression {
        PathExpression {
            id: NodeId(id),
            original: name.into(),
            parts: vec![name.into()],
            data: false,
            depth: 0,
        }
    }

    /// Prints `<div />` carrying the converted attribute.
    fn print_attribute(ctx: &CompileContext<'_>, attr: &AttrNode) -> Option<String> {
        let attribute = ctx.create_attribute(attr).unwrap()?;
        let element = ctx.jsx_element("div", ctx.ast.vec1(attribute), ctx.ast.vec(), true);
        Some(print_expression(ctx.ast, element))
    }

    #[test]
    fn test_react_attribute_names() {
        assert_eq!(react_attribute_name("class"), "className");
        assert_eq!(react_attribute_name("for"), "htmlFor");
        assert_eq!(react_attribute_name("xmlns:xlink"), "xmlnsXlink");
        assert_eq!(react_attribute_name("data-id"), "data-id");
        assert_eq!(react_attribute_name("stroke-width"), "strokeWidth");
        assert_eq!(react_attribute_name("userName"), "userName");
    }

    #[test]
    fn test_invalid_attribute_name_is_dropped() {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let scopes = ScopeAnnotations::default();
        let ctx = CompileContext::new(&allocator, &options, &scopes);
        assert_eq!(print_attribute(&ctx, &text_attr("2+2", "x")), None);
        assert_eq!(
            print_attribute(&ctx, &text_attr("class", "a")).as_deref(),
            Some(r#"<div className="a" />"#)
        );
    }

    #[test]
    fn test_attribute_strings_needing_escapes_use_containers() {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let scopes = ScopeAnnotations::default();
        let ctx = CompileContext::new(&allocator, &options, &scopes);
        assert_eq!(
            print_attribute(&ctx, &text_attr("title", "say \"hi\"")).as_deref(),
            Some(r#"<div title={"say \"hi\""} />"#)
        );
        assert_eq!(
            print_attribute(&ctx, &text_attr("title", "a &amp; b")).as_deref(),
            Some(r#"<div title={"a &amp; b"} />"#)
        );
    }

    #[test]
    fn test_self_closing_drops_children() {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let scopes = ScopeAnnotations::default();
        let ctx = CompileContext::new(&allocator, &options, &scopes);
        let element = ElementNode {
            tag: "img".into(),
            attributes: vec![],
            children: vec![Statement::Text(TextNode { chars: "lost".into() })],
            self_closing: false,
        };
        let jsx = ctx.convert_element(&element).unwrap();
        assert_eq!(print_expression(ctx.ast, jsx), "<img />");
    }

    #[test]
    fn test_partial_with_context_and_hash() {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let scopes = ScopeAnnotations::default();
        let ctx = CompileContext::new(&allocator, &options, &scopes);
        let partial = PartialStatement {
            name: "Card".into(),
            params: vec![Expression::Path(path(0, "user"))],
            hash: crate::ast::Hash {
                pairs: vec![crate::ast::HashPair {
                    key: "size".into(),
                    value: Expression::Literal(crate::ast::Literal::String("big".into())),
                }],
            },
        };
        let jsx = ctx.create_partial(&partial).unwrap();
        assert_eq!(
            print_expression(ctx.ast, jsx),
            r#"<Card context={user} size="big" />"#
        );
    }

    #[test]
    fn test_attribute_generator_becomes_spread() {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let scopes = ScopeAnnotations::default();
        let ctx = CompileContext::new(&allocator, &options, &scopes);
        let attr = AttrNode {
            name: ATTRIBUTE_GENERATOR_PLACEHOLDER.into(),
            value: AttrValue::Concat(vec![Statement::Mustache(MustacheStatement {
                path: Expression::Path(path(0, "attrs")),
                params: vec![Expression::Path(path(1, "x"))],
                hash: Default::default(),
                trusting: false,
            })]),
        };
        assert_eq!(
            print_attribute(&ctx, &attr).as_deref(),
            Some("<div {...generateAttributes(attrs(x))} />")
        );
    }
}
