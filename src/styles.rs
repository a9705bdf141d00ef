//! Inline `style` attribute → object literal.

use lazy_static::lazy_static;
use oxc_ast::ast::{Expression as JsExpression, PropertyKey, PropertyKind};
use oxc_span::SPAN;
use regex::{Captures, Regex};

use crate::ast::{AttrValue, MustacheStatement, Statement};
use crate::context::CompileContext;
use crate::error::{CompileError, Result};

lazy_static! {
    static ref HYPHEN_LETTER_RE: Regex = Regex::new(r"-([a-z])").unwrap();
}

/// `background-image` → `backgroundImage`, `-webkit-transition` → `WebkitTransition`
pub fn camelize_prop_name(name: &str) -> String {
    HYPHEN_LETTER_RE
        .replace_all(name, |caps: &Captures| caps[1].to_uppercase())
        .into_owned()
}

#[derive(Debug, Clone)]
enum Piece<'a> {
    Text(String),
    Mustache(&'a MustacheStatement),
}

/// Splits the value into declarations at `;`, keeping mustaches whole.
fn split_declarations<'a>(parts: &[&'a Statement]) -> Result<Vec<Vec<Piece<'a>>>> {
    let mut declarations = vec![Vec::new()];
    for part in parts {
        match part {
            Statement::Text(text) => {
                let mut chunks = text.chars.split(';');
                if let Some(first) = chunks.next() {
                    push_text(&mut declarations, first);
                }
                for chunk in chunks {
                    declarations.push(Vec::new());
                    push_text(&mut declarations, chunk);
                }
            }
            Statement::Mustache(mustache) => {
                if let Some(current) = declarations.last_mut() {
                    current.push(Piece::Mustache(mustache));
                }
            }
            other => {
                return Err(CompileError::UnsupportedAttributeValue {
                    attribute: "style".into(),
                    kind: other.kind().to_string(),
                })
            }
        }
    }
    Ok(declarations)
}

fn push_text(declarations: &mut [Vec<Piece<'_>>], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(current) = declarations.last_mut() {
        current.push(Piece::Text(text.to_string()));
    }
}

/// Splits one declaration on its first `:`.
fn split_key_value<'a>(declaration: Vec<Piece<'a>>) -> Option<(Vec<Piece<'a>>, Vec<Piece<'a>>)> {
    let mut key = Vec::new();
    let mut value = Vec::new();
    let mut found = false;
    for piece in declaration {
        match piece {
            Piece::Text(text) if !found => match text.split_once(':') {
                Some((before, after)) => {
                    found = true;
                    key.push(Piece::Text(before.to_string()));
                    value.push(Piece::Text(after.to_string()));
                }
                None => key.push(Piece::Text(text)),
            },
            piece if found => value.push(piece),
            piece => key.push(piece),
        }
    }
    found.then(|| (trim_pieces(key), trim_pieces(value)))
}

fn trim_pieces(mut pieces: Vec<Piece<'_>>) -> Vec<Piece<'_>> {
    if let Some(Piece::Text(text)) = pieces.first_mut() {
        *text = text.trim_start().to_string();
    }
    if let Some(Piece::Text(text)) = pieces.last_mut() {
        *text = text.trim_end().to_string();
    }
    pieces.retain(|p| !matches!(p, Piece::Text(t) if t.is_empty()));
    pieces
}

impl<'a> CompileContext<'a> {
    pub fn create_style_object(&self, value: &AttrValue) -> Result<JsExpression<'a>> {
        let text_part;
        let parts: Vec<&Statement> = match value {
            AttrValue::Concat(parts) => parts.iter().collect(),
            AttrValue::Text(text) => {
                text_part = Statement::Text(text.clone());
                vec![&text_part]
            }
            AttrValue::Mustache(_) => {
                return Err(CompileError::UnsupportedAttributeValue {
                    attribute: "style".into(),
                    kind: "MustacheStatement".into(),
                })
            }
        };

        let mut properties = self.ast.vec();
        for declaration in split_declarations(&parts)? {
            let Some((key, value)) = split_key_value(declaration) else {
                continue;
            };
            if key.is_empty() || value.is_empty() {
                continue;
            }
            let (key, computed): (PropertyKey<'a>, bool) = match key.as_slice() {
                [Piece::Text(text)] => (self.string(&camelize_prop_name(text)).into(), false),
                _ => (self.fold_pieces(&key)?.into(), true),
            };
            properties.push(self.ast.object_property_kind_object_property(
                SPAN,
                PropertyKind::Init,
                key,
                self.fold_pieces(&value)?,
                false,
                false,
                computed,
            ));
        }
        Ok(self.ast.expression_object(SPAN, properties))
    }

    fn fold_pieces(&self, pieces: &[Piece<'_>]) -> Result<JsExpression<'a>> {
        let mut result: Option<JsExpression<'a>> = None;
        for piece in pieces {
            let converted = match piece {
                Piece::Text(text) => self.string(text),
                Piece::Mustache(mustache) => self.resolve_mustache(mustache)?,
            };
            result = Some(match result {
                None => converted,
                Some(acc) => self.add(acc, converted),
            });
        }
        Ok(result.unwrap_or_else(|| self.string("")))
    }
}
