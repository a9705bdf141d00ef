//! Binds attribute-generating helper calls to a placeholder attribute.
//!
//! `<div {{attrs item}}>` becomes `<div hbs-attribute-generator="{{attrs item}}">`,
//! which element conversion later expands into a spread.

use tracing::debug;

use super::splice::{splice, Replacement};
use super::tags::opening_tags;
use super::{HelperNames, PreparedTemplate};
use crate::error::Result;
use crate::options::ATTRIBUTE_GENERATOR_PLACEHOLDER;

/// A helper call with at least one argument, e.g. `attrs item.data`.
fn is_generator_call(content: &str) -> bool {
    let content = content.trim().trim_matches('~').trim();
    if content.starts_with(['#', '/', '!', '^', '>', '&', '{']) || content.starts_with("else") {
        return false;
    }
    content.split_whitespace().nth(1).is_some()
}

pub fn replace_attribute_generators(template: &str, _names: &mut HelperNames) -> Result<PreparedTemplate> {
    let mut replacements = Vec::new();

    for tag in opening_tags(template) {
        let mut count = 0;
        for mustache in tag.mustaches.iter().filter(|m| !m.in_value) {
            let start = tag.start + mustache.start;
            let end = tag.start + mustache.end;
            let content = &template[start + 2..end - 2];
            if !is_generator_call(content) {
                continue;
            }
            count += 1;
            let name = if count == 1 {
                ATTRIBUTE_GENERATOR_PLACEHOLDER.to_string()
            } else {
                format!("{}-{}", ATTRIBUTE_GENERATOR_PLACEHOLDER, count)
            };
            let call = content.split_whitespace().collect::<Vec<_>>().join(" ");
            debug!(call = %call, "bound attribute generator");
            replacements.push(Replacement::new(
                start,
                end - start,
                format!("{}=\"{{{{{}}}}}\"", name, call),
            ));
        }
    }

    Ok(PreparedTemplate {
        template: splice(template, replacements)?,
        helpers: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(template: &str) -> String {
        replace_attribute_generators(template, &mut HelperNames::default())
            .unwrap()
            .template
    }

    #[test]
    fn test_generator_bound_to_placeholder() {
        assert_eq!(
            rewrite(r#"<div class="x" {{attrs item}}></div>"#),
            r#"<div class="x" hbs-attribute-generator="{{attrs item}}"></div>"#
        );
    }

    #[test]
    fn test_second_generator_gets_suffix() {
        assert_eq!(
            rewrite("<div {{a x}} {{b y}}></div>"),
            r#"<div hbs-attribute-generator="{{a x}}" hbs-attribute-generator-2="{{b y}}"></div>"#
        );
    }

    #[test]
    fn test_values_and_plain_mustaches_untouched() {
        let template = r#"<div id={{a b}} title="{{c d}}" {{flag}}>{{e f}}</div>"#;
        assert_eq!(rewrite(template), template);
    }
}
