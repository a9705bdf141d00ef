//! Textual pre-processing.
//!
//! Runs on raw template text before parsing and lifts constructs the parser
//! cannot represent (blocks inside or around attributes, attribute-generating
//! helpers) into plain mustache calls. Each pass rebuilds the text by
//! splicing replacements at recorded offsets.

mod attribute_generators;
mod block_attributes;
mod splice;
mod tags;

use std::collections::HashSet;

use tracing::debug;

use crate::error::Result;

pub use attribute_generators::replace_attribute_generators;
pub use block_attributes::{replace_blocks_around_attributes, replace_blocks_within_attributes};
pub use splice::{splice, Replacement};

/// One piece of a helper's return value.
#[derive(Debug, Clone, PartialEq)]
pub enum HelperPart {
    Text(String),
    Param(String),
}

/// `const name = (params) => test ? consequent : alternate;`
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalHelper {
    pub name: String,
    /// The first parameter is the condition.
    pub params: Vec<String>,
    /// `unless` tests the negated condition.
    pub negate: bool,
    /// Concatenated in order.
    pub consequent: Vec<HelperPart>,
    /// `None` returns `undefined`, which drops the attribute.
    pub alternate: Option<String>,
}

/// Rewritten template text plus the helpers synthesized for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTemplate {
    pub template: String,
    /// In discovery order.
    pub helpers: Vec<ConditionalHelper>,
}

impl PreparedTemplate {
    pub fn unchanged(template: &str) -> Self {
        Self {
            template: template.to_string(),
            helpers: Vec::new(),
        }
    }

    pub fn helper_names(&self) -> impl Iterator<Item = &str> {
        self.helpers.iter().map(|helper| helper.name.as_str())
    }
}

/// Helper names handed out during one pre-processing run.
#[derive(Debug, Default)]
pub struct HelperNames {
    used: HashSet<String>,
}

impl HelperNames {
    /// `base`, or `base2`, `base3`, ... when already taken.
    pub fn unique(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        let mut suffix = 2;
        while self.used.contains(&name) {
            name = format!("{}{}", base, suffix);
            suffix += 1;
        }
        self.used.insert(name.clone());
        name
    }
}

type PreProcessStep = fn(&str, &mut HelperNames) -> Result<PreparedTemplate>;

const STEPS: [(&str, PreProcessStep); 3] = [
    ("blocks within attributes", replace_blocks_within_attributes),
    ("blocks around attributes", replace_blocks_around_attributes),
    ("attribute generators", replace_attribute_generators),
];

/// Runs every pass in order, threading the text and accumulating helpers.
pub fn preprocess(template: &str) -> Result<PreparedTemplate> {
    let mut names = HelperNames::default();
    let mut prepared = PreparedTemplate::unchanged(template);
    for (label, step) in STEPS {
        let next = step(&prepared.template, &mut names)?;
        debug!(step = label, helpers = next.helpers.len(), "pre-processing pass");
        prepared.template = next.template;
        prepared.helpers.extend(next.helpers);
    }
    Ok(prepared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unique_names() {
        let mut names = HelperNames::default();
        assert_eq!(names.unique("classIfHelper"), "classIfHelper");
        assert_eq!(names.unique("classIfHelper"), "classIfHelper2");
        assert_eq!(names.unique("classIfHelper"), "classIfHelper3");
    }

    #[test]
    fn test_passes_run_in_sequence() {
        let prepared = preprocess(
            r#"<a class="{{#if a}}on{{/if}}" {{#unless b}}title="t"{{/unless}} {{attrs c}}></a>"#,
        )
        .unwrap();
        assert_eq!(
            prepared.template,
            r#"<a class="{{classIfHelper a}}" title="{{titleUnlessHelper b}}" hbs-attribute-generator="{{attrs c}}"></a>"#
        );
        assert_eq!(
            prepared.helper_names().collect::<Vec<_>>(),
            vec!["classIfHelper", "titleUnlessHelper"]
        );
    }

    proptest! {
        #[test]
        fn prop_templates_without_attribute_blocks_are_untouched(
            attrs in prop::collection::vec(
                ("[a-z][a-z-]{0,6}", "[a-zA-Z0-9 .:;/-]{0,10}", prop::option::of("[a-z]{1,6}(\\.[a-z]{1,4})?")),
                0..4,
            ),
            text in "[a-zA-Z0-9 ,.]{0,20}",
            mustache in prop::option::of("[a-z]{1,6}"),
        ) {
            let attributes: String = attrs
                .iter()
                .map(|(name, value, path)| match path {
                    Some(path) => format!(" {}=\"{}{{{{{}}}}}\"", name, value, path),
                    None => format!(" {}=\"{}\"", name, value),
                })
                .collect();
            let body = match &mustache {
                Some(m) => format!("{} {{{{{}}}}}", text, m),
                None => text.clone(),
            };
            let template = format!("<div{}>{}</div>", attributes, body);
            let prepared = preprocess(&template).unwrap();
            prop_assert_eq!(prepared.template, template);
            prop_assert!(prepared.helpers.is_empty());
        }

        #[test]
        fn prop_block_in_class_becomes_one_helper_call(
            lead in "[a-z ]{0,6}",
            condition in "c[a-z]{0,5}",
            body in "[a-z ]{1,8}",
        ) {
            let template = format!(
                "<div class=\"{}{{{{#if {}}}}}{}{{{{/if}}}}\"></div>",
                lead, condition, body
            );
            let prepared = preprocess(&template).unwrap();
            prop_assert_eq!(
                prepared.template,
                format!("<div class=\"{{{{classIfHelper {}}}}}\"></div>", condition)
            );
            prop_assert_eq!(prepared.helpers.len(), 1);
            prop_assert_eq!(prepared.helpers[0].alternate.as_deref(), Some(lead.as_str()));
            prop_assert!(!prepared.helpers[0].negate);
        }
    }
}
