//! Finalize Module
//!
//! Normalizes printed output: leading import lines stay one per line, every
//! other line is trimmed and the rest is joined into a single line.

pub fn finalize_output(code: &str) -> String {
    let mut imports = Vec::new();
    let mut body = Vec::new();

    for line in code.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if body.is_empty() && trimmed.starts_with("import ") {
            imports.push(trimmed);
        } else {
            body.push(trimmed);
        }
    }

    let body = body.join(" ");
    if imports.is_empty() {
        return body;
    }
    let mut out = imports.join("\n");
    if !body.is_empty() {
        out.push('\n');
        out.push_str(&body);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joins_body_lines() {
        assert_eq!(
            finalize_output("<div>\n  <span />\n</div>;"),
            "<div> <span /> </div>;"
        );
    }

    #[test]
    fn test_keeps_imports_on_their_own_lines() {
        let code = "import React from \"react\";\nimport Card from \"./Card\";\nconst h = (a) => a;\nexport default (props) => <div>\n</div>;";
        assert_eq!(
            finalize_output(code),
            "import React from \"react\";\nimport Card from \"./Card\";\nconst h = (a) => a; export default (props) => <div> </div>;"
        );
    }

    #[test]
    fn test_single_line_is_untouched() {
        assert_eq!(finalize_output("(props) => <div />;"), "(props) => <div />;");
    }
}
