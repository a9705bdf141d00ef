//! Program assembly into an oxc [`Program`] and printing with `oxc_codegen`.

use oxc_allocator::Vec as ArenaVec;
use oxc_ast::ast::{Program, SourceType, Statement};
use oxc_ast::AstBuilder;
use oxc_codegen::Codegen;
use oxc_span::SPAN;

/// Wraps statements in a JSX module.
pub fn build_program<'a>(ast: AstBuilder<'a>, body: ArenaVec<'a, Statement<'a>>) -> Program<'a> {
    let source_type = SourceType::default().with_module(true).with_jsx(true);
    ast.program(SPAN, source_type, "", ast.vec(), None, ast.vec(), body)
}

pub fn print_program(program: &Program<'_>) -> String {
    Codegen::new().build(program).code
}

#[cfg(test)]
pub(crate) fn print_statement<'a>(ast: AstBuilder<'a>, statement: Statement<'a>) -> String {
    let program = build_program(ast, ast.vec1(statement));
    crate::finalize::finalize_output(&print_program(&program))
}

/// Prints one expression as the initializer of a throwaway `const`.
#[cfg(test)]
pub(crate) fn print_expression<'a>(ast: AstBuilder<'a>, expression: oxc_ast::ast::Expression<'a>) -> String {
    use oxc_ast::ast::VariableDeclarationKind;
    use oxc_ast::NONE;

    let declarator = ast.variable_declarator(
        SPAN,
        VariableDeclarationKind::Const,
        ast.binding_pattern_binding_identifier(SPAN, "value"),
        NONE,
        Some(expression),
        false,
    );
    let declaration =
        ast.declaration_variable(SPAN, VariableDeclarationKind::Const, ast.vec1(declarator), false);
    let printed = print_statement(ast, Statement::from(declaration));
    printed
        .trim_start_matches("const value = ")
        .trim_end_matches(';')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_ast::ast::{BinaryOperator, ImportOrExportKind};
    use oxc_ast::NONE;

    #[test]
    fn test_binary_nesting_keeps_grouping() {
        let allocator = Allocator::default();
        let ast = AstBuilder::new(&allocator);
        let inner = ast.expression_binary(
            SPAN,
            ast.expression_identifier(SPAN, "b"),
            BinaryOperator::Addition,
            ast.expression_identifier(SPAN, "c"),
        );
        let outer = ast.expression_binary(
            SPAN,
            ast.expression_identifier(SPAN, "a"),
            BinaryOperator::Addition,
            inner,
        );
        assert_eq!(print_expression(ast, outer), "a + (b + c)");
    }

    #[test]
    fn test_import_prints_on_its_own_line() {
        let allocator = Allocator::default();
        let ast = AstBuilder::new(&allocator);
        let specifier = ast.import_declaration_specifier_import_default_specifier(
            SPAN,
            ast.binding_identifier(SPAN, "React"),
        );
        let import = ast.module_declaration_import_declaration(
            SPAN,
            Some(ast.vec1(specifier)),
            ast.string_literal(SPAN, "react", None),
            None,
            NONE,
            ImportOrExportKind::Value,
        );
        let program = build_program(ast, ast.vec1(Statement::from(import)));
        assert_eq!(print_program(&program), "import React from \"react\";\n");
    }
}
