//! Call-scoped compile context.
//!
//! One `CompileContext` is built per compile call and handed by reference to
//! every converter, so compiles never share state. Converted nodes live in
//! the arena behind `ast`.

use oxc_allocator::Allocator;
use oxc_ast::AstBuilder;

use crate::options::CompileOptions;
use crate::scope::ScopeAnnotations;

#[derive(Clone, Copy)]
pub struct CompileContext<'a> {
    pub options: &'a CompileOptions,
    pub scopes: &'a ScopeAnnotations,
    pub ast: AstBuilder<'a>,
}

impl<'a> CompileContext<'a> {
    pub fn new(
        allocator: &'a Allocator,
        options: &'a CompileOptions,
        scopes: &'a ScopeAnnotations,
    ) -> Self {
        Self {
            options,
            scopes,
            ast: AstBuilder::new(allocator),
        }
    }
}
