//! Conservative side-effect detection for top-level statements.
//!
//! Anything not recognised as pure is treated as effectful; dropping an
//! effectful statement changes program behavior, keeping a pure one only
//! costs bytes.

use oxc_ast::ast::{
    ArrayExpressionElement, Class, ClassElement, Declaration, Expression, ObjectPropertyKind,
    PropertyKey, Statement, UnaryOperator, VariableDeclaration, VariableDeclarationKind,
};

/// Whether evaluating `stmt` at module top level may have observable effects.
pub fn statement_has_side_effects(stmt: &Statement<'_>) -> bool {
    match stmt {
        Statement::EmptyStatement(_) => false,
        Statement::ExpressionStatement(expr) => expression_has_side_effects(&expr.expression),
        Statement::ImportDeclaration(_)
        | Statement::ExportAllDeclaration(_)
        | Statement::TSInterfaceDeclaration(_)
        | Statement::TSTypeAliasDeclaration(_)
        | Statement::TSNamespaceExportDeclaration(_) => false,
        Statement::ExportNamedDeclaration(export) => export
            .declaration
            .as_ref()
            .is_some_and(declaration_has_side_effects),
        Statement::ExportDefaultDeclaration(export) => {
            if let Some(expr) = export.declaration.as_expression() {
                return expression_has_side_effects(expr);
            }
            match &export.declaration {
                oxc_ast::ast::ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                    class_has_side_effects(class)
                }
                _ => false,
            }
        }
        _ => match stmt.as_declaration() {
            Some(decl) => declaration_has_side_effects(decl),
            None => true,
        },
    }
}

fn declaration_has_side_effects(decl: &Declaration<'_>) -> bool {
    match decl {
        Declaration::FunctionDeclaration(_)
        | Declaration::TSInterfaceDeclaration(_)
        | Declaration::TSTypeAliasDeclaration(_) => false,
        Declaration::ClassDeclaration(class) => class_has_side_effects(class),
        Declaration::VariableDeclaration(var) => variable_has_side_effects(var),
        // enums, namespaces and import-equals run code
        _ => true,
    }
}

fn variable_has_side_effects(var: &VariableDeclaration<'_>) -> bool {
    if var.declare {
        return false;
    }
    if matches!(
        var.kind,
        VariableDeclarationKind::Using | VariableDeclarationKind::AwaitUsing
    ) {
        return true;
    }
    var.declarations.iter().any(|declarator| {
        // destructuring may invoke getters and iterators
        !matches!(
            declarator.id.kind,
            oxc_ast::ast::BindingPatternKind::BindingIdentifier(_)
        ) || declarator
            .init
            .as_ref()
            .is_some_and(expression_has_side_effects)
    })
}

fn class_has_side_effects(class: &Class<'_>) -> bool {
    if class.declare {
        return false;
    }
    if class
        .super_class
        .as_ref()
        .is_some_and(expression_has_side_effects)
    {
        return true;
    }
    class.body.body.iter().any(|element| match element {
        ClassElement::StaticBlock(_) => true,
        ClassElement::MethodDefinition(method) => {
            method.computed && property_key_has_side_effects(&method.key)
        }
        ClassElement::PropertyDefinition(prop) => {
            (prop.computed && property_key_has_side_effects(&prop.key))
                || (prop.r#static && prop.value.as_ref().is_some_and(expression_has_side_effects))
        }
        ClassElement::AccessorProperty(prop) => {
            (prop.computed && property_key_has_side_effects(&prop.key))
                || (prop.r#static && prop.value.as_ref().is_some_and(expression_has_side_effects))
        }
        ClassElement::TSIndexSignature(_) => false,
    })
}

fn property_key_has_side_effects(key: &PropertyKey<'_>) -> bool {
    key.as_expression().is_some_and(expression_has_side_effects)
}

/// Whether evaluating `expr` may have observable effects.
pub fn expression_has_side_effects(expr: &Expression<'_>) -> bool {
    match expr {
        Expression::BooleanLiteral(_)
        | Expression::NullLiteral(_)
        | Expression::NumericLiteral(_)
        | Expression::BigIntLiteral(_)
        | Expression::RegExpLiteral(_)
        | Expression::StringLiteral(_)
        | Expression::Identifier(_)
        | Expression::FunctionExpression(_)
        | Expression::ArrowFunctionExpression(_) => false,

        Expression::ClassExpression(class) => class_has_side_effects(class),

        Expression::TemplateLiteral(template) => template
            .expressions
            .iter()
            .any(expression_has_side_effects),

        Expression::ArrayExpression(array) => array.elements.iter().any(|element| match element {
            ArrayExpressionElement::SpreadElement(_) => true,
            ArrayExpressionElement::Elision(_) => false,
            _ => element
                .as_expression()
                .is_some_and(expression_has_side_effects),
        }),

        Expression::ObjectExpression(object) => {
            object.properties.iter().any(|property| match property {
                ObjectPropertyKind::SpreadProperty(_) => true,
                ObjectPropertyKind::ObjectProperty(prop) => {
                    (prop.computed && property_key_has_side_effects(&prop.key))
                        || expression_has_side_effects(&prop.value)
                }
            })
        }

        Expression::UnaryExpression(unary) => {
            unary.operator == UnaryOperator::Delete
                || expression_has_side_effects(&unary.argument)
        }
        Expression::BinaryExpression(binary) => {
            expression_has_side_effects(&binary.left) || expression_has_side_effects(&binary.right)
        }
        Expression::LogicalExpression(logical) => {
            expression_has_side_effects(&logical.left)
                || expression_has_side_effects(&logical.right)
        }
        Expression::ConditionalExpression(cond) => {
            expression_has_side_effects(&cond.test)
                || expression_has_side_effects(&cond.consequent)
                || expression_has_side_effects(&cond.alternate)
        }
        Expression::SequenceExpression(seq) => {
            seq.expressions.iter().any(expression_has_side_effects)
        }
        Expression::ParenthesizedExpression(paren) => {
            expression_has_side_effects(&paren.expression)
        }

        Expression::TSAsExpression(ts) => expression_has_side_effects(&ts.expression),
        Expression::TSSatisfiesExpression(ts) => expression_has_side_effects(&ts.expression),
        Expression::TSTypeAssertion(ts) => expression_has_side_effects(&ts.expression),
        Expression::TSNonNullExpression(ts) => expression_has_side_effects(&ts.expression),
        Expression::TSInstantiationExpression(ts) => expression_has_side_effects(&ts.expression),

        // calls, member access, assignment, await, this, JSX, ...
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn effects(source: &str) -> Vec<bool> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, SourceType::ts()).parse();
        assert!(ret.errors.is_empty(), "{:?}", ret.errors);
        ret.program
            .body
            .iter()
            .map(statement_has_side_effects)
            .collect()
    }

    #[test]
    fn declarations_are_pure() {
        assert_eq!(
            effects("function f() { sideEffect(); }\nconst a = 1, b = [a, `x${a}`];\nclass C { m() {} }"),
            vec![false, false, false]
        );
    }

    #[test]
    fn calls_and_assignments_are_effects() {
        assert_eq!(
            effects("console.log(1);\nwindow.x = 1;\nconst y = make();\nnew Foo();"),
            vec![true, true, true, true]
        );
    }

    #[test]
    fn destructuring_is_an_effect() {
        assert_eq!(effects("const { a } = obj;"), vec![true]);
    }

    #[test]
    fn class_statics_are_checked() {
        assert_eq!(
            effects("class A { static x = 1; }\nclass B { static x = init(); }\nclass C { static { go(); } }\nclass D extends mixin() {}"),
            vec![false, true, true, true]
        );
    }

    #[test]
    fn member_access_and_delete_are_effects() {
        assert_eq!(effects("obj.prop;\ndelete obj.x;\n!flag;"), vec![true, true, false]);
    }

    #[test]
    fn type_only_statements_are_pure() {
        assert_eq!(
            effects("interface A { x: number }\ntype B = A;\nexport type { B };"),
            vec![false, false, false]
        );
    }

    #[test]
    fn control_flow_is_an_effect() {
        assert_eq!(effects("if (a) {}\n{}\n;"), vec![true, true, false]);
    }

    #[test]
    fn export_default_expression_is_judged_by_value() {
        assert_eq!(effects("export default 42;"), vec![false]);
        assert_eq!(effects("export default run();"), vec![true]);
    }
}
