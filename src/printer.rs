// ABOUTME: Renders an AST back to source text, used by round-trip tests

use crate::ast::{Expr, LiteralValue, Stmt};

/// Prints a whole program, one top-level statement per line.
///
/// For any parser-produced AST, re-parsing the printed text yields a
/// structurally equivalent AST, so print-of-parse is a fixpoint.
pub fn print_program(statements: &[Stmt]) -> String {
    statements
        .iter()
        .map(print_stmt)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Expression { expr } => format!("{};", print_expr(expr)),
        Stmt::Print { expr } => format!("print {};", print_expr(expr)),
        Stmt::Var {
            name,
            initializer: Some(init),
        } => format!("var {} = {};", name.lexeme, print_expr(init)),
        Stmt::Var {
            name,
            initializer: None,
        } => format!("var {};", name.lexeme),
        Stmt::Block { statements } => {
            if statements.is_empty() {
                "{ }".to_string()
            } else {
                let body = statements
                    .iter()
                    .map(print_stmt)
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{{ {} }}", body)
            }
        }
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let mut text = format!(
                "if ({}) {}",
                print_expr(condition),
                print_stmt(then_branch)
            );
            if let Some(else_branch) = else_branch {
                text.push_str(&format!(" else {}", print_stmt(else_branch)));
            }
            text
        }
        Stmt::While { condition, body } => {
            format!("while ({}) {}", print_expr(condition), print_stmt(body))
        }
        Stmt::Function { declaration } => {
            let params = declaration
                .params
                .iter()
                .map(|p| p.lexeme.clone())
                .collect::<Vec<_>>()
                .join(", ");
            let body = declaration
                .body
                .iter()
                .map(print_stmt)
                .collect::<Vec<_>>()
                .join(" ");
            if body.is_empty() {
                format!("fun {}({}) {{ }}", declaration.name.lexeme, params)
            } else {
                format!("fun {}({}) {{ {} }}", declaration.name.lexeme, params, body)
            }
        }
        Stmt::Return { value: Some(value), .. } => format!("return {};", print_expr(value)),
        Stmt::Return { value: None, .. } => "return;".to_string(),
    }
}

pub fn print_expr(expr: &Expr) -> String {
    match expr {
        Expr::Literal { value } => print_literal(value),
        Expr::Grouping { inner } => format!("({})", print_expr(inner)),
        Expr::Unary { op, right } => format!("{}{}", op.lexeme, print_expr(right)),
        Expr::Binary { left, op, right } | Expr::Logical { left, op, right } => {
            format!("{} {} {}", print_expr(left), op.lexeme, print_expr(right))
        }
        Expr::Variable { name, .. } => name.lexeme.clone(),
        Expr::Assign { name, value, .. } => {
            format!("{} = {}", name.lexeme, print_expr(value))
        }
        Expr::Call {
            callee, arguments, ..
        } => {
            let args = arguments
                .iter()
                .map(print_expr)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}({})", print_expr(callee), args)
        }
    }
}

fn print_literal(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Nil => "nil".to_string(),
        LiteralValue::Bool(b) => b.to_string(),
        LiteralValue::Number(n) => {
            if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        LiteralValue::Str(s) => format!("\"{}\"", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConsoleReporter;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn parse(source: &str) -> Vec<Stmt> {
        let mut reporter = ConsoleReporter::new();
        let tokens = Lexer::new(source, &mut reporter).scan_tokens();
        let statements = Parser::new(tokens, &mut reporter).parse();
        assert!(!reporter.had_error, "parse error in {:?}", source);
        statements
    }

    #[test]
    fn test_prints_expressions() {
        assert_eq!(print_program(&parse("1 + 2 * 3;")), "1 + 2 * 3;");
        assert_eq!(print_program(&parse("-(1 + 2);")), "-(1 + 2);");
        assert_eq!(print_program(&parse("!ready;")), "!ready;");
        assert_eq!(print_program(&parse("\"a\" + \"b\";")), "\"a\" + \"b\";");
    }

    #[test]
    fn test_prints_statements() {
        assert_eq!(print_program(&parse("var x;")), "var x;");
        assert_eq!(print_program(&parse("var x = 1;")), "var x = 1;");
        assert_eq!(
            print_program(&parse("if (x) print 1; else print 2;")),
            "if (x) print 1; else print 2;"
        );
        assert_eq!(
            print_program(&parse("fun f(a, b) { return a; }")),
            "fun f(a, b) { return a; }"
        );
    }

    #[test]
    fn test_for_prints_in_desugared_form() {
        assert_eq!(
            print_program(&parse("for (var i = 0; i < 3; i = i + 1) print i;")),
            "{ var i = 0; while (i < 3) { print i; i = i + 1; } }"
        );
    }

    #[test]
    fn test_print_of_parse_is_a_fixpoint() {
        let sources = [
            "print 1 + 2 * 3;",
            "print (1 + 2) * 3;",
            "var a = 1; var b = 2; print a + b;",
            "var i = 0; while (i < 3) { print i; i = i + 1; }",
            "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);",
            "for (var i = 0; i < 3; i = i + 1) print i;",
            "print 1 or 2 and nil;",
            "print clock();",
        ];

        for source in sources {
            let first = print_program(&parse(source));
            let second = print_program(&parse(&first));
            assert_eq!(first, second, "not a fixpoint for {:?}", source);
        }
    }
}
