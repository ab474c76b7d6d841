// ABOUTME: Static resolution pass binding variable references to scope depths

use crate::ast::{Expr, FunctionDecl, NodeId, Stmt};
use crate::error::Reporter;
use crate::eval::Interpreter;
use crate::token::Token;
use std::collections::HashMap;

/// Tracks whether the code being resolved sits inside a function body, so
/// `return` at top level can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
}

/// Walks the AST once before evaluation and records, for every local
/// variable reference, how many environments up its binding lives.
///
/// Globals are deliberately left out: they resolve dynamically by name so a
/// REPL line can refer to a global defined later. All diagnostics go through
/// the Reporter's compile channel, and resolution continues after an error
/// so one pass surfaces everything.
pub struct Resolver<'a> {
    interpreter: &'a mut Interpreter,
    reporter: &'a mut dyn Reporter,
    /// Stack of block scopes; the bool is false while the name's
    /// initializer is still being resolved.
    scopes: Vec<HashMap<String, bool>>,
    current_function: FunctionType,
}

impl<'a> Resolver<'a> {
    pub fn new(interpreter: &'a mut Interpreter, reporter: &'a mut dyn Reporter) -> Self {
        Resolver {
            interpreter,
            reporter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
        }
    }

    pub fn resolve(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.resolve_stmt(statement);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression { expr } | Stmt::Print { expr } => self.resolve_expr(expr),
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer);
                }
                self.define(name);
            }
            Stmt::Block { statements } => {
                self.begin_scope();
                self.resolve(statements);
                self.end_scope();
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
            Stmt::Function { declaration } => {
                // Declared and defined eagerly so the function can refer to
                // itself recursively.
                self.declare(&declaration.name);
                self.define(&declaration.name);
                self.resolve_function(declaration, FunctionType::Function);
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.reporter
                        .error_at(keyword, "Cannot return from top-level code.");
                }
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal { .. } => {}
            Expr::Grouping { inner } => self.resolve_expr(inner),
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Variable { id, name } => {
                if self
                    .scopes
                    .last()
                    .is_some_and(|scope| scope.get(&name.lexeme) == Some(&false))
                {
                    self.reporter.error_at(
                        name,
                        "Cannot read local variable in its own initializer.",
                    );
                }
                self.resolve_local(*id, name);
            }
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }
        }
    }

    fn resolve_function(&mut self, declaration: &FunctionDecl, function_type: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = function_type;

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve(&declaration.body);
        self.end_scope();

        self.current_function = enclosing;
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Marks the name as existing-but-not-ready in the innermost scope.
    /// Globals (empty scope stack) are not tracked.
    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(&name.lexeme) {
            self.reporter.error_at(
                name,
                "Variable with this name already declared in this scope.",
            );
        }
        scope.insert(name.lexeme.clone(), false);
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    /// Records the hop distance to the innermost scope that knows the name.
    /// A miss means the name is (assumed) global and stays unresolved.
    fn resolve_local(&mut self, id: NodeId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.interpreter.resolve(id, depth);
                return;
            }
        }
    }
}
