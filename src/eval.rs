// ABOUTME: Evaluator module walking the resolved AST and executing it

use crate::ast::{Expr, LiteralValue, NodeId, Stmt};
use crate::env::Environment;
use crate::error::{Reporter, RuntimeError, Unwind};
use crate::token::{Token, TokenKind};
use crate::value::{Callable, LoxFunction, Value};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Tree-walking evaluator.
///
/// Owns the globals frame and the resolver's side-table, both of which live
/// across REPL lines: functions defined on one line keep their resolutions
/// and environments when called from a later one.
pub struct Interpreter {
    pub globals: Rc<Environment>,
    environment: Rc<Environment>,
    locals: HashMap<NodeId, usize>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Environment::new();
        globals.define("clock".to_string(), Value::Callable(Callable::Clock));

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
        }
    }

    /// Records a hop distance for a variable reference. Called by the
    /// resolver.
    pub fn resolve(&mut self, id: NodeId, depth: usize) {
        self.locals.insert(id, depth);
    }

    pub fn depth_of(&self, id: NodeId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    /// Executes statements top to bottom. A runtime error aborts the rest
    /// of the sequence and is handed to the Reporter; the interpreter stays
    /// usable afterwards.
    pub fn interpret(&mut self, statements: &[Stmt], reporter: &mut dyn Reporter) {
        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {}
                Err(Unwind::Error(error)) => {
                    reporter.runtime_error(&error);
                    return;
                }
                // The resolver rejects top-level returns, so this only
                // happens when evaluation was forced past a compile error.
                Err(Unwind::Return(_)) => return,
            }
        }
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<(), Unwind> {
        match stmt {
            Stmt::Expression { expr } => {
                self.evaluate(expr)?;
                Ok(())
            }
            Stmt::Print { expr } => {
                let value = self.evaluate(expr)?;
                println!("{}", value);
                Ok(())
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Nil,
                };
                self.environment.define(name.lexeme.clone(), value);
                Ok(())
            }
            Stmt::Block { statements } => {
                let scope = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, scope)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }
                Ok(())
            }
            Stmt::Function { declaration } => {
                // The closure is the environment in force at the
                // declaration, never the caller's.
                let function = LoxFunction {
                    declaration: Rc::clone(declaration),
                    closure: Rc::clone(&self.environment),
                };
                self.environment.define(
                    declaration.name.lexeme.clone(),
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
                Ok(())
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };
                Err(Unwind::Return(value))
            }
        }
    }

    /// Runs statements in the given environment, restoring the previous one
    /// on every exit path.
    fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<Environment>,
    ) -> Result<(), Unwind> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = statements
            .iter()
            .try_for_each(|statement| self.execute(statement));
        self.environment = previous;
        result
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal { value } => Ok(match value {
                LiteralValue::Nil => Value::Nil,
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::Str(s.clone()),
            }),
            Expr::Grouping { inner } => self.evaluate(inner),
            Expr::Unary { op, right } => {
                let right = self.evaluate(right)?;
                match op.kind {
                    TokenKind::Minus => {
                        let n = check_number_operand(op, &right)?;
                        Ok(Value::Number(-n))
                    }
                    TokenKind::Bang => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(RuntimeError::new(op, "Unknown unary operator.")),
                }
            }
            Expr::Binary { left, op, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.binary(op, left, right)
            }
            Expr::Logical { left, op, right } => {
                let left = self.evaluate(left)?;
                // Short-circuit returns the operand itself, uncoerced.
                if op.kind == TokenKind::Or {
                    if left.is_truthy() {
                        return Ok(left);
                    }
                } else if !left.is_truthy() {
                    return Ok(left);
                }
                self.evaluate(right)
            }
            Expr::Variable { id, name } => self.look_up_variable(*id, name),
            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                match self.locals.get(id) {
                    Some(&distance) => {
                        self.environment
                            .assign_at(distance, &name.lexeme, value.clone());
                    }
                    None => {
                        if !self.globals.assign(&name.lexeme, value.clone()) {
                            return Err(undefined_variable(name));
                        }
                    }
                }
                Ok(value)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                let Value::Callable(callable) = callee else {
                    return Err(RuntimeError::new(
                        paren,
                        "Can only call functions and classes.",
                    ));
                };

                if args.len() != callable.arity() {
                    let message = format!(
                        "Expected {} arguments but got {}.",
                        callable.arity(),
                        args.len()
                    );
                    return Err(RuntimeError::new(paren, message));
                }

                match callable {
                    Callable::Clock => Ok(clock()),
                    Callable::Function(function) => self.call_function(&function, args),
                }
            }
        }
    }

    fn call_function(
        &mut self,
        function: &LoxFunction,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let environment = Environment::with_enclosing(Rc::clone(&function.closure));
        for (param, arg) in function.declaration.params.iter().zip(args) {
            environment.define(param.lexeme.clone(), arg);
        }

        // The function boundary is the only place a return signal is caught.
        match self.execute_block(&function.declaration.body, environment) {
            Ok(()) => Ok(Value::Nil),
            Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(error)) => Err(error),
        }
    }

    fn binary(&mut self, op: &Token, left: Value, right: Value) -> Result<Value, RuntimeError> {
        match op.kind {
            TokenKind::Plus => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
                _ => Err(RuntimeError::new(
                    op,
                    "Operands must be two numbers or two strings.",
                )),
            },
            TokenKind::Minus => {
                let (a, b) = check_number_operands(op, &left, &right)?;
                Ok(Value::Number(a - b))
            }
            TokenKind::Star => {
                let (a, b) = check_number_operands(op, &left, &right)?;
                Ok(Value::Number(a * b))
            }
            TokenKind::Slash => {
                // Division by zero follows IEEE semantics: inf or NaN.
                let (a, b) = check_number_operands(op, &left, &right)?;
                Ok(Value::Number(a / b))
            }
            TokenKind::Greater => {
                let (a, b) = check_number_operands(op, &left, &right)?;
                Ok(Value::Bool(a > b))
            }
            TokenKind::GreaterEqual => {
                let (a, b) = check_number_operands(op, &left, &right)?;
                Ok(Value::Bool(a >= b))
            }
            TokenKind::Less => {
                let (a, b) = check_number_operands(op, &left, &right)?;
                Ok(Value::Bool(a < b))
            }
            TokenKind::LessEqual => {
                let (a, b) = check_number_operands(op, &left, &right)?;
                Ok(Value::Bool(a <= b))
            }
            TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
            TokenKind::BangEqual => Ok(Value::Bool(left != right)),
            _ => Err(RuntimeError::new(op, "Unknown binary operator.")),
        }
    }

    fn look_up_variable(&self, id: NodeId, name: &Token) -> Result<Value, RuntimeError> {
        let value = match self.locals.get(&id) {
            Some(&distance) => self.environment.get_at(distance, &name.lexeme),
            None => self.globals.get(&name.lexeme),
        };
        value.ok_or_else(|| undefined_variable(name))
    }
}

fn undefined_variable(name: &Token) -> RuntimeError {
    RuntimeError::new(name, format!("Undefined Variable '{}'.", name.lexeme))
}

fn check_number_operand(op: &Token, operand: &Value) -> Result<f64, RuntimeError> {
    match operand {
        Value::Number(n) => Ok(*n),
        _ => Err(RuntimeError::new(op, "Operand must be a number.")),
    }
}

fn check_number_operands(
    op: &Token,
    left: &Value,
    right: &Value,
) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::new(op, "Operands must be numbers.")),
    }
}

/// The single native function: wall-clock time in milliseconds.
fn clock() -> Value {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Value::Number(now.as_secs_f64() * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConsoleReporter;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::resolver::Resolver;

    /// Runs a program through the full pipeline on a fresh interpreter.
    fn run(source: &str) -> (Interpreter, ConsoleReporter) {
        let mut interpreter = Interpreter::new();
        let mut reporter = ConsoleReporter::new();
        run_on(&mut interpreter, &mut reporter, source);
        (interpreter, reporter)
    }

    fn run_on(interpreter: &mut Interpreter, reporter: &mut ConsoleReporter, source: &str) {
        let tokens = Lexer::new(source, reporter).scan_tokens();
        let statements = Parser::new(tokens, reporter).parse();
        assert!(!reporter.had_error, "compile error in {:?}", source);
        Resolver::new(interpreter, reporter).resolve(&statements);
        assert!(!reporter.had_error, "resolve error in {:?}", source);
        interpreter.interpret(&statements, reporter);
    }

    /// Evaluates a single expression by binding it to a global.
    fn eval(expr: &str) -> Value {
        let (interpreter, reporter) = run(&format!("var it = {};", expr));
        assert!(!reporter.had_runtime_error, "runtime error in {:?}", expr);
        interpreter.globals.get("it").expect("no result")
    }

    fn global(interpreter: &Interpreter, name: &str) -> Value {
        interpreter.globals.get(name).expect("missing global")
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(eval("1 + 2 * 3"), Value::Number(7.0));
        assert_eq!(eval("(1 + 2) * 3"), Value::Number(9.0));
        assert_eq!(eval("10 - 4 / 2"), Value::Number(8.0));
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(eval("-3"), Value::Number(-3.0));
        assert_eq!(eval("--3"), Value::Number(3.0));
        assert_eq!(eval("!true"), Value::Bool(false));
        assert_eq!(eval("!nil"), Value::Bool(true));
        assert_eq!(eval("!0"), Value::Bool(false));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(eval("\"a\" + \"b\""), Value::Str("ab".to_string()));
    }

    #[test]
    fn test_division_by_zero_follows_ieee() {
        assert_eq!(eval("1 / 0"), Value::Number(f64::INFINITY));
        let Value::Number(n) = eval("0 / 0") else {
            panic!("expected number");
        };
        assert!(n.is_nan());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("1 < 2"), Value::Bool(true));
        assert_eq!(eval("2 <= 2"), Value::Bool(true));
        assert_eq!(eval("3 > 4"), Value::Bool(false));
        assert_eq!(eval("4 >= 5"), Value::Bool(false));
    }

    #[test]
    fn test_equality() {
        assert_eq!(eval("1 == 1"), Value::Bool(true));
        assert_eq!(eval("1 != 2"), Value::Bool(true));
        assert_eq!(eval("nil == nil"), Value::Bool(true));
        assert_eq!(eval("\"a\" == \"a\""), Value::Bool(true));
        // Cross-variant comparisons are false, never coerced.
        assert_eq!(eval("1 == \"1\""), Value::Bool(false));
        assert_eq!(eval("nil == false"), Value::Bool(false));
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(eval("1 or 2"), Value::Number(1.0));
        assert_eq!(eval("nil or \"x\""), Value::Str("x".to_string()));
        assert_eq!(eval("nil and 2"), Value::Nil);
        assert_eq!(eval("1 and 2"), Value::Number(2.0));
    }

    #[test]
    fn test_logical_short_circuit_skips_side_effects() {
        let (interpreter, _) = run("var hit = false; fun touch() { hit = true; } false and touch();");
        assert_eq!(global(&interpreter, "hit"), Value::Bool(false));

        let (interpreter, _) = run("var hit = false; fun touch() { hit = true; } true or touch();");
        assert_eq!(global(&interpreter, "hit"), Value::Bool(false));
    }

    #[test]
    fn test_plus_type_error() {
        let (_, reporter) = run("var x = 1 + \"a\";");
        assert!(reporter.had_runtime_error);
    }

    #[test]
    fn test_unary_minus_type_error() {
        let (_, reporter) = run("var x = -\"oops\";");
        assert!(reporter.had_runtime_error);
    }

    #[test]
    fn test_comparison_type_error() {
        let (_, reporter) = run("var x = 1 < \"2\";");
        assert!(reporter.had_runtime_error);
    }

    #[test]
    fn test_var_without_initializer_is_nil() {
        let (interpreter, _) = run("var x;");
        assert_eq!(global(&interpreter, "x"), Value::Nil);
    }

    #[test]
    fn test_assignment_is_an_expression() {
        let (interpreter, _) = run("var a = 1; var b = a = 2;");
        assert_eq!(global(&interpreter, "a"), Value::Number(2.0));
        assert_eq!(global(&interpreter, "b"), Value::Number(2.0));
    }

    #[test]
    fn test_undefined_variable_read_is_a_runtime_error() {
        let (_, reporter) = run("var x = missing;");
        assert!(reporter.had_runtime_error);
    }

    #[test]
    fn test_undefined_variable_assign_is_a_runtime_error() {
        let (_, reporter) = run("missing = 1;");
        assert!(reporter.had_runtime_error);
    }

    #[test]
    fn test_block_scoping_restores_environment() {
        let (interpreter, _) = run("var a = 1; { var a = 2; } var b = a;");
        assert_eq!(global(&interpreter, "b"), Value::Number(1.0));
    }

    #[test]
    fn test_while_loop() {
        let (interpreter, _) = run("var i = 0; while (i < 5) { i = i + 1; }");
        assert_eq!(global(&interpreter, "i"), Value::Number(5.0));
    }

    #[test]
    fn test_for_loop() {
        let (interpreter, _) = run("var sum = 0; for (var i = 1; i <= 4; i = i + 1) sum = sum + i;");
        assert_eq!(global(&interpreter, "sum"), Value::Number(10.0));
    }

    #[test]
    fn test_if_else() {
        let (interpreter, _) = run("var x; if (1 > 2) x = \"then\"; else x = \"else\";");
        assert_eq!(global(&interpreter, "x"), Value::Str("else".to_string()));
    }

    #[test]
    fn test_function_call_and_return() {
        let (interpreter, _) = run("fun add(a, b) { return a + b; } var r = add(1, 2);");
        assert_eq!(global(&interpreter, "r"), Value::Number(3.0));
    }

    #[test]
    fn test_function_without_return_yields_nil() {
        let (interpreter, _) = run("fun noop() { 1 + 1; } var r = noop();");
        assert_eq!(global(&interpreter, "r"), Value::Nil);
    }

    #[test]
    fn test_return_unwinds_nested_blocks() {
        let (interpreter, _) = run(
            "fun f() { while (true) { if (true) { return \"done\"; } } } var r = f();",
        );
        assert_eq!(global(&interpreter, "r"), Value::Str("done".to_string()));
    }

    #[test]
    fn test_recursion() {
        let (interpreter, _) = run(
            "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } var r = fib(10);",
        );
        assert_eq!(global(&interpreter, "r"), Value::Number(55.0));
    }

    #[test]
    fn test_closure_keeps_state_across_calls() {
        let (interpreter, _) = run(
            "fun make() { var x = 0; fun inc() { x = x + 1; return x; } return inc; } \
             var c = make(); var first = c(); var second = c();",
        );
        assert_eq!(global(&interpreter, "first"), Value::Number(1.0));
        assert_eq!(global(&interpreter, "second"), Value::Number(2.0));
    }

    #[test]
    fn test_closures_capture_lexically_not_dynamically() {
        let (interpreter, _) = run(
            "var a = \"global\"; var captured; \
             { fun f() { captured = a; } var a = \"local\"; f(); }",
        );
        assert_eq!(
            global(&interpreter, "captured"),
            Value::Str("global".to_string())
        );
    }

    #[test]
    fn test_sibling_closures_share_one_environment() {
        let (interpreter, _) = run(
            "fun make() { var n = 0; fun bump() { n = n + 1; } fun read() { return n; } \
             bump(); bump(); return read; } var r = make()();",
        );
        assert_eq!(global(&interpreter, "r"), Value::Number(2.0));
    }

    #[test]
    fn test_arguments_evaluate_left_to_right() {
        let (interpreter, _) = run(
            "var trace = \"\"; fun mark(s) { trace = trace + s; return s; } \
             fun pair(a, b) { return a + b; } pair(mark(\"a\"), mark(\"b\"));",
        );
        assert_eq!(global(&interpreter, "trace"), Value::Str("ab".to_string()));
    }

    #[test]
    fn test_call_non_callable_is_a_runtime_error() {
        let (_, reporter) = run("var x = 1; x();");
        assert!(reporter.had_runtime_error);
    }

    #[test]
    fn test_arity_mismatch_is_a_runtime_error() {
        let (_, reporter) = run("fun f(a) { return a; } f(1, 2);");
        assert!(reporter.had_runtime_error);
    }

    #[test]
    fn test_clock_returns_a_number() {
        let Value::Number(ms) = eval("clock()") else {
            panic!("expected number from clock()");
        };
        assert!(ms > 0.0);
    }

    #[test]
    fn test_global_redefinition_overwrites() {
        let (interpreter, reporter) = run("var a = 1; var a = \"two\";");
        assert!(!reporter.had_runtime_error);
        assert_eq!(global(&interpreter, "a"), Value::Str("two".to_string()));
    }

    #[test]
    fn test_runtime_error_aborts_rest_of_sequence() {
        let (interpreter, reporter) = run("var a = 1; var b = -\"x\"; a = 99;");
        assert!(reporter.had_runtime_error);
        // The statement after the error never ran.
        assert_eq!(global(&interpreter, "a"), Value::Number(1.0));
    }

    #[test]
    fn test_interpreter_survives_runtime_error() {
        let mut interpreter = Interpreter::new();
        let mut reporter = ConsoleReporter::new();
        run_on(&mut interpreter, &mut reporter, "var x = -\"bad\";");
        assert!(reporter.had_runtime_error);

        reporter.reset();
        run_on(&mut interpreter, &mut reporter, "var x = 1; var y = x + 1;");
        assert!(!reporter.had_runtime_error);
        assert_eq!(global(&interpreter, "y"), Value::Number(2.0));
    }

    #[test]
    fn test_functions_defined_earlier_stay_callable_across_runs() {
        // Mimics successive REPL lines sharing one interpreter.
        let mut interpreter = Interpreter::new();
        let mut reporter = ConsoleReporter::new();
        run_on(&mut interpreter, &mut reporter, "fun twice(n) { return n * 2; }");
        run_on(&mut interpreter, &mut reporter, "var r = twice(21);");
        assert!(!reporter.had_runtime_error);
        assert_eq!(global(&interpreter, "r"), Value::Number(42.0));
    }
}
