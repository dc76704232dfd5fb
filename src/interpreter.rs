// ABOUTME: Tree-walking evaluator managing environments, closures, and control flow

use crate::ast::{Expr, ExprId, Stmt};
use crate::env::Environment;
use crate::error::RuntimeError;
use crate::token::{Literal, Token, TokenType};
use crate::value::{Callable, LoxFunction, NativeFunction, Value};
use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Non-local transfers that unwind statement execution: a runtime error
/// headed for the interpret boundary, or a `return` headed for the
/// nearest enclosing call frame. A Return is caught by the call and is
/// never user-visible.
#[derive(Debug)]
enum Unwind {
    Return(Value),
    Error(RuntimeError),
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Unwind::Error(error)
    }
}

pub struct Interpreter<W: Write = io::Stdout> {
    globals: Rc<Environment>,
    environment: Rc<Environment>,
    locals: HashMap<ExprId, usize>,
    output: W,
}

impl Interpreter<io::Stdout> {
    pub fn new() -> Self {
        Interpreter::with_output(io::stdout())
    }
}

impl Default for Interpreter<io::Stdout> {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl<W: Write> Interpreter<W> {
    /// Builds an interpreter whose `print` statements write to `output`.
    pub fn with_output(output: W) -> Self {
        let globals = Environment::new();
        globals.define(
            "clock".to_string(),
            Value::Callable(Callable::Native(NativeFunction {
                arity: 0,
                call: native_clock,
            })),
        );

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Absorbs a resolution side-table. The REPL feeds one table per
    /// line; entries accumulate because closures from earlier lines stay
    /// callable.
    pub fn resolve(&mut self, locals: HashMap<ExprId, usize>) {
        self.locals.extend(locals);
    }

    /// Executes statements in order. The first runtime error aborts the
    /// rest of the list and is returned for reporting; nothing unwinds
    /// past here.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {}
                Err(Unwind::Error(error)) => return Err(error),
                // Top-level returns are rejected by the resolver
                Err(Unwind::Return(_)) => return Ok(()),
            }
        }
        Ok(())
    }

    /// Hands back the output sink; tests read printed text out of it.
    pub fn into_output(self) -> W {
        self.output
    }

    fn execute(&mut self, statement: &Stmt) -> Result<(), Unwind> {
        match statement {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                let _ = writeln!(self.output, "{}", value);
                Ok(())
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.environment.define(name.lexeme.clone(), value);
                Ok(())
            }
            Stmt::Block(statements) => self.execute_block(
                statements,
                Environment::with_enclosing(Rc::clone(&self.environment)),
            ),
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
            Stmt::Function(declaration) => {
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
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Err(Unwind::Return(value))
            }
        }
    }

    /// Runs statements in the given environment. The previous environment
    /// is restored no matter how execution leaves the block.
    fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<Environment>,
    ) -> Result<(), Unwind> {
        let previous = mem::replace(&mut self.environment, environment);
        let result = statements
            .iter()
            .try_for_each(|statement| self.execute(statement));
        self.environment = previous;
        result
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, Unwind> {
        match expr {
            Expr::Literal { value } => Ok(literal_value(value)),
            Expr::Grouping { inner } => self.evaluate(inner),
            Expr::Unary { op, right } => {
                let right = self.evaluate(right)?;
                match op.token_type {
                    TokenType::Minus => {
                        let n = check_number_operand(op, &right)?;
                        Ok(Value::Number(-n))
                    }
                    TokenType::Bang => Ok(Value::Bool(!right.is_truthy())),
                    _ => unreachable!("unary operator {:?}", op.token_type),
                }
            }
            Expr::Binary { left, op, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.binary(&left, op, &right)
            }
            Expr::Logical { left, op, right } => {
                let left = self.evaluate(left)?;
                // Short-circuit: hand back the deciding operand itself
                if op.token_type == TokenType::Or {
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
                let assigned = match self.locals.get(id) {
                    Some(&distance) => {
                        self.environment
                            .assign_at(distance, &name.lexeme, value.clone())
                    }
                    None => self.globals.assign(&name.lexeme, value.clone()),
                };
                if assigned {
                    Ok(value)
                } else {
                    Err(undefined_variable(name).into())
                }
            }
            Expr::Call { callee, paren, args } => {
                let callee = self.evaluate(callee)?;
                let mut arguments = Vec::with_capacity(args.len());
                for arg in args {
                    arguments.push(self.evaluate(arg)?);
                }
                self.call(callee, arguments, paren)
            }
        }
    }

    fn binary(&mut self, left: &Value, op: &Token, right: &Value) -> Result<Value, Unwind> {
        match op.token_type {
            TokenType::Greater => {
                let (a, b) = check_number_operands(op, left, right)?;
                Ok(Value::Bool(a > b))
            }
            TokenType::GreaterEqual => {
                let (a, b) = check_number_operands(op, left, right)?;
                Ok(Value::Bool(a >= b))
            }
            TokenType::Less => {
                let (a, b) = check_number_operands(op, left, right)?;
                Ok(Value::Bool(a < b))
            }
            TokenType::LessEqual => {
                let (a, b) = check_number_operands(op, left, right)?;
                Ok(Value::Bool(a <= b))
            }
            TokenType::Minus => {
                let (a, b) = check_number_operands(op, left, right)?;
                Ok(Value::Number(a - b))
            }
            // Division by zero follows IEEE-754: inf or nan, never an error
            TokenType::Slash => {
                let (a, b) = check_number_operands(op, left, right)?;
                Ok(Value::Number(a / b))
            }
            TokenType::Star => {
                let (a, b) = check_number_operands(op, left, right)?;
                Ok(Value::Number(a * b))
            }
            TokenType::Plus => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => {
                    Ok(Value::String(format!("{}{}", a, b)))
                }
                _ => Err(RuntimeError::new(
                    op.clone(),
                    "Operands must be two numbers or two strings.",
                )
                .into()),
            },
            TokenType::BangEqual => Ok(Value::Bool(left != right)),
            TokenType::EqualEqual => Ok(Value::Bool(left == right)),
            _ => unreachable!("binary operator {:?}", op.token_type),
        }
    }

    fn call(
        &mut self,
        callee: Value,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value, Unwind> {
        let Value::Callable(callable) = callee else {
            return Err(RuntimeError::new(
                paren.clone(),
                "Can only call functions and classes.",
            )
            .into());
        };

        if arguments.len() != callable.arity() {
            return Err(RuntimeError::new(
                paren.clone(),
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    arguments.len()
                ),
            )
            .into());
        }

        match callable {
            Callable::Native(native) => (native.call)(&arguments)
                .map_err(|message| RuntimeError::new(paren.clone(), message).into()),
            Callable::Function(function) => self.call_function(&function, arguments),
        }
    }

    fn call_function(
        &mut self,
        function: &LoxFunction,
        arguments: Vec<Value>,
    ) -> Result<Value, Unwind> {
        // Parameters bind in a frame on top of the captured closure; the
        // body runs in a child of that frame, mirroring the resolver's
        // two scopes per function.
        let params_env = Environment::with_enclosing(Rc::clone(&function.closure));
        for (param, argument) in function.declaration.params.iter().zip(arguments) {
            params_env.define(param.lexeme.clone(), argument);
        }

        let body_env = Environment::with_enclosing(params_env);
        match self.execute_block(&function.declaration.body, body_env) {
            Ok(()) => Ok(Value::Nil),
            Err(Unwind::Return(value)) => Ok(value),
            Err(error) => Err(error),
        }
    }

    /// Resolved references read at their recorded distance and never fall
    /// back to outer scopes; unresolved ones go straight to the globals.
    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value, Unwind> {
        let value = match self.locals.get(&id) {
            Some(&distance) => self.environment.get_at(distance, &name.lexeme),
            None => self.globals.get(&name.lexeme),
        };
        value.ok_or_else(|| undefined_variable(name).into())
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Nil => Value::Nil,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::String(s.clone()),
    }
}

fn check_number_operand(op: &Token, operand: &Value) -> Result<f64, RuntimeError> {
    match operand {
        Value::Number(n) => Ok(*n),
        _ => Err(RuntimeError::new(op.clone(), "Operand must be a number.")),
    }
}

fn check_number_operands(
    op: &Token,
    left: &Value,
    right: &Value,
) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::new(op.clone(), "Operands must be numbers.")),
    }
}

fn undefined_variable(name: &Token) -> RuntimeError {
    RuntimeError::new(
        name.clone(),
        format!("Undefined variable '{}'.", name.lexeme),
    )
}

/// Fractional seconds since the UNIX epoch. The epoch is an arbitrary
/// reference point; scripts only measure elapsed time.
fn native_clock(_args: &[Value]) -> Result<Value, String> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| Value::Number(elapsed.as_secs_f64()))
        .map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::reporter::Reporter;
    use crate::resolver::Resolver;
    use crate::scanner::Scanner;

    /// Runs a program and returns (printed output, runtime error).
    fn run(source: &str) -> (String, Option<RuntimeError>) {
        let mut reporter = Reporter::new();
        let tokens = Scanner::new(source).scan_tokens(&mut reporter);
        let mut parser = Parser::new(tokens, 0, &mut reporter);
        let statements = parser.parse();
        assert!(!reporter.had_error(), "test source must parse cleanly");
        let locals = Resolver::new(&mut reporter).resolve(&statements);
        assert!(!reporter.had_error(), "test source must resolve cleanly");

        let mut interpreter = Interpreter::with_output(Vec::new());
        interpreter.resolve(locals);
        let error = interpreter.interpret(&statements).err();
        let output = String::from_utf8(interpreter.into_output()).expect("output is UTF-8");
        (output, error)
    }

    fn run_ok(source: &str) -> String {
        let (output, error) = run(source);
        assert!(error.is_none(), "unexpected runtime error: {:?}", error);
        output
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
        assert_eq!(run_ok("print (1 + 2) * 3;"), "9\n");
        assert_eq!(run_ok("print 6 / 3 - 1;"), "1\n");
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(run_ok("print -3;"), "-3\n");
        assert_eq!(run_ok("print !true;"), "false\n");
        assert_eq!(run_ok("print !nil;"), "true\n");
        assert_eq!(run_ok("print !!0;"), "true\n");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(run_ok("print \"a\" + \"b\";"), "ab\n");
    }

    #[test]
    fn test_number_stringification() {
        assert_eq!(run_ok("print 3; print 3.5;"), "3\n3.5\n");
    }

    #[test]
    fn test_division_by_zero_is_infinite() {
        assert_eq!(run_ok("print 1 / 0;"), "inf\n");
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(run_ok("print 1 < 2; print 2 <= 2; print 3 > 4;"), "true\ntrue\nfalse\n");
    }

    #[test]
    fn test_equality_across_variants() {
        assert_eq!(run_ok("print 1 == true;"), "false\n");
        assert_eq!(run_ok("print \"1\" == 1;"), "false\n");
        assert_eq!(run_ok("print nil == nil;"), "true\n");
        assert_eq!(run_ok("print 1 != 2;"), "true\n");
    }

    #[test]
    fn test_logical_operators_return_operand_values() {
        assert_eq!(run_ok("print \"hi\" or 2;"), "hi\n");
        assert_eq!(run_ok("print nil or \"yes\";"), "yes\n");
        assert_eq!(run_ok("print nil and 2;"), "nil\n");
        assert_eq!(run_ok("print 1 and 2;"), "2\n");
    }

    #[test]
    fn test_short_circuit_skips_right_operand() {
        // The call would blow up if evaluated
        assert_eq!(run_ok("print false and missing();"), "false\n");
        assert_eq!(run_ok("print true or missing();"), "true\n");
    }

    #[test]
    fn test_var_and_assignment() {
        assert_eq!(run_ok("var a = 1; a = a + 1; print a;"), "2\n");
        assert_eq!(run_ok("var a; print a;"), "nil\n");
    }

    #[test]
    fn test_assignment_is_an_expression() {
        assert_eq!(run_ok("var a = 1; print a = 2;"), "2\n");
    }

    #[test]
    fn test_block_scoping() {
        let source = "var a = \"global\"; { var a = \"block\"; print a; } print a;";
        assert_eq!(run_ok(source), "block\nglobal\n");
    }

    #[test]
    fn test_if_else() {
        assert_eq!(run_ok("if (1 < 2) print \"yes\"; else print \"no\";"), "yes\n");
        assert_eq!(run_ok("if (nil) print \"yes\"; else print \"no\";"), "no\n");
    }

    #[test]
    fn test_while_loop() {
        assert_eq!(run_ok("var i = 0; while (i < 3) { print i; i = i + 1; }"), "0\n1\n2\n");
    }

    #[test]
    fn test_function_call_and_return() {
        assert_eq!(run_ok("fun add(a, b) { return a + b; } print add(1, 2);"), "3\n");
    }

    #[test]
    fn test_function_without_return_yields_nil() {
        assert_eq!(run_ok("fun f() {} print f();"), "nil\n");
    }

    #[test]
    fn test_recursion() {
        let source = "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);";
        assert_eq!(run_ok(source), "55\n");
    }

    #[test]
    fn test_function_stringification() {
        assert_eq!(run_ok("fun f() {} print f;"), "<fn f>\n");
        assert_eq!(run_ok("print clock;"), "<native fn>\n");
    }

    #[test]
    fn test_clock_returns_a_number() {
        assert_eq!(run_ok("print clock() >= 0;"), "true\n");
    }

    #[test]
    fn test_operands_must_be_numbers() {
        let (output, error) = run("print 1; print \"x\" - 1; print 2;");
        assert_eq!(output, "1\n");
        let error = error.expect("expected a runtime error");
        assert_eq!(error.message, "Operands must be numbers.");
    }

    #[test]
    fn test_plus_type_error_message() {
        let (_, error) = run("print 1 + \"x\";");
        let error = error.expect("expected a runtime error");
        assert_eq!(error.message, "Operands must be two numbers or two strings.");
    }

    #[test]
    fn test_unary_minus_type_error() {
        let (_, error) = run("print -\"x\";");
        let error = error.expect("expected a runtime error");
        assert_eq!(error.message, "Operand must be a number.");
    }

    #[test]
    fn test_undefined_variable_read() {
        let (_, error) = run("print missing;");
        let error = error.expect("expected a runtime error");
        assert_eq!(error.message, "Undefined variable 'missing'.");
    }

    #[test]
    fn test_assignment_to_undefined_global_fails() {
        let (_, error) = run("missing = 1;");
        let error = error.expect("expected a runtime error");
        assert_eq!(error.message, "Undefined variable 'missing'.");
    }

    #[test]
    fn test_calling_a_non_callable_fails() {
        let (_, error) = run("\"not a function\"();");
        let error = error.expect("expected a runtime error");
        assert_eq!(error.message, "Can only call functions and classes.");
    }

    #[test]
    fn test_arity_mismatch() {
        let (_, error) = run("fun f(a, b) {} f(1);");
        let error = error.expect("expected a runtime error");
        assert_eq!(error.message, "Expected 2 arguments but got 1.");
    }

    #[test]
    fn test_arguments_evaluate_left_to_right() {
        let source = "fun f(a, b) { return a; } var x = 0; print f(x = 1, x = 2); print x;";
        assert_eq!(run_ok(source), "1\n2\n");
    }

    #[test]
    fn test_environment_restored_after_runtime_error_in_block() {
        let (output, error) = run("var a = 1; { var a = 2; print a - \"x\"; }");
        assert_eq!(output, "");
        assert!(error.is_some());
        // A fresh statement list on the same interpreter would see the
        // outer `a`; restoration is covered end to end in tests/.
    }
}
