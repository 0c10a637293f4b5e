use std::collections::VecDeque;
use std::io::{self, BufRead};

use thiserror::Error;

use crate::ast::{BinaryOperator, Condition, Expression, Program, RelationalOperator, Statement};
use crate::env::{Environment, ScopeId};

/// Typed errors produced by the tree-walking evaluator. Undeclared variable
/// reads are deliberately not here: they degrade to 0. Undeclared procedure
/// calls do not.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterpreterError {
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Undefined procedure '{name}'")]
    UndefinedProcedure { name: String },
    #[error("Input exhausted while reading an integer")]
    InputExhausted,
    #[error("Invalid input token '{token}': expected an integer")]
    InvalidInput { token: String },
    #[error("Failed to read input: {message}")]
    Input { message: String },
}

/// AST-walking evaluator. READLN pulls whitespace-delimited integers from
/// the supplied reader; WRITELN output is buffered as lines and returned
/// joined by `run`.
pub struct Interpreter<'a> {
    input: Box<dyn BufRead + 'a>,
    pending_input: VecDeque<String>,
    output: Vec<String>,
}

impl Interpreter<'static> {
    pub fn new() -> Self {
        Self::with_input(Box::new(io::empty()))
    }
}

impl Default for Interpreter<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Interpreter<'a> {
    pub fn with_input(input: Box<dyn BufRead + 'a>) -> Self {
        Self {
            input,
            pending_input: VecDeque::new(),
            output: Vec::new(),
        }
    }

    pub fn run(&mut self, program: &Program) -> Result<String, InterpreterError> {
        let mut env = Environment::new();
        self.run_in(program, &mut env)
    }

    /// Runs against a caller-supplied environment so final global values can
    /// be inspected afterwards.
    pub fn run_in(
        &mut self,
        program: &Program,
        env: &mut Environment,
    ) -> Result<String, InterpreterError> {
        self.output.clear();
        for decl in &program.procedures {
            env.define_procedure(decl.clone());
        }
        for statement in &program.statements {
            self.exec_statement(statement, env, ScopeId::ROOT)?;
        }
        Ok(self.output.join("\n"))
    }

    fn exec_statement(
        &mut self,
        statement: &Statement,
        env: &mut Environment,
        scope: ScopeId,
    ) -> Result<(), InterpreterError> {
        match statement {
            Statement::Assignment { name, value } => {
                let value = self.eval_expression(value, env, scope)?;
                env.assign(scope, name, value);
                Ok(())
            }
            Statement::Block(statements) => {
                for statement in statements {
                    self.exec_statement(statement, env, scope)?;
                }
                Ok(())
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_condition(condition, env, scope)? {
                    self.exec_statement(then_branch, env, scope)?;
                } else if let Some(else_branch) = else_branch {
                    self.exec_statement(else_branch, env, scope)?;
                }
                Ok(())
            }
            Statement::While { condition, body } => {
                while self.eval_condition(condition, env, scope)? {
                    self.exec_statement(body, env, scope)?;
                }
                Ok(())
            }
            Statement::For {
                var,
                from,
                to,
                body,
            } => {
                let start = self.eval_expression(from, env, scope)?;
                env.assign(scope, var, start);
                // The bound is live: re-evaluated before every iteration.
                while env.get(scope, var) <= self.eval_expression(to, env, scope)? {
                    self.exec_statement(body, env, scope)?;
                    let next = env.get(scope, var).wrapping_add(1);
                    env.set(scope, var, next);
                }
                Ok(())
            }
            Statement::Readln(name) => {
                let value = self.read_int()?;
                env.assign(scope, name, value);
                Ok(())
            }
            Statement::Writeln(value) => {
                let value = self.eval_expression(value, env, scope)?;
                self.output.push(value.to_string());
                Ok(())
            }
        }
    }

    fn eval_expression(
        &mut self,
        expr: &Expression,
        env: &mut Environment,
        scope: ScopeId,
    ) -> Result<i64, InterpreterError> {
        match expr {
            Expression::Number(value) => Ok(*value),
            Expression::Variable(name) => Ok(env.get(scope, name)),
            Expression::BinaryOp { op, left, right } => {
                let left = self.eval_expression(left, env, scope)?;
                let right = self.eval_expression(right, env, scope)?;
                match op {
                    BinaryOperator::Add => Ok(left.wrapping_add(right)),
                    BinaryOperator::Sub => Ok(left.wrapping_sub(right)),
                    BinaryOperator::Mul => Ok(left.wrapping_mul(right)),
                    BinaryOperator::Div => {
                        if right == 0 {
                            return Err(InterpreterError::DivisionByZero);
                        }
                        Ok(left.wrapping_div(right))
                    }
                    BinaryOperator::Mod => {
                        if right == 0 {
                            return Err(InterpreterError::DivisionByZero);
                        }
                        Ok(left.wrapping_rem(right))
                    }
                }
            }
            Expression::Call { name, args } => self.eval_call(name, args, env, scope),
        }
    }

    fn eval_call(
        &mut self,
        name: &str,
        args: &[Expression],
        env: &mut Environment,
        scope: ScopeId,
    ) -> Result<i64, InterpreterError> {
        let decl = env
            .procedure(name)
            .cloned()
            .ok_or_else(|| InterpreterError::UndefinedProcedure {
                name: name.to_string(),
            })?;

        // Arguments evaluate in the calling scope, left to right. Missing
        // trailing arguments bind 0; extra arguments are never evaluated.
        let mut values = Vec::with_capacity(decl.params.len());
        for (index, _) in decl.params.iter().enumerate() {
            let value = match args.get(index) {
                Some(arg) => self.eval_expression(arg, env, scope)?,
                None => 0,
            };
            values.push(value);
        }

        let call_scope = env.push_child(scope);
        for (param, value) in decl.params.iter().zip(values) {
            env.declare(call_scope, param, value);
        }

        self.exec_statement(&decl.body, env, call_scope)?;

        // Pascal-function convention: the return value is whatever got
        // assigned to the procedure's own name, 0 if nothing was.
        Ok(env.get(call_scope, name))
    }

    fn eval_condition(
        &mut self,
        condition: &Condition,
        env: &mut Environment,
        scope: ScopeId,
    ) -> Result<bool, InterpreterError> {
        let left = self.eval_expression(&condition.left, env, scope)?;
        let right = self.eval_expression(&condition.right, env, scope)?;
        Ok(match condition.op {
            RelationalOperator::Equal => left == right,
            RelationalOperator::NotEqual => left != right,
            RelationalOperator::Less => left < right,
            RelationalOperator::Greater => left > right,
            RelationalOperator::LessEqual => left <= right,
            RelationalOperator::GreaterEqual => left >= right,
        })
    }

    /// Blocks until one whitespace-delimited integer is available.
    fn read_int(&mut self) -> Result<i64, InterpreterError> {
        loop {
            if let Some(token) = self.pending_input.pop_front() {
                return token
                    .parse::<i64>()
                    .map_err(|_| InterpreterError::InvalidInput { token });
            }
            let mut line = String::new();
            let read = self
                .input
                .read_line(&mut line)
                .map_err(|error| InterpreterError::Input {
                    message: error.to_string(),
                })?;
            if read == 0 {
                return Err(InterpreterError::InputExhausted);
            }
            self.pending_input
                .extend(line.split_whitespace().map(str::to_string));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use indoc::indoc;
    use std::io::Cursor;

    fn run(source: &str) -> Result<String, InterpreterError> {
        let program = parse(source).expect("parse failed");
        Interpreter::new().run(&program)
    }

    fn run_with_input(source: &str, input: &str) -> Result<String, InterpreterError> {
        let program = parse(source).expect("parse failed");
        let mut interpreter = Interpreter::with_input(Box::new(Cursor::new(input.to_string())));
        interpreter.run(&program)
    }

    #[test]
    fn evaluates_arithmetic_with_precedence() {
        assert_eq!(run("WRITELN(3+4*2); .").unwrap(), "11");
    }

    #[test]
    fn evaluates_modulo() {
        assert_eq!(run("VAR x; x := 5; WRITELN(x mod 3); .").unwrap(), "2");
    }

    #[test]
    fn division_truncates_toward_zero() {
        assert_eq!(run("WRITELN(-7 / 2); .").unwrap(), "-3");
        assert_eq!(run("WRITELN(-7 mod 2); .").unwrap(), "-1");
    }

    #[test]
    fn if_else_takes_else_branch() {
        assert_eq!(run("IF 1 = 2 THEN WRITELN(1); ELSE WRITELN(2); .").unwrap(), "2");
    }

    #[test]
    fn while_loop_counts() {
        let source = indoc! {"
            VAR x;
            x := 0;
            WHILE x < 3 DO
            BEGIN
                WRITELN(x);
                x := x + 1;
            END;
            .
        "};
        assert_eq!(run(source).unwrap(), "0\n1\n2");
    }

    #[test]
    fn for_bound_is_reevaluated_each_iteration() {
        let source = indoc! {"
            VAR n, hits;
            n := 5;
            hits := 0;
            FOR i := 1 TO n DO
            BEGIN
                hits := hits + 1;
                n := 0;
            END;
            WRITELN(hits);
            .
        "};
        // Zeroing the bound inside the body ends the loop after one pass.
        assert_eq!(run(source).unwrap(), "1");
    }

    #[test]
    fn for_range_is_inclusive() {
        let source = indoc! {"
            VAR total;
            total := 0;
            FOR i := 1 TO 4 DO total := total + i;
            WRITELN(total);
            .
        "};
        assert_eq!(run(source).unwrap(), "10");
    }

    #[test]
    fn undeclared_variable_reads_as_zero() {
        assert_eq!(run("WRITELN(nothing); .").unwrap(), "0");
    }

    #[test]
    fn procedure_returns_via_its_own_name() {
        let source = indoc! {"
            PROCEDURE double(x);
            double := x * 2;
            WRITELN(double(21));
            .
        "};
        assert_eq!(run(source).unwrap(), "42");
    }

    #[test]
    fn procedure_without_self_assignment_returns_zero() {
        let source = indoc! {"
            VAR y;
            PROCEDURE noop(x);
            y := x;
            WRITELN(noop(9));
            .
        "};
        assert_eq!(run(source).unwrap(), "0");
    }

    #[test]
    fn missing_trailing_argument_binds_zero() {
        let source = indoc! {"
            PROCEDURE sub(a, b);
            sub := a - b;
            WRITELN(sub(7));
            .
        "};
        assert_eq!(run(source).unwrap(), "7");
    }

    #[test]
    fn extra_arguments_are_ignored() {
        let source = indoc! {"
            PROCEDURE first(a);
            first := a;
            WRITELN(first(1, 2, 3));
            .
        "};
        assert_eq!(run(source).unwrap(), "1");
    }

    #[test]
    fn procedure_assignment_mutates_enclosing_global() {
        let source = indoc! {"
            VAR count, ignore;
            PROCEDURE bump();
            count := count + 1;
            count := 10;
            ignore := bump();
            WRITELN(count);
            .
        "};
        assert_eq!(run(source).unwrap(), "11");
    }

    #[test]
    fn parameter_shadows_global_of_same_name() {
        let source = indoc! {"
            VAR n;
            PROCEDURE shadow(n);
            n := 99;
            n := 5;
            ignore := shadow(1);
            WRITELN(n);
            .
        "};
        assert_eq!(run(source).unwrap(), "5");
    }

    #[test]
    fn run_in_exposes_final_globals() {
        let program = parse("VAR x; x := 5; x := x + 1; .").expect("parse failed");
        let mut env = Environment::new();
        Interpreter::new().run_in(&program, &mut env).unwrap();
        assert_eq!(env.get(ScopeId::ROOT, "x"), 6);
    }

    #[test]
    fn readln_assigns_one_integer() {
        assert_eq!(
            run_with_input("VAR x; READLN(x); WRITELN(x+1); .", "41\n").unwrap(),
            "42"
        );
    }

    #[test]
    fn readln_splits_whitespace_delimited_integers() {
        let source = "VAR a, b; READLN(a); READLN(b); WRITELN(a*b); .";
        assert_eq!(run_with_input(source, "6 7\n").unwrap(), "42");
    }

    #[test]
    fn readln_on_exhausted_input_fails() {
        let err = run("VAR x; READLN(x); .").expect_err("expected input failure");
        assert_eq!(err, InterpreterError::InputExhausted);
    }

    #[test]
    fn readln_on_non_integer_fails() {
        let err =
            run_with_input("VAR x; READLN(x); .", "oops\n").expect_err("expected input failure");
        assert!(matches!(err, InterpreterError::InvalidInput { .. }));
    }

    #[test]
    fn division_by_zero_is_fatal() {
        assert_eq!(run("WRITELN(1/0); .").unwrap_err(), InterpreterError::DivisionByZero);
        assert_eq!(
            run("WRITELN(1 mod 0); .").unwrap_err(),
            InterpreterError::DivisionByZero
        );
    }

    #[test]
    fn fault_stops_later_statements() {
        let source = "WRITELN(1); WRITELN(1/0); WRITELN(2); .";
        let program = parse(source).expect("parse failed");
        let mut interpreter = Interpreter::new();
        assert_eq!(
            interpreter.run(&program).unwrap_err(),
            InterpreterError::DivisionByZero
        );
    }

    #[test]
    fn undefined_procedure_call_is_fatal() {
        let err = run("x := ghost(); .").expect_err("expected undefined procedure");
        assert_eq!(
            err,
            InterpreterError::UndefinedProcedure {
                name: "ghost".to_string()
            }
        );
    }
}
