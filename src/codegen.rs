use std::collections::HashSet;

use thiserror::Error;

use crate::ast::{
    BinaryOperator, Condition, Expression, ProcedureDecl, Program, RelationalOperator, Statement,
};
use crate::emitter::Emitter;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("{construct} statements are not supported by the MIPS generator")]
    Unsupported { construct: &'static str },
    #[error("Call to undeclared procedure '{name}'")]
    UndefinedProcedure { name: String },
}

/// Translates a program into MIPS assembly text. After every expression the
/// result is in `$v0`; intermediates live on the stack only while the right
/// operand of an in-progress operation is being computed.
pub fn generate(program: &Program) -> Result<Vec<String>, CodegenError> {
    let mut generator = Generator {
        emitter: Emitter::new(),
        procedures: program
            .procedures
            .iter()
            .map(|decl| decl.name.as_str())
            .collect(),
    };
    generator.program(program)?;
    Ok(generator.emitter.into_lines())
}

struct Generator<'p> {
    emitter: Emitter<'p>,
    procedures: HashSet<&'p str>,
}

impl<'p> Generator<'p> {
    /// Data section for globals, the main body, the exit syscall, then one
    /// block per procedure. Procedures are never inlined at call sites.
    fn program(&mut self, program: &'p Program) -> Result<(), CodegenError> {
        self.emitter.emit(".data");
        for name in &program.globals {
            self.emitter.emit(&format!("var{name}:\t.word\t0"));
        }
        self.emitter.emit(".text");
        self.emitter.emit(".globl main");
        self.emitter.emit("main:");

        for statement in &program.statements {
            self.statement(statement)?;
        }

        self.emitter.emit("li $v0 10\t# normal termination");
        self.emitter.emit("syscall");

        for decl in &program.procedures {
            self.procedure(decl)?;
        }
        Ok(())
    }

    fn statement(&mut self, statement: &'p Statement) -> Result<(), CodegenError> {
        match statement {
            Statement::Assignment { name, value } => {
                self.expression(value)?;
                self.store(name);
                Ok(())
            }
            Statement::Block(statements) => {
                for statement in statements {
                    self.statement(statement)?;
                }
                Ok(())
            }
            Statement::If {
                condition,
                then_branch,
                // The generator predates ELSE; a parsed else branch is
                // silently dropped.
                else_branch: _,
            } => {
                let label = format!("endif{}", self.emitter.next_label_id());
                self.condition(condition, &label)?;
                self.statement(then_branch)?;
                self.emitter.emit(&format!("{label}:"));
                Ok(())
            }
            Statement::While { condition, body } => {
                let id = self.emitter.next_label_id();
                self.emitter.emit(&format!("loop{id}:"));
                self.condition(condition, &format!("endLoop{id}"))?;
                self.statement(body)?;
                self.emitter.emit(&format!("j loop{id}"));
                self.emitter.emit(&format!("endLoop{id}:"));
                Ok(())
            }
            Statement::For { .. } => Err(CodegenError::Unsupported { construct: "FOR" }),
            Statement::Readln(_) => Err(CodegenError::Unsupported {
                construct: "READLN",
            }),
            Statement::Writeln(value) => {
                self.expression(value)?;
                self.emitter.emit("move $a0 $v0");
                self.emitter.emit("li $v0 1");
                self.emitter.emit("syscall");
                // Trailing newline.
                self.emitter.emit("li $v0 11");
                self.emitter.emit("li $a0 10");
                self.emitter.emit("syscall");
                Ok(())
            }
        }
    }

    fn expression(&mut self, expr: &'p Expression) -> Result<(), CodegenError> {
        match expr {
            Expression::Number(value) => {
                self.emitter.emit(&format!("li $v0 {value}"));
                Ok(())
            }
            Expression::Variable(name) => {
                self.load(name);
                Ok(())
            }
            Expression::BinaryOp { op, left, right } => {
                self.expression(left)?;
                self.emitter.emit_push("$v0");
                self.expression(right)?;
                self.emitter.emit_pop("$t0");
                match op {
                    BinaryOperator::Add => self.emitter.emit("addu $v0 $t0 $v0"),
                    BinaryOperator::Sub => self.emitter.emit("subu $v0 $t0 $v0"),
                    BinaryOperator::Mul => self.emitter.emit("mul $v0 $t0 $v0"),
                    BinaryOperator::Div => {
                        self.emitter.emit("div $t0 $v0");
                        self.emitter.emit("mflo $v0");
                    }
                    BinaryOperator::Mod => {
                        self.emitter.emit("div $t0 $v0");
                        self.emitter.emit("mfhi $v0");
                    }
                }
                Ok(())
            }
            Expression::Call { name, args } => {
                if !self.procedures.contains(name.as_str()) {
                    return Err(CodegenError::UndefinedProcedure {
                        name: name.to_string(),
                    });
                }
                // Reserve the return-address slot below the arguments.
                self.emitter.emit("subu $sp $sp 4");
                self.emitter.emit("sw $ra ($sp)");
                for arg in args {
                    self.expression(arg)?;
                    self.emitter.emit_push("$v0");
                }
                self.emitter.emit(&format!("jal proc{name}"));
                for _ in args {
                    self.emitter.emit_pop("$t0");
                }
                self.emitter.emit("lw $ra ($sp)");
                self.emitter.emit("addu $sp $sp 4");
                Ok(())
            }
        }
    }

    /// Emits code that branches to `label` when the condition is false:
    /// the branch instruction is the negation of the source operator.
    fn condition(&mut self, condition: &'p Condition, label: &str) -> Result<(), CodegenError> {
        self.expression(&condition.left)?;
        self.emitter.emit_push("$v0");
        self.expression(&condition.right)?;
        self.emitter.emit_pop("$t0");
        let branch = match condition.op {
            RelationalOperator::Equal => "bne",
            RelationalOperator::NotEqual => "beq",
            RelationalOperator::Less => "bge",
            RelationalOperator::Greater => "ble",
            RelationalOperator::LessEqual => "bgt",
            RelationalOperator::GreaterEqual => "blt",
        };
        self.emitter.emit(&format!("{branch} $t0 $v0 {label}"));
        Ok(())
    }

    /// Entry label, zeroed return slot, zeroed locals, body, return. The
    /// return slot is pushed before the context is set so that its offset
    /// is not counted as expression scratch.
    fn procedure(&mut self, decl: &'p ProcedureDecl) -> Result<(), CodegenError> {
        self.emitter.emit(&format!("proc{}:", decl.name));
        self.emitter.emit("li $v0 0");
        self.emitter.emit_push("$v0");
        self.emitter.set_procedure_context(decl);
        for _ in &decl.locals {
            self.emitter.emit_push("$v0");
        }

        self.statement(&decl.body)?;

        self.emitter.emit("jr $ra");
        self.emitter.clear_procedure_context();
        self.emitter.emit_pop("$v0");
        Ok(())
    }

    /// Stores `$v0` into a global memory slot or a stack-frame slot.
    fn store(&mut self, name: &str) {
        if let Some(offset) = self.emitter.frame_offset(name) {
            self.emitter.emit(&format!("addu $sp $sp {offset}"));
            self.emitter.emit("sw $v0 ($sp)");
            self.emitter.emit(&format!("subu $sp $sp {offset}"));
        } else {
            self.emitter.emit(&format!("sw $v0 var{name}"));
        }
    }

    /// Loads `$v0` from a global memory slot or a stack-frame slot.
    fn load(&mut self, name: &str) {
        if let Some(offset) = self.emitter.frame_offset(name) {
            self.emitter.emit(&format!("addu $sp $sp {offset}"));
            self.emitter.emit("lw $v0 ($sp)");
            self.emitter.emit(&format!("subu $sp $sp {offset}"));
        } else {
            self.emitter.emit(&format!("lw $v0 var{name}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use indoc::indoc;

    fn generate_source(source: &str) -> Result<Vec<String>, CodegenError> {
        let program = parse(source).expect("parse failed");
        generate(&program)
    }

    #[test]
    fn generates_arithmetic_program() {
        let lines = generate_source("WRITELN(3+4*2); .").expect("generate failed");
        let expected = vec![
            "\t.data",
            "\t.text",
            "\t.globl main",
            "main:",
            "\tli $v0 3",
            "\tsubu $sp $sp 4",
            "\tsw $v0 ($sp)",
            "\tli $v0 4",
            "\tsubu $sp $sp 4",
            "\tsw $v0 ($sp)",
            "\tli $v0 2",
            "\tlw $t0 ($sp)",
            "\taddu $sp $sp 4",
            "\tmul $v0 $t0 $v0",
            "\tlw $t0 ($sp)",
            "\taddu $sp $sp 4",
            "\taddu $v0 $t0 $v0",
            "\tmove $a0 $v0",
            "\tli $v0 1",
            "\tsyscall",
            "\tli $v0 11",
            "\tli $a0 10",
            "\tsyscall",
            "\tli $v0 10\t# normal termination",
            "\tsyscall",
        ];
        assert_eq!(lines, expected);
    }

    #[test]
    fn declares_globals_in_data_section() {
        let lines = generate_source("VAR x, y; x := 1; .").expect("generate failed");
        assert!(lines.contains(&"\tvarx:\t.word\t0".to_string()));
        assert!(lines.contains(&"\tvary:\t.word\t0".to_string()));
        assert!(lines.contains(&"\tsw $v0 varx".to_string()));
    }

    #[test]
    fn while_loop_brackets_body_with_labels() {
        let source = indoc! {"
            VAR x;
            WHILE x < 3 DO x := x + 1;
            .
        "};
        let lines = generate_source(source).expect("generate failed");
        assert!(lines.contains(&"loop2:".to_string()));
        assert!(lines.contains(&"\tbge $t0 $v0 endLoop2".to_string()));
        assert!(lines.contains(&"\tj loop2".to_string()));
        assert!(lines.contains(&"endLoop2:".to_string()));
    }

    #[test]
    fn condition_branches_on_negated_operator() {
        let lines = generate_source("VAR x; IF x = 1 THEN x := 2; .").expect("generate failed");
        assert!(lines.contains(&"\tbne $t0 $v0 endif2".to_string()));
        assert!(lines.contains(&"endif2:".to_string()));
    }

    #[test]
    fn else_branch_is_dropped() {
        let lines =
            generate_source("IF 1 = 2 THEN WRITELN(7); ELSE WRITELN(9); .").expect("generate failed");
        // Known generator gap: only the then-branch is compiled.
        assert!(lines.contains(&"\tli $v0 7".to_string()));
        assert!(!lines.contains(&"\tli $v0 9".to_string()));
    }

    #[test]
    fn division_and_modulo_share_the_divide() {
        let lines = generate_source("WRITELN(7/2); .").expect("generate failed");
        assert!(lines.contains(&"\tdiv $t0 $v0".to_string()));
        assert!(lines.contains(&"\tmflo $v0".to_string()));

        let lines = generate_source("WRITELN(7 mod 2); .").expect("generate failed");
        assert!(lines.contains(&"\tmfhi $v0".to_string()));
    }

    #[test]
    fn call_wraps_arguments_with_return_address_slot() {
        let source = indoc! {"
            VAR x;
            PROCEDURE id(a);
            id := a;
            x := id(5);
            .
        "};
        let lines = generate_source(source).expect("generate failed");
        let jal = lines
            .iter()
            .position(|line| line == "\tjal procid")
            .expect("missing jal");
        assert_eq!(lines[jal - 3], "\tli $v0 5");
        assert_eq!(lines[jal + 1], "\tlw $t0 ($sp)");
        assert_eq!(lines[jal + 3], "\tlw $ra ($sp)");
        assert_eq!(lines[jal + 4], "\taddu $sp $sp 4");
    }

    #[test]
    fn procedure_emits_frame_and_return() {
        let source = indoc! {"
            VAR x;
            PROCEDURE inc(a);
            VAR t;
            BEGIN
                t := a + 1;
                inc := t;
            END;
            x := inc(1);
            .
        "};
        let lines = generate_source(source).expect("generate failed");
        assert!(lines.contains(&"procinc:".to_string()));
        assert!(lines.contains(&"\tjr $ra".to_string()));
        // Loading parameter `a`: one local already pushed (4) plus the
        // return slot (4), reverse-order param offset 0.
        assert!(lines.contains(&"\taddu $sp $sp 8".to_string()));
        // Storing local `t` at its declaration-order offset.
        assert!(lines.contains(&"\taddu $sp $sp 0".to_string()));
    }

    #[test]
    fn for_statement_is_unsupported() {
        let err = generate_source("FOR i := 1 TO 3 DO x := i; .").expect_err("expected error");
        assert_eq!(err, CodegenError::Unsupported { construct: "FOR" });
    }

    #[test]
    fn readln_is_unsupported() {
        let err = generate_source("VAR x; READLN(x); .").expect_err("expected error");
        assert_eq!(
            err,
            CodegenError::Unsupported {
                construct: "READLN"
            }
        );
    }

    #[test]
    fn undeclared_call_is_rejected() {
        let err = generate_source("x := ghost(); .").expect_err("expected error");
        assert_eq!(
            err,
            CodegenError::UndefinedProcedure {
                name: "ghost".to_string()
            }
        );
    }
}
