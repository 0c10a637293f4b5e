use anyhow::{Result, bail};

use crate::ast::{
    BinaryOperator, Condition, Expression, ProcedureDecl, Program, RelationalOperator, Statement,
};
use crate::lexer::Lexer;
use crate::token::Token;

/// Recursive-descent parser pulling tokens from the lexer on demand.
/// A token mismatch is fatal; there is no resynchronization.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// Program := (VAR group)* Procedure* Statement*
    pub fn parse_program(mut self) -> Result<Program> {
        let mut globals = Vec::new();
        while self.current == Token::Var {
            self.parse_var_group(&mut globals)?;
        }

        let mut procedures = Vec::new();
        while self.current == Token::Procedure {
            procedures.push(self.parse_procedure()?);
        }

        let mut statements = Vec::new();
        while self.current != Token::Eof {
            statements.push(self.parse_statement()?);
        }

        Ok(Program {
            procedures,
            statements,
            globals,
        })
    }

    /// VAR name (',' name)* ';' — the trailing semicolon is tolerated missing.
    fn parse_var_group(&mut self, names: &mut Vec<String>) -> Result<()> {
        self.expect(Token::Var)?;
        names.push(self.expect_identifier()?);
        while self.current == Token::Comma {
            self.advance()?;
            names.push(self.expect_identifier()?);
        }
        if self.current == Token::Semicolon {
            self.advance()?;
        }
        Ok(())
    }

    fn parse_procedure(&mut self) -> Result<ProcedureDecl> {
        self.expect(Token::Procedure)?;
        let name = self.expect_identifier()?;

        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        if self.current != Token::RParen {
            params.push(self.expect_identifier()?);
            while self.current != Token::RParen {
                self.expect(Token::Comma)?;
                params.push(self.expect_identifier()?);
            }
        }
        self.expect(Token::RParen)?;
        self.expect(Token::Semicolon)?;

        let mut locals = Vec::new();
        while self.current == Token::Var {
            self.parse_var_group(&mut locals)?;
        }

        let body = Box::new(self.parse_statement()?);
        Ok(ProcedureDecl {
            name,
            params,
            locals,
            body,
        })
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current {
            Token::Writeln => {
                self.advance()?;
                self.expect(Token::LParen)?;
                let value = self.parse_expression()?;
                self.expect(Token::RParen)?;
                self.expect(Token::Semicolon)?;
                Ok(Statement::Writeln(value))
            }
            Token::Readln => {
                self.advance()?;
                self.expect(Token::LParen)?;
                let name = self.expect_identifier()?;
                self.expect(Token::RParen)?;
                self.expect(Token::Semicolon)?;
                Ok(Statement::Readln(name))
            }
            Token::Begin => {
                self.advance()?;
                let mut statements = Vec::new();
                while self.current != Token::End {
                    statements.push(self.parse_statement()?);
                }
                self.expect(Token::End)?;
                self.expect(Token::Semicolon)?;
                Ok(Statement::Block(statements))
            }
            Token::If => {
                self.advance()?;
                let condition = self.parse_condition()?;
                self.expect(Token::Then)?;
                let then_branch = Box::new(self.parse_statement()?);
                let else_branch = if self.current == Token::Else {
                    self.advance()?;
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                Ok(Statement::If {
                    condition,
                    then_branch,
                    else_branch,
                })
            }
            Token::While => {
                self.advance()?;
                let condition = self.parse_condition()?;
                self.expect(Token::Do)?;
                let body = Box::new(self.parse_statement()?);
                Ok(Statement::While { condition, body })
            }
            Token::For => {
                self.advance()?;
                let var = self.expect_identifier()?;
                self.expect(Token::Assign)?;
                let from = self.parse_expression()?;
                self.expect(Token::To)?;
                let to = self.parse_expression()?;
                self.expect(Token::Do)?;
                let body = Box::new(self.parse_statement()?);
                Ok(Statement::For {
                    var,
                    from,
                    to,
                    body,
                })
            }
            _ => {
                let name = self.expect_identifier()?;
                self.expect(Token::Assign)?;
                let value = self.parse_expression()?;
                self.expect(Token::Semicolon)?;
                Ok(Statement::Assignment { name, value })
            }
        }
    }

    fn parse_condition(&mut self) -> Result<Condition> {
        let left = self.parse_expression()?;
        let op = match self.current {
            Token::Equal => RelationalOperator::Equal,
            Token::NotEqual => RelationalOperator::NotEqual,
            Token::Less => RelationalOperator::Less,
            Token::Greater => RelationalOperator::Greater,
            Token::LessEqual => RelationalOperator::LessEqual,
            Token::GreaterEqual => RelationalOperator::GreaterEqual,
            other => bail!("Expected relational operator, got {other:?}"),
        };
        self.advance()?;
        let right = self.parse_expression()?;
        Ok(Condition { left, op, right })
    }

    /// Expr := Term (('+' | '-') Term)*
    fn parse_expression(&mut self) -> Result<Expression> {
        let mut expr = self.parse_term()?;
        loop {
            let op = match self.current {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_term()?;
            expr = Expression::BinaryOp {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    /// Term := Factor (('*' | '/' | 'mod') Factor)*
    fn parse_term(&mut self) -> Result<Expression> {
        let mut expr = self.parse_factor()?;
        loop {
            let op = match self.current {
                Token::Star => BinaryOperator::Mul,
                Token::Slash => BinaryOperator::Div,
                Token::Mod => BinaryOperator::Mod,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_factor()?;
            expr = Expression::BinaryOp {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expression> {
        match self.current {
            Token::LParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::Minus => {
                // Unary minus desugars to 0 - factor.
                self.advance()?;
                let operand = self.parse_factor()?;
                Ok(Expression::BinaryOp {
                    op: BinaryOperator::Sub,
                    left: Box::new(Expression::Number(0)),
                    right: Box::new(operand),
                })
            }
            Token::Integer(value) => {
                self.advance()?;
                Ok(Expression::Number(value))
            }
            Token::Identifier(name) => {
                let name = name.to_string();
                self.advance()?;
                if self.current == Token::LParen {
                    self.advance()?;
                    let mut args = Vec::new();
                    if self.current != Token::RParen {
                        args.push(self.parse_expression()?);
                        while self.current != Token::RParen {
                            self.expect(Token::Comma)?;
                            args.push(self.parse_expression()?);
                        }
                    }
                    self.expect(Token::RParen)?;
                    Ok(Expression::Call { name, args })
                } else {
                    Ok(Expression::Variable(name))
                }
            }
            other => bail!("Expected expression, got {other:?}"),
        }
    }

    fn expect(&mut self, expected: Token<'a>) -> Result<()> {
        if self.current == expected {
            self.advance()?;
            Ok(())
        } else {
            bail!("Expected {expected:?}, got {:?}", self.current)
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        if let Token::Identifier(name) = self.current {
            let name = name.to_string();
            self.advance()?;
            Ok(name)
        } else {
            bail!("Expected identifier, got {:?}", self.current)
        }
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }
}

pub fn parse(input: &str) -> Result<Program> {
    Parser::new(input)?.parse_program()
}
