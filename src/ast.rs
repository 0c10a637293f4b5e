//! AST for the Pascal subset. Expressions produce an integer value;
//! statements produce effects. Every node supports both tree-walking
//! evaluation (`interpreter`) and MIPS generation (`codegen`).

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(i64),
    Variable(String),
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Procedures are called by name; the parser decides call vs. variable
    /// reference purely by `(` lookahead.
    Call { name: String, args: Vec<Expression> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationalOperator {
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

/// A comparison usable only where a statement consumes it (IF/WHILE);
/// conditions are not expressions in this language.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub left: Expression,
    pub op: RelationalOperator,
    pub right: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assignment {
        name: String,
        value: Expression,
    },
    Block(Vec<Statement>),
    If {
        condition: Condition,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    While {
        condition: Condition,
        body: Box<Statement>,
    },
    /// Inclusive range; the bound is re-evaluated before every iteration and
    /// the loop variable increments by exactly 1 per iteration.
    For {
        var: String,
        from: Expression,
        to: Expression,
        body: Box<Statement>,
    },
    Readln(String),
    Writeln(Expression),
}

/// A procedure "returns" by assigning to its own name inside its call scope;
/// with no such assignment the call yields 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureDecl {
    pub name: String,
    pub params: Vec<String>,
    pub locals: Vec<String>,
    pub body: Box<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub procedures: Vec<ProcedureDecl>,
    pub statements: Vec<Statement>,
    pub globals: Vec<String>,
}
