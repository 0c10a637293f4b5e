pub mod ast;
pub mod codegen;
pub mod emitter;
pub mod env;
pub mod fixtures;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod token;
