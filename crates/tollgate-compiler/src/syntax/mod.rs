//! Front end: tokens, lexer, syntax tree and parser.

pub mod ast;
mod lexer;
mod parser;
pub mod token;

pub use ast::*;
pub use lexer::{strip_trivia, tokenize, LexError};
pub use parser::parse;
