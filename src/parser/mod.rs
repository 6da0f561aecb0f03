//! Parser for the template configuration document

pub mod ast;
mod grammar;
pub mod lexer;
mod validate;

pub use ast::*;
pub use grammar::parse;
pub use validate::{validate, ValidationError};
