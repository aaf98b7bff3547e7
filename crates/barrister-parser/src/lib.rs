#![doc = include_str!("../README.md")]

mod checksum;
mod error;
pub mod idl;
mod lexer;
mod parser;
mod validation;

pub use crate::checksum::checksum;
pub use crate::error::IdlErrors;
pub use crate::error::ParseError;
pub use crate::idl::Document;
pub use crate::idl::Entity;
pub use crate::lexer::Lexer;
pub use crate::lexer::Token;
pub use crate::lexer::TokenKind;
pub use crate::parser::parse;
pub use crate::parser::Parser;
