mod error;
mod scope;

pub mod diagnostics;
pub mod grammar;
pub mod pattern;
pub mod sml;
pub mod tokenizer;

pub use error::Error;
pub use grammar::{CompiledGrammar, RawGrammar};
pub use scope::Scope;
pub use tokenizer::{Token, Tokenizer};
