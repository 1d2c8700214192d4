//! jslox: an embeddable tree‑walking interpreter for a small, dynamically
//! typed, C‑like scripting language.
//!
//! Text flows one way: [`scanner`] → [`parser`] → [`interpreter`], with
//! [`environment`] holding the scope chain.  Hosts normally only need
//! [`Interpreter::run`].

pub mod ast;
pub mod ast_printer;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod scanner;
mod stack;
pub mod token;
pub mod value;

pub use error::{LoxError, Result};
pub use interpreter::{Interpreter, RunReport};
pub use value::Value;
