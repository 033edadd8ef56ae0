pub mod builtins;
pub mod cmdline;
pub mod environment;
pub mod errors;
pub mod evaluator;
pub mod interpreter;
pub mod reader;
pub mod types;

#[macro_use]
extern crate lazy_static;

mod printer;
mod tokens;

pub use builtins::load_builtins;
pub use evaluator::eval;
pub use types::{Kind, LispObject, Location};
