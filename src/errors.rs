use crate::types::{article, Arity, LispSymbol, Location};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    UnboundSymbol(LispSymbol),
    NotCallable(&'static str),
    MalformedFunction(&'static str),
    NonSymbolParameter(&'static str),
    TypeError {
        operator: &'static str,
        expected: &'static str,
        got: &'static str,
    },
    ArityError {
        name: &'static str,
        expected: Arity,
        got: usize,
    },
    DivisionByZero,
    EmptyBody,
    ImproperList(&'static str),
    // io::Error isn't Clone, and errors are values that get copied around.
    Io(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnboundSymbol(s) => write!(f, "unbound symbol `{}'", s),
            ErrorKind::NotCallable(type_name) => write!(
                f,
                "cannot apply {} {}: only functions, macros and builtins can be called",
                article(type_name),
                type_name
            ),
            ErrorKind::MalformedFunction(reason) => {
                write!(f, "malformed function definition: {}", reason)
            }
            ErrorKind::NonSymbolParameter(type_name) => write!(
                f,
                "parameter name must be a symbol (this is {} {})",
                article(type_name),
                type_name
            ),
            ErrorKind::TypeError {
                operator,
                expected,
                got,
            } => write!(
                f,
                "builtin `{}' takes only {} arguments (got `{}')",
                operator, expected, got
            ),
            ErrorKind::ArityError {
                name,
                expected,
                got,
            } => write!(
                f,
                "`{}' expected {} arguments, but received {}",
                name, expected, got
            ),
            ErrorKind::DivisionByZero => write!(f, "cannot divide by zero"),
            ErrorKind::EmptyBody => write!(f, "nothing to evaluate in an empty body"),
            ErrorKind::ImproperList(type_name) => write!(
                f,
                "expected a list, but it ends in {} {}",
                article(type_name),
                type_name
            ),
            ErrorKind::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

/// A failure, together with the location of the expression that caused it.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub kind: ErrorKind,
    pub loc: Location,
}

impl Error {
    pub fn new(kind: ErrorKind, loc: Location) -> Self {
        Self { kind, loc }
    }

    pub(crate) fn io(e: std::io::Error, loc: Location) -> Self {
        Self::new(ErrorKind::Io(e.to_string()), loc)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.loc, self.kind)
    }
}

impl std::error::Error for Error {}
