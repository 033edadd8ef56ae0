use crate::types::{Cell, Closure, Kind, LispObject};
use itertools::Itertools;
use std::fmt;

impl fmt::Display for LispObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Nil => write!(f, "nil"),
            Kind::True => write!(f, "t"),
            Kind::Symbol(name) => write!(f, "{}", name),
            Kind::Integer(value) => write!(f, "{}", value),
            Kind::Cell(cell) => write_list(f, cell),
            Kind::Function(closure) => write!(f, "#<function {}>", closure),
            Kind::Macro(closure) => write!(f, "#<macro {}>", closure),
            Kind::Native(op) => write!(f, "#<builtin {}>", op.name),
            Kind::Error(e) => write!(f, "#<error {}>", e),
        }
    }
}

// Iterative, so that long lists don't recurse once per element.
fn write_list(f: &mut fmt::Formatter<'_>, cell: &Cell) -> fmt::Result {
    write!(f, "({}", cell.first)?;
    let mut rest = &cell.rest;
    loop {
        match &rest.kind {
            Kind::Nil => break,
            Kind::Cell(next) => {
                write!(f, " {}", next.first)?;
                rest = &next.rest;
            }
            _ => {
                write!(f, " . {}", rest)?;
                break;
            }
        }
    }
    write!(f, ")")
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.parameters.iter().join(" "))
    }
}
