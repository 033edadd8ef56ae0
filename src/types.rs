use crate::environment::Environment;
use crate::errors::{Error, ErrorKind};
use crate::evaluator;
use derive_more::Display;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::fmt::Formatter;
use std::ops::{RangeFrom, RangeInclusive};
use std::rc::Rc;

pub type LispInt = i64;

/// Where a value was read from. Values built by the interpreter itself carry
/// the location of the form that produced them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display)]
#[display(fmt = "{}:{}", line, column)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

thread_local! {
    static SYMBOLS: RefCell<HashSet<Rc<str>>> = RefCell::new(HashSet::new());
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Display)]
#[display(fmt = "{}", _0)]
pub struct LispSymbol(Rc<str>);

impl LispSymbol {
    /// Interns `name`, so every symbol spelled the same way shares one allocation.
    pub fn new(name: &str) -> Self {
        SYMBOLS.with(|symbols| {
            let mut symbols = symbols.borrow_mut();
            if let Some(existing) = symbols.get(name) {
                return LispSymbol(existing.clone());
            }
            let interned: Rc<str> = Rc::from(name);
            symbols.insert(interned.clone());
            LispSymbol(interned)
        })
    }
}

impl AsRef<str> for LispSymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LispSymbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arity {
    Between(RangeInclusive<usize>),
    AtLeast(RangeFrom<usize>),
}

impl Arity {
    pub(crate) const fn exactly(n: usize) -> Self {
        Self::Between(n..=n)
    }

    pub(crate) const fn at_least(n: usize) -> Self {
        Self::AtLeast(n..)
    }

    pub(crate) fn contains(&self, n: usize) -> bool {
        match self {
            Self::Between(range) => range.contains(&n),
            Self::AtLeast(range) => range.contains(&n),
        }
    }

    pub(crate) fn validate_for(
        &self,
        n: usize,
        name: &'static str,
        loc: Location,
    ) -> Result<(), Error> {
        match self.contains(n) {
            true => Ok(()),
            false => Err(Error::new(
                ErrorKind::ArityError {
                    name,
                    expected: self.clone(),
                    got: n,
                },
                loc,
            )),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Between(r) => {
                if r.start() == r.end() {
                    write!(f, "exactly {}", r.start())
                } else {
                    write!(f, "from {} to {}", r.start(), r.end())
                }
            }
            Arity::AtLeast(r) => write!(f, "at least {}", r.start),
        }
    }
}

/// An operator implemented in Rust. It receives its argument list
/// unevaluated, together with the caller's environment, and decides for
/// itself what to evaluate.
pub type NativeFn = fn(&Rc<Environment>, &LispObject) -> evaluator::Result;

pub struct NativeOperator {
    pub name: &'static str,
    pub arity: Arity,
    pub fn_ptr: NativeFn,
}

impl fmt::Debug for NativeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "builtin #<{}>", self.name)
    }
}

/// The shared layout of functions and macros.
pub struct Closure {
    pub parameters: Vec<LispSymbol>,
    pub body: LispObject,
    pub parent: Rc<Environment>,
}

impl fmt::Debug for Closure {
    // Not derived because we want to skip the parent: the parent may well contain this Closure!
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Closure{{parameters: {:?}, body: {}}}",
            self.parameters, self.body
        )
    }
}

#[derive(Debug)]
pub struct Cell {
    pub first: LispObject,
    pub rest: LispObject,
}

// The derived drop would recurse once per link of a long list. Unlink the
// `rest` chain in a loop instead, stopping at the first cell still shared.
impl Drop for Cell {
    fn drop(&mut self) {
        let mut rest = std::mem::replace(&mut self.rest.kind, Kind::Nil);
        while let Kind::Cell(cell) = rest {
            match Rc::try_unwrap(cell) {
                Ok(mut cell) => rest = std::mem::replace(&mut cell.rest.kind, Kind::Nil),
                Err(_) => break,
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Kind {
    Nil,
    True,
    Symbol(LispSymbol),
    Integer(LispInt),
    Cell(Rc<Cell>),
    Function(Rc<Closure>),
    Macro(Rc<Closure>),
    Native(&'static NativeOperator),
    Error(Rc<Error>),
}

impl Kind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Kind::Nil => "nil",
            Kind::True => "true",
            Kind::Symbol(_) => "symbol",
            Kind::Integer(_) => "integer",
            Kind::Cell(_) => "cell",
            Kind::Function(_) => "function",
            Kind::Macro(_) => "macro",
            Kind::Native(_) => "builtin",
            Kind::Error(_) => "error",
        }
    }
}

/// "a" or "an", depending on how `noun` starts.
pub(crate) fn article(noun: &str) -> &'static str {
    match noun.chars().next() {
        Some('a') | Some('e') | Some('i') | Some('o') | Some('u') => "an",
        _ => "a",
    }
}

#[derive(Debug, Clone)]
pub struct LispObject {
    pub kind: Kind,
    pub loc: Location,
}

impl LispObject {
    pub fn new(kind: Kind, loc: Location) -> Self {
        Self { kind, loc }
    }

    pub fn nil(loc: Location) -> Self {
        Self::new(Kind::Nil, loc)
    }

    pub fn truth(loc: Location) -> Self {
        Self::new(Kind::True, loc)
    }

    pub fn boolean(value: bool, loc: Location) -> Self {
        match value {
            true => Self::truth(loc),
            false => Self::nil(loc),
        }
    }

    pub fn symbol(name: &str, loc: Location) -> Self {
        Self::new(Kind::Symbol(LispSymbol::new(name)), loc)
    }

    pub fn integer(value: LispInt, loc: Location) -> Self {
        Self::new(Kind::Integer(value), loc)
    }

    pub fn cell(first: LispObject, rest: LispObject, loc: Location) -> Self {
        Self::new(Kind::Cell(Rc::new(Cell { first, rest })), loc)
    }

    /// A cell stamped with the location of its first element.
    pub fn cons(first: LispObject, rest: LispObject) -> Self {
        let loc = first.loc;
        Self::cell(first, rest, loc)
    }

    pub fn error(error: Error) -> Self {
        let loc = error.loc;
        Self::new(Kind::Error(Rc::new(error)), loc)
    }

    /// Builds a right-associated list from `elements`, terminated by a `Nil`
    /// stamped with `end`.
    pub fn from_vec(elements: Vec<LispObject>, end: Location) -> Self {
        elements
            .into_iter()
            .rev()
            .fold(Self::nil(end), |rest, first| Self::cons(first, rest))
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.kind, Kind::Nil)
    }

    pub fn is_true(&self) -> bool {
        matches!(self.kind, Kind::True)
    }

    pub fn as_symbol(&self) -> Option<&LispSymbol> {
        match &self.kind {
            Kind::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<LispInt> {
        match self.kind {
            Kind::Integer(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_cell(&self) -> Option<&Cell> {
        match &self.kind {
            Kind::Cell(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&Error> {
        match &self.kind {
            Kind::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn iter(&self) -> ListIter<'_> {
        ListIter {
            next: Some(self),
        }
    }

    /// Whether following `rest` from here eventually reaches `Nil`.
    pub fn is_list(&self) -> bool {
        self.iter().all(|element| element.is_ok())
    }

    pub fn list_len(&self) -> Result<usize, Error> {
        self.iter().try_fold(0, |n, element| element.map(|_| n + 1))
    }

    pub fn to_vec(&self) -> Result<Vec<LispObject>, Error> {
        self.iter()
            .map(|element| element.map(LispObject::clone))
            .collect()
    }
}

/// Walks the `first` slots of a chain of cells. Yields an `ImproperList`
/// error, and then stops, if the chain ends in anything but `Nil`.
pub struct ListIter<'a> {
    next: Option<&'a LispObject>,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = Result<&'a LispObject, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        match &current.kind {
            Kind::Nil => None,
            Kind::Cell(cell) => {
                self.next = Some(&cell.rest);
                Some(Ok(&cell.first))
            }
            other => Some(Err(Error::new(
                ErrorKind::ImproperList(other.type_name()),
                current.loc,
            ))),
        }
    }
}

// Locations are diagnostics only and take no part in equality.
impl PartialEq for LispObject {
    fn eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (Kind::Nil, Kind::Nil) | (Kind::True, Kind::True) => true,
            (Kind::Symbol(x), Kind::Symbol(y)) => x == y,
            (Kind::Integer(x), Kind::Integer(y)) => x == y,
            (Kind::Cell(x), Kind::Cell(y)) => cells_eq(x, y),
            (Kind::Function(x), Kind::Function(y)) | (Kind::Macro(x), Kind::Macro(y)) => {
                Rc::ptr_eq(x, y)
            }
            (Kind::Native(x), Kind::Native(y)) => std::ptr::eq(*x, *y),
            (Kind::Error(x), Kind::Error(y)) => x == y,
            (_, _) => false,
        }
    }
}

/// Compares two chains of cells, looping down `rest` rather than recursing.
fn cells_eq(mut x: &Cell, mut y: &Cell) -> bool {
    loop {
        if std::ptr::eq(x, y) {
            return true;
        }
        if x.first != y.first {
            return false;
        }
        match (&x.rest.kind, &y.rest.kind) {
            (Kind::Cell(next_x), Kind::Cell(next_y)) => {
                x = next_x;
                y = next_y;
            }
            _ => return x.rest == y.rest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: usize, column: usize) -> Location {
        Location::new(line, column)
    }

    #[test]
    fn symbols_are_interned() {
        let a = LispSymbol::new("alpha");
        let b = LispSymbol::from("alpha");
        assert!(Rc::ptr_eq(&a.0, &b.0));
        assert_ne!(a, LispSymbol::new("beta"));
    }

    #[test]
    fn from_vec_builds_right_associated_list() {
        let list = LispObject::from_vec(
            vec![
                LispObject::integer(1, at(1, 2)),
                LispObject::integer(2, at(1, 4)),
            ],
            at(1, 5),
        );
        let expected = LispObject::cons(
            LispObject::integer(1, at(9, 9)),
            LispObject::cons(LispObject::integer(2, at(9, 9)), LispObject::nil(at(9, 9))),
        );
        assert_eq!(list, expected);
        assert_eq!(list.loc, at(1, 2));
        assert_eq!(list.list_len().unwrap(), 2);
    }

    #[test]
    fn improper_list_is_detected() {
        let pair = LispObject::cons(
            LispObject::symbol("a", at(1, 1)),
            LispObject::symbol("b", at(1, 5)),
        );
        assert!(!pair.is_list());
        let error = pair.to_vec().unwrap_err();
        assert_eq!(error.kind, ErrorKind::ImproperList("symbol"));
        assert_eq!(error.loc, at(1, 5));
        assert!(LispObject::nil(at(1, 1)).is_list());
    }

    #[test]
    fn articles_follow_vowels() {
        assert_eq!(article("integer"), "an");
        assert_eq!(article("error"), "an");
        assert_eq!(article("symbol"), "a");
        assert_eq!(article("cell"), "a");
    }

    #[test]
    fn arity_reports_the_operator() {
        let error = Arity::exactly(1)
            .validate_for(3, "car", at(2, 1))
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "2:1: `car' expected exactly 1 arguments, but received 3"
        );
        assert!(Arity::at_least(0).validate_for(0, "+", at(1, 1)).is_ok());
    }

    #[test]
    fn long_lists_compare_and_drop_without_recursing() {
        let build = |n: LispInt| {
            (0..n).fold(LispObject::nil(at(1, 1)), |rest, i| {
                LispObject::cons(LispObject::integer(i, at(1, 1)), rest)
            })
        };
        let a = build(300_000);
        let b = build(300_000);
        assert_eq!(a, b);
        assert_ne!(a, build(299_999));
        let shared = a.clone();
        drop(a);
        assert_eq!(shared.list_len().unwrap(), 300_000);
        drop(shared);
        drop(b);
    }
}
