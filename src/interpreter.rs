use crate::environment::Environment;
use crate::types::LispObject;
use crate::{errors, evaluator, reader};
use std::fmt;
use std::fs::read_to_string;
use std::path::Path;
use std::rc::Rc;

#[derive(Debug)]
pub enum Error {
    Read(reader::Error),
    Eval(errors::Error),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Read(e) => write!(f, "read error: {}", e),
            Error::Eval(e) => write!(f, "{}", e),
            Error::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<reader::Error> for Error {
    fn from(e: reader::Error) -> Self {
        Self::Read(e)
    }
}

impl From<errors::Error> for Error {
    fn from(e: errors::Error) -> Self {
        Self::Eval(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

pub type Result<T = LispObject> = std::result::Result<T, Error>;

/// Evaluates `forms` in order, stopping at the first error. Returns the last
/// value, or `None` if there were no forms.
pub fn eval_all(forms: &[LispObject], env: &Rc<Environment>) -> Result<Option<LispObject>> {
    let mut last = None;
    for form in forms {
        let value = evaluator::eval(env, form);
        if let Some(e) = value.as_error() {
            return Err(Error::Eval(e.clone()));
        }
        last = Some(value);
    }
    Ok(last)
}

/// Read, evaluate and print everything on one line of input.
pub fn rep(line: &str, env: &Rc<Environment>) -> Result<String> {
    let forms = reader::read_all(line)?;
    let last = eval_all(&forms, env)?;
    Ok(last.map(|value| value.to_string()).unwrap_or_default())
}

pub fn load_file<P: AsRef<Path>>(path: P, env: &Rc<Environment>) -> Result<Option<LispObject>> {
    log::debug!("load {}", path.as_ref().display());
    let source = read_to_string(path)?;
    let forms = reader::read_all(&source)?;
    eval_all(&forms, env)
}
