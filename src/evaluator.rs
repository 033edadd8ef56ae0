use crate::environment::Environment;
use crate::errors::{Error, ErrorKind};
use crate::types::{Arity, Closure, Kind, LispObject, Location, NativeOperator};

use std::rc::Rc;

pub type Result<T = LispObject> = std::result::Result<T, Error>;

/// The entry point for drivers: evaluates `expr` in `env`, and hands back any
/// failure as an `Error` value rather than an `Err`.
pub fn eval(env: &Rc<Environment>, expr: &LispObject) -> LispObject {
    evaluate(expr, env).unwrap_or_else(LispObject::error)
}

pub fn evaluate(expr: &LispObject, env: &Rc<Environment>) -> Result {
    match &expr.kind {
        Kind::Symbol(s) => env
            .fetch(s)
            .ok_or_else(|| Error::new(ErrorKind::UnboundSymbol(s.clone()), expr.loc)),
        Kind::Cell(cell) => {
            let operator = evaluate(&cell.first, env)?;
            apply(&operator, &cell.rest, env, cell.first.loc)
        }
        // An error value is raised again wherever it is evaluated, so it
        // short-circuits any enclosing sequence.
        Kind::Error(e) => Err((**e).clone()),
        Kind::Nil
        | Kind::True
        | Kind::Integer(_)
        | Kind::Function(_)
        | Kind::Macro(_)
        | Kind::Native(_) => Ok(expr.clone()),
    }
}

/// Applies `operator` to the unevaluated `args`. `site` is where the operator
/// appeared, for diagnostics.
pub fn apply(
    operator: &LispObject,
    args: &LispObject,
    env: &Rc<Environment>,
    site: Location,
) -> Result {
    match &operator.kind {
        Kind::Native(op) => call_native(op, args, env, site),
        Kind::Function(f) => {
            let values = eval_list(env, args)?;
            let frame = bind_parameters(f, "function", &values, site)?;
            log::trace!("call function at {} with {}", site, values);
            progn(&frame, &f.body)
        }
        Kind::Macro(m) => {
            let frame = bind_parameters(m, "macro", args, site)?;
            let expansion = progn(&frame, &m.body)?;
            log::trace!("macro at {} expanded to {}", site, expansion);
            evaluate(&expansion, env)
        }
        Kind::Nil
        | Kind::True
        | Kind::Symbol(_)
        | Kind::Integer(_)
        | Kind::Cell(_)
        | Kind::Error(_) => Err(Error::new(
            ErrorKind::NotCallable(operator.type_name()),
            site,
        )),
    }
}

/// Evaluates every element of `list` in order, stopping at the first error.
pub fn eval_list(env: &Rc<Environment>, list: &LispObject) -> Result {
    let mut evaluated = Vec::new();
    let mut end = list.loc;
    for element in list.iter() {
        let element = element?;
        evaluated.push(evaluate(element, env)?);
        end = element.loc;
    }
    Ok(LispObject::from_vec(evaluated, end))
}

/// Evaluates `body` in order and returns the last value.
pub fn progn(env: &Rc<Environment>, body: &LispObject) -> Result {
    let mut last = None;
    for expr in body.iter() {
        last = Some(evaluate(expr?, env)?);
    }
    last.ok_or_else(|| Error::new(ErrorKind::EmptyBody, body.loc))
}

fn call_native(
    op: &NativeOperator,
    args: &LispObject,
    env: &Rc<Environment>,
    site: Location,
) -> Result {
    op.arity.validate_for(args.list_len()?, op.name, site)?;
    log::trace!("call {} with {}", op.name, args);
    let result = (op.fn_ptr)(env, args);
    match &result {
        Ok(val) => log::trace!("call to {} resulted in {}", op.name, val),
        Err(e) => log::trace!("call to {} failed: {}", op.name, e),
    }
    result
}

/// A fresh frame under the closure's captured environment, holding one
/// binding per parameter.
fn bind_parameters(
    closure: &Closure,
    name: &'static str,
    args: &LispObject,
    site: Location,
) -> Result<Rc<Environment>> {
    let args = args.to_vec()?;
    Arity::exactly(closure.parameters.len()).validate_for(args.len(), name, site)?;
    let frame = Environment::spawn_from(&closure.parent);
    for (parameter, value) in closure.parameters.iter().zip(args) {
        frame.add_variable(parameter.clone(), value);
    }
    Ok(frame)
}
