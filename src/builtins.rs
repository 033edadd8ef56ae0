use crate::environment::Environment;
use crate::errors::{Error, ErrorKind};
use crate::evaluator::{self, eval_list, evaluate, progn};
use crate::types::{
    Arity, Closure, Kind, LispInt, LispObject, LispSymbol, Location, NativeOperator,
};
use std::io::{self, Write};
use std::rc::Rc;

fn type_error(operator: &'static str, expected: &'static str, got: &LispObject) -> Error {
    Error::new(
        ErrorKind::TypeError {
            operator,
            expected,
            got: got.type_name(),
        },
        got.loc,
    )
}

fn expect_int(operator: &'static str, obj: &LispObject) -> evaluator::Result<LispInt> {
    obj.as_int()
        .ok_or_else(|| type_error(operator, "integer", obj))
}

/// First element and remainder of an argument list. Arity has been checked
/// before any operator runs, so this only fails on a shorter list than the
/// operator declared.
fn split<'a>(
    operator: &'static str,
    args: &'a LispObject,
) -> evaluator::Result<(&'a LispObject, &'a LispObject)> {
    args.as_cell()
        .map(|cell| (&cell.first, &cell.rest))
        .ok_or_else(|| type_error(operator, "cell", args))
}

/// Checks `definition`, a (parameters . body) pair, and closes over `env`.
fn make_function(
    env: &Rc<Environment>,
    definition: &LispObject,
    make_macro: bool,
) -> evaluator::Result {
    let (parameters, body) = split("fn", definition)?;
    if !parameters.is_list() || !body.is_list() {
        return Err(Error::new(
            ErrorKind::MalformedFunction("parameters and body must be lists"),
            definition.loc,
        ));
    }
    let extract_symbol = |obj: evaluator::Result<&LispObject>| -> evaluator::Result<LispSymbol> {
        let obj = obj?;
        obj.as_symbol()
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::NonSymbolParameter(obj.type_name()), obj.loc))
    };
    let parameters = parameters
        .iter()
        .map(extract_symbol)
        .collect::<evaluator::Result<Vec<_>>>()?;

    let closure = Rc::new(Closure {
        parameters,
        body: body.clone(),
        parent: env.clone(),
    });
    let kind = match make_macro {
        true => Kind::Macro(closure),
        false => Kind::Function(closure),
    };
    Ok(LispObject::new(kind, body.loc))
}

static FN: NativeOperator = NativeOperator {
    name: "fn",
    arity: Arity::at_least(2),
    fn_ptr: fn_,
};

fn fn_(env: &Rc<Environment>, args: &LispObject) -> evaluator::Result {
    let (name, definition) = split("fn", args)?;
    match name.as_symbol() {
        Some(name) => {
            let function = make_function(env, definition, false)?;
            log::debug!("define {} as {}", name, function);
            env.add_variable(name.clone(), function.clone());
            Ok(function)
        }
        None => make_function(env, args, false),
    }
}

static MACRO: NativeOperator = NativeOperator {
    name: "macro",
    arity: Arity::at_least(1),
    fn_ptr: |env, args| make_function(env, args, true),
};

static IF: NativeOperator = NativeOperator {
    name: "if",
    arity: Arity::at_least(2),
    fn_ptr: if_,
};

fn if_(env: &Rc<Environment>, args: &LispObject) -> evaluator::Result {
    let (condition, branches) = split("if", args)?;
    let (then, otherwise) = split("if", branches)?;
    if evaluate(condition, env)?.is_true() {
        evaluate(then, env)
    } else if otherwise.is_nil() {
        Ok(LispObject::nil(args.loc))
    } else {
        progn(env, otherwise)
    }
}

static WHILE: NativeOperator = NativeOperator {
    name: "while",
    arity: Arity::at_least(1),
    fn_ptr: while_,
};

fn while_(env: &Rc<Environment>, args: &LispObject) -> evaluator::Result {
    let (condition, body) = split("while", args)?;
    let mut result = LispObject::nil(args.loc);
    while evaluate(condition, env)?.is_true() {
        result = progn(env, body)?;
    }
    Ok(result)
}

static PROGN: NativeOperator = NativeOperator {
    name: "progn",
    arity: Arity::at_least(0),
    fn_ptr: |env, args| progn(env, args),
};

static QUOTE: NativeOperator = NativeOperator {
    name: "quote",
    arity: Arity::exactly(1),
    fn_ptr: |_env, args| split("quote", args).map(|(quoted, _)| quoted.clone()),
};

/// Stores the value of `value_expr` under `symbol`: in the nearest existing
/// binding if there is one, otherwise in a new binding in `env`'s own frame.
fn assign(
    operator: &'static str,
    env: &Rc<Environment>,
    symbol: &LispObject,
    value_expr: &LispObject,
) -> evaluator::Result {
    let name = symbol
        .as_symbol()
        .ok_or_else(|| type_error(operator, "symbol", symbol))?;
    let value = evaluate(value_expr, env)?;
    match env.find(name) {
        Some(binding) => {
            log::debug!("set {} to {}", name, value);
            binding.replace(value.clone());
        }
        None => {
            env.add_variable(name.clone(), value.clone());
        }
    }
    Ok(value)
}

static SET: NativeOperator = NativeOperator {
    name: "set",
    arity: Arity::exactly(2),
    fn_ptr: set_,
};

fn set_(env: &Rc<Environment>, args: &LispObject) -> evaluator::Result {
    let (target, rest) = split("set", args)?;
    let (value_expr, _) = split("set", rest)?;
    let symbol = evaluate(target, env)?;
    assign("set", env, &symbol, value_expr)
}

static SETQ: NativeOperator = NativeOperator {
    name: "setq",
    arity: Arity::exactly(2),
    fn_ptr: setq_,
};

fn setq_(env: &Rc<Environment>, args: &LispObject) -> evaluator::Result {
    let (symbol, rest) = split("setq", args)?;
    let (value_expr, _) = split("setq", rest)?;
    assign("setq", env, symbol, value_expr)
}

static CONS: NativeOperator = NativeOperator {
    name: "cons",
    arity: Arity::exactly(2),
    fn_ptr: cons_,
};

fn cons_(env: &Rc<Environment>, args: &LispObject) -> evaluator::Result {
    let (first, rest) = split("cons", args)?;
    let (rest, _) = split("cons", rest)?;
    let first = evaluate(first, env)?;
    let rest = evaluate(rest, env)?;
    Ok(LispObject::cell(first, rest, args.loc))
}

static CAR: NativeOperator = NativeOperator {
    name: "car",
    arity: Arity::exactly(1),
    fn_ptr: |env, args| {
        let pair = evaluate(split("car", args)?.0, env)?;
        pair.as_cell()
            .map(|cell| cell.first.clone())
            .ok_or_else(|| type_error("car", "cell", &pair))
    },
};

static CDR: NativeOperator = NativeOperator {
    name: "cdr",
    arity: Arity::exactly(1),
    fn_ptr: |env, args| {
        let pair = evaluate(split("cdr", args)?.0, env)?;
        pair.as_cell()
            .map(|cell| cell.rest.clone())
            .ok_or_else(|| type_error("cdr", "cell", &pair))
    },
};

/// Writes each of `values` with no separator. A failed write becomes an `Io`
/// error at `loc`, or at the value being written.
fn print_to(
    out: &mut impl Write,
    values: &LispObject,
    newline: bool,
    loc: Location,
) -> evaluator::Result<()> {
    for value in values.iter() {
        let value = value?;
        write!(out, "{}", value).map_err(|e| Error::io(e, value.loc))?;
    }
    if newline {
        writeln!(out).map_err(|e| Error::io(e, loc))?;
    }
    out.flush().map_err(|e| Error::io(e, loc))
}

fn print_internal(env: &Rc<Environment>, args: &LispObject, newline: bool) -> evaluator::Result {
    let values = eval_list(env, args)?;
    let stdout = io::stdout();
    print_to(&mut stdout.lock(), &values, newline, args.loc)?;
    Ok(LispObject::nil(args.loc))
}

static PRINT: NativeOperator = NativeOperator {
    name: "print",
    arity: Arity::at_least(0),
    fn_ptr: |env, args| print_internal(env, args, false),
};

static PRINTLN: NativeOperator = NativeOperator {
    name: "println",
    arity: Arity::at_least(0),
    fn_ptr: |env, args| print_internal(env, args, true),
};

/// Folds the evaluated arguments left to right, seeded with the first one.
/// `step` returns `None` only for a zero divisor.
fn arithmetic_(
    env: &Rc<Environment>,
    args: &LispObject,
    name: &'static str,
    step: fn(LispInt, LispInt) -> Option<LispInt>,
) -> evaluator::Result {
    let values = eval_list(env, args)?;
    let mut accumulator = None;
    for value in values.iter() {
        let value = value?;
        let x = expect_int(name, value)?;
        accumulator = match accumulator {
            None => Some(x),
            Some(acc) => Some(
                step(acc, x).ok_or_else(|| Error::new(ErrorKind::DivisionByZero, value.loc))?,
            ),
        };
    }
    Ok(LispObject::integer(accumulator.unwrap_or(0), args.loc))
}

macro_rules! arithmetic_primitive {
    ($SYMBOL:tt, $NAME:ident, $step:expr) => {
        paste::item! {
            static $NAME: NativeOperator = NativeOperator {
                name: stringify!($SYMBOL),
                arity: Arity::at_least(0),
                fn_ptr: [<$NAME:lower _>],
            };

            fn [<$NAME:lower _>](env: &Rc<Environment>, args: &LispObject) -> evaluator::Result {
                arithmetic_(env, args, stringify!($SYMBOL), $step)
            }
        }
    };
}

arithmetic_primitive!(+, ADD, |x: LispInt, y| Some(x.wrapping_add(y)));
arithmetic_primitive!(-, SUB, |x: LispInt, y| Some(x.wrapping_sub(y)));
arithmetic_primitive!(*, MUL, |x: LispInt, y| Some(x.wrapping_mul(y)));
arithmetic_primitive!(/, DIV, |x: LispInt, y| match y {
    0 => None,
    _ => Some(x.wrapping_div(y)),
});

/// Checks every later argument against the first one only. The scan stops at
/// the first failure, so arguments after it are not type checked.
fn comparison_(
    env: &Rc<Environment>,
    args: &LispObject,
    name: &'static str,
    holds: fn(LispInt, LispInt) -> bool,
) -> evaluator::Result {
    let values = eval_list(env, args)?;
    let mut anchor = None;
    let mut result = true;
    for value in values.iter() {
        let value = value?;
        let x = expect_int(name, value)?;
        match anchor {
            None => anchor = Some(x),
            Some(first) if !holds(first, x) => {
                result = false;
                break;
            }
            Some(_) => {}
        }
    }
    Ok(LispObject::boolean(result, args.loc))
}

macro_rules! comparison_primitive {
    ($SYMBOL:tt, $NAME:ident, $holds:expr) => {
        paste::item! {
            static $NAME: NativeOperator = NativeOperator {
                name: stringify!($SYMBOL),
                arity: Arity::at_least(0),
                fn_ptr: [<$NAME:lower _>],
            };

            fn [<$NAME:lower _>](env: &Rc<Environment>, args: &LispObject) -> evaluator::Result {
                comparison_(env, args, stringify!($SYMBOL), $holds)
            }
        }
    };
}

comparison_primitive!(=, EQ, |first: LispInt, x| x == first);
comparison_primitive!(<, LT, |first: LispInt, x| x < first);

static BUILTINS: [&NativeOperator; 19] = [
    // Control and definition
    &PROGN, &MACRO, &WHILE, &QUOTE, &SETQ, &SET, &FN, &IF,
    // Output
    &PRINTLN, &PRINT,
    // Pairs
    &CONS, &CAR, &CDR,
    // Arithmetic
    &ADD, &SUB, &MUL, &DIV,
    // Comparisons
    &EQ, &LT,
];

/// Binds every builtin operator in `env`'s own frame.
pub fn load_builtins(env: &Environment) {
    for &op in BUILTINS.iter() {
        env.add_variable(op.name.into(), LispObject::new(Kind::Native(op), Default::default()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader;

    fn run(src: &str) -> LispObject {
        let env = Environment::with_builtins();
        run_in(&env, src)
    }

    fn run_in(env: &Rc<Environment>, src: &str) -> LispObject {
        let mut last = LispObject::nil(Location::default());
        for form in reader::read_all(src).unwrap() {
            last = evaluator::eval(env, &form);
        }
        last
    }

    fn error_kind(value: &LispObject) -> ErrorKind {
        value.as_error().expect("expected an error").kind.clone()
    }

    fn int(x: LispInt) -> LispObject {
        LispObject::integer(x, Location::default())
    }

    #[test]
    fn arithmetic_folds_left() {
        assert_eq!(run("(+ 1 2 3)"), int(6));
        assert_eq!(run("(- 10 1 2)"), int(7));
        assert_eq!(run("(* 2 3 4)"), int(24));
        assert_eq!(run("(/ 100 5 2)"), int(10));
        assert_eq!(run("(- 5)"), int(5));
    }

    #[test]
    fn arithmetic_without_arguments_is_zero() {
        for op in &["+", "-", "*", "/"] {
            assert_eq!(run(&format!("({})", op)), int(0));
        }
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let value = run("(/ 10 0)");
        assert_eq!(error_kind(&value), ErrorKind::DivisionByZero);
        assert_eq!(value.loc, Location::new(1, 7));
    }

    #[test]
    fn arithmetic_rejects_non_integers() {
        let value = run("(+ 1 (quote x))");
        assert_eq!(
            error_kind(&value),
            ErrorKind::TypeError {
                operator: "+",
                expected: "integer",
                got: "symbol"
            }
        );
    }

    #[test]
    fn equality_compares_with_first() {
        assert!(run("(= 3 3 3)").is_true());
        assert!(run("(= 3 3 4)").is_nil());
        assert!(run("(=)").is_true());
        assert!(run("(= 1)").is_true());
    }

    #[test]
    fn less_than_is_anchored_on_first_argument() {
        assert!(run("(< 5 3 4)").is_true());
        assert!(run("(< 5 3 5)").is_nil());
        assert!(run("(< 1 2)").is_nil());
        assert!(run("(< 2 1)").is_true());
    }

    #[test]
    fn comparison_type_checks_until_it_fails() {
        assert!(run("(= 1 2 (quote x))").is_nil());
        assert_eq!(
            error_kind(&run("(= 1 (quote x))")),
            ErrorKind::TypeError {
                operator: "=",
                expected: "integer",
                got: "symbol"
            }
        );
    }

    #[test]
    fn if_takes_then_or_else_branches() {
        assert_eq!(run("(if t 1 2)"), int(1));
        assert_eq!(run("(if nil 1 2 3)"), int(3));
        assert!(run("(if nil 1)").is_nil());
        // Only `t` is true.
        assert_eq!(run("(if 0 1 2)"), int(2));
    }

    #[test]
    fn while_loops_until_condition_is_not_true() {
        let src = "
            (setq i 0)
            (setq total 0)
            (while (< 5 i)
              (setq total (+ total i))
              (setq i (+ i 1)))";
        // The value of the last body form in the last iteration.
        assert_eq!(run(src), int(5));
        assert!(run("(while nil 1)").is_nil());
    }

    #[test]
    fn while_without_body() {
        assert!(run("(while nil)").is_nil());
        assert_eq!(error_kind(&run("(while t)")), ErrorKind::EmptyBody);
        assert!(matches!(
            error_kind(&run("(while)")),
            ErrorKind::ArityError { name: "while", .. }
        ));
    }

    #[test]
    fn quote_returns_argument_unevaluated() {
        let value = run("(quote (a b))");
        assert_eq!(value, reader::read_str("(a b)").unwrap());
        assert!(matches!(
            error_kind(&run("(quote)")),
            ErrorKind::ArityError { name: "quote", .. }
        ));
    }

    #[test]
    fn cons_car_cdr() {
        assert_eq!(
            run("(car (cons (quote a) (quote b)))"),
            LispObject::symbol("a", Location::default())
        );
        assert_eq!(
            run("(cdr (cons 1 (cons 2 nil)))"),
            reader::read_str("(2)").unwrap()
        );
        assert_eq!(
            error_kind(&run("(car nil)")),
            ErrorKind::TypeError {
                operator: "car",
                expected: "cell",
                got: "nil"
            }
        );
        assert_eq!(
            error_kind(&run("(cdr 5)")),
            ErrorKind::TypeError {
                operator: "cdr",
                expected: "cell",
                got: "integer"
            }
        );
    }

    #[test]
    fn set_evaluates_its_target() {
        let env = Environment::with_builtins();
        run_in(&env, "(setq name (quote x))");
        assert_eq!(run_in(&env, "(set name 5)"), int(5));
        assert_eq!(run_in(&env, "x"), int(5));
        assert_eq!(
            error_kind(&run_in(&env, "(set 1 2)")),
            ErrorKind::TypeError {
                operator: "set",
                expected: "symbol",
                got: "integer"
            }
        );
    }

    #[test]
    fn setq_creates_then_mutates() {
        let env = Environment::with_builtins();
        assert_eq!(run_in(&env, "(setq x 1)"), int(1));
        let binding = env.find(&"x".into()).unwrap();
        run_in(&env, "(setq x 2)");
        assert_eq!(*binding.borrow(), int(2));
    }

    #[test]
    fn setq_inside_function_creates_local_binding() {
        let env = Environment::with_builtins();
        run_in(&env, "(fn f () (setq local 1) local)");
        assert_eq!(run_in(&env, "(f)"), int(1));
        assert_eq!(
            error_kind(&run_in(&env, "local")),
            ErrorKind::UnboundSymbol("local".into())
        );
    }

    #[test]
    fn named_fn_is_bound() {
        let env = Environment::with_builtins();
        run_in(&env, "(fn double (x) (* x 2))");
        assert_eq!(run_in(&env, "(double 21)"), int(42));
    }

    #[test]
    fn anonymous_fn_is_returned() {
        assert_eq!(run("((fn (x y) (- x y)) 10 3)"), int(7));
    }

    #[test]
    fn fn_rejects_non_symbol_parameters() {
        let value = run("(fn (x 1) x)");
        assert_eq!(error_kind(&value), ErrorKind::NonSymbolParameter("integer"));
        assert_eq!(
            value.as_error().unwrap().to_string(),
            "1:8: parameter name must be a symbol (this is an integer)"
        );
    }

    #[test]
    fn fn_rejects_non_list_parameters() {
        assert_eq!(
            error_kind(&run("(fn x 1)")),
            ErrorKind::MalformedFunction("parameters and body must be lists")
        );
    }

    #[test]
    fn empty_function_body_fails_when_called() {
        let env = Environment::with_builtins();
        run_in(&env, "(fn nothing ())");
        assert_eq!(error_kind(&run_in(&env, "(nothing)")), ErrorKind::EmptyBody);
    }

    #[test]
    fn macro_receives_unevaluated_arguments() {
        let env = Environment::with_builtins();
        run_in(&env, "(setq my-quote (macro (x) (cons (quote quote) (cons x nil))))");
        assert_eq!(
            run_in(&env, "(my-quote undefined-symbol)"),
            LispObject::symbol("undefined-symbol", Location::default())
        );
        assert!(matches!(
            error_kind(&run_in(&env, "(my-quote a b)")),
            ErrorKind::ArityError { name: "macro", .. }
        ));
    }

    #[test]
    fn print_propagates_errors() {
        assert_eq!(
            error_kind(&run("(println 1 undefined)")),
            ErrorKind::UnboundSymbol("undefined".into())
        );
        assert!(run("(print)").is_nil());
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn print_writes_values_without_separator() {
        let values = reader::read_str("(1 (a b) t)").unwrap();
        let mut out = Vec::new();
        print_to(&mut out, &values, true, Location::default()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1(a b)t\n");
    }

    #[test]
    fn failed_write_is_an_io_error() {
        let values = reader::read_str("(1 2)").unwrap();
        let error = print_to(&mut ClosedPipe, &values, false, Location::default()).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Io("pipe closed".to_string()));
        assert_eq!(error.loc, Location::new(1, 2));

        let nothing = LispObject::nil(Location::default());
        let error = print_to(&mut ClosedPipe, &nothing, true, Location::new(3, 4)).unwrap_err();
        assert!(matches!(error.kind, ErrorKind::Io(_)));
        assert_eq!(error.loc, Location::new(3, 4));
    }

    #[test]
    fn builtins_are_bound_in_the_root() {
        let env = Environment::with_builtins();
        for op in BUILTINS.iter() {
            let value = env.fetch(&op.name.into()).unwrap();
            assert!(matches!(value.kind, Kind::Native(_)));
        }
    }
}
