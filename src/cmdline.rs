use crate::environment::Environment;
use crate::interpreter;
use crate::types::{LispObject, Location};
use ansi_term::Colour;
use linefeed::{DefaultTerminal, Interface, ReadResult, Terminal};
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Interpreter(interpreter::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Interpreter(e) => write!(f, "{}", e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<interpreter::Error> for Error {
    fn from(e: interpreter::Error) -> Self {
        Self::Interpreter(e)
    }
}

/// Red when `stream` is a terminal, plain otherwise.
pub fn paint_error(message: &str, stream: atty::Stream) -> String {
    match atty::is(stream) {
        true => Colour::Red.paint(message).to_string(),
        false => message.to_string(),
    }
}

pub fn setup() -> std::io::Result<Interface<DefaultTerminal>> {
    let interface = linefeed::Interface::new("conslisp")?;
    interface.set_prompt("lisp> ")?;
    if let Some(path) = history_path() {
        interface.load_history(path).ok();
    };
    Ok(interface)
}

fn history_path() -> Option<PathBuf> {
    match dirs::data_dir() {
        Some(mut path) => {
            path.push(".conslisp_history");
            Some(path)
        }
        None => None,
    }
}

pub fn save_history<T: Terminal>(interface: &Interface<T>) -> std::io::Result<()> {
    match history_path() {
        Some(path) => interface.save_history(path),
        None => Ok(()),
    }
}

/// Reads lines until end of input. An error is reported and the loop carries
/// on with the same environment.
pub fn repl<T: Terminal>(
    interface: &Interface<T>,
    mut processor: impl FnMut(&str) -> interpreter::Result<String>,
) {
    loop {
        match interface.read_line() {
            Ok(ReadResult::Eof) => break,
            Ok(ReadResult::Signal(sig)) => {
                writeln!(interface, "Received signal {:?}", sig).ok();
            }
            Ok(ReadResult::Input(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                interface.add_history_unique(line.clone());
                match processor(&line) {
                    Ok(output) => writeln!(interface, "{}", output).ok(),
                    Err(e) => {
                        let message = paint_error(&e.to_string(), atty::Stream::Stdout);
                        writeln!(interface, "{}", message).ok()
                    }
                };
            }
            Err(e) => {
                writeln!(interface, "Error: {}", e).ok();
                break;
            }
        }
    }
}

/// With no arguments, starts the REPL. Otherwise evaluates the file named by
/// the first argument, with the remaining arguments bound to `*ARGV*`.
pub fn launch(args: Vec<String>, env: &Rc<Environment>) -> Result<(), Error> {
    let extra = args.iter().skip(2);
    let argv = extra
        .map(|arg| LispObject::symbol(arg, Location::default()))
        .collect();
    env.add_variable(
        "*ARGV*".into(),
        LispObject::from_vec(argv, Location::default()),
    );

    match args.get(1) {
        None => {
            let interface = setup()?;
            repl(&interface, |line| interpreter::rep(line, env));
            save_history(&interface)?;
        }
        Some(path) => {
            interpreter::load_file(path, env)?;
        }
    }
    Ok(())
}
