use conslisp::cmdline;
use conslisp::environment::Environment;

fn main() {
    pretty_env_logger::init();
    let env = Environment::with_builtins();
    let args = std::env::args().collect();
    if let Err(e) = cmdline::launch(args, &env) {
        eprintln!("{}", cmdline::paint_error(&e.to_string(), atty::Stream::Stderr));
        std::process::exit(1);
    }
}
