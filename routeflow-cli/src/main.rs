//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() {
    if let Err(err) = routeflow_cli::run() {
        eprintln!("routeflow: {err}");
        std::process::exit(1);
    }
}
