//! gh-owners-gate: webhook interceptor for GitHub pull request events.
//!
//! Reads one interceptor request as JSON from stdin, writes the response
//! envelope to stdout. Logs go to stderr (and optionally a file).

use std::io::Read;
use std::path::PathBuf;

use gh_owners_gate::config::Config;
use gh_owners_gate::engine;
use gh_owners_gate::envelope::{Code, InterceptorRequest, InterceptorResponse};
use gh_owners_gate::logging;

const USAGE: &str = "\
usage: gh-owners-gate [--config <path>] [--dump-config]

Reads an interceptor request from stdin and prints the response.

options:
  --config <path>  merge this file over the built-in defaults
                   (default: ~/.config/gh-owners-gate/config.toml if present)
  --dump-config    print the effective configuration and exit
  -h, --help       show this help";

struct Args {
    config: Option<PathBuf>,
    dump_config: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        config: None,
        dump_config: false,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or("--config requires a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--dump-config" => args.dump_config = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(args)
}

fn respond(response: &InterceptorResponse) {
    match serde_json::to_string(response) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("failed to render response: {e}");
            std::process::exit(1);
        }
    }
}

fn main() {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let config = match Config::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            respond(&InterceptorResponse::failure(
                Code::Internal,
                format!("error loading configuration: {e}"),
            ));
            std::process::exit(1);
        }
    };

    if args.dump_config {
        match config.to_toml() {
            Ok(s) => print!("{s}"),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        return;
    }

    // Best-effort: a broken log file must not block the decision.
    if let Err(e) = logging::init(&config.logging) {
        eprintln!("logging disabled: {e}");
    }

    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        respond(&InterceptorResponse::failure(
            Code::InvalidArgument,
            format!("failed to read request: {e}"),
        ));
        return;
    }

    let request: InterceptorRequest = match serde_json::from_str(&input) {
        Ok(r) => r,
        Err(e) => {
            respond(&InterceptorResponse::failure(
                Code::InvalidArgument,
                format!("failed to parse request: {e}"),
            ));
            return;
        }
    };

    respond(&engine::process_with_config(&config, &request));
}
