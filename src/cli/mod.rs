pub mod registry;
pub mod resolve;
pub mod search;

use std::future::Future;
use std::process;

use quiver::session::Session;
use quiver::version::VersionReference;

/// Report `err` and exit non-zero.
pub fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("error: {}", err);
    process::exit(1);
}

/// Open a session for the current user and directory, or exit.
pub fn open_session() -> Session {
    match Session::discover() {
        Ok(session) => session,
        Err(e) => fail(e),
    }
}

/// Drive `future` to completion on a fresh multi-threaded runtime.
pub fn block_on<F: Future>(future: F) -> F::Output {
    match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime.block_on(future),
        Err(e) => fail(format!("cannot start async runtime: {}", e)),
    }
}

/// Split a command-line requirement `SPEC[@RANGE]` (`tools:cmake@^3.20`).
pub fn parse_requirement(arg: &str) -> Result<(String, VersionReference), quiver::Error> {
    match arg.split_once('@') {
        Some((spec, range)) => Ok((spec.to_string(), VersionReference::parse(range)?)),
        None => Ok((arg.to_string(), VersionReference::any())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requirement() {
        let (spec, reference) = parse_requirement("tools:cmake@^3.20").unwrap();
        assert_eq!(spec, "tools:cmake");
        assert_eq!(reference.to_string(), "^3.20");

        let (spec, reference) = parse_requirement("cmake").unwrap();
        assert_eq!(spec, "cmake");
        assert_eq!(reference, VersionReference::any());

        assert!(parse_requirement("cmake@>=").is_err());
    }
}
