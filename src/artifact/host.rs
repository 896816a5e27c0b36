use std::fmt;

/// The platform an installation plan is computed for.
///
/// `os` and `arch` use the spellings of `std::env::consts`
/// (`windows`, `linux`, `macos`, `freebsd`; `x86_64`, `x86`, `arm`, `aarch64`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostContext {
    pub os: String,
    pub arch: String,
}

impl HostContext {
    pub fn new(os: &str, arch: &str) -> Self {
        Self {
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }

    /// The host this process runs on.
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Evaluate a demand condition such as `windows and x64` or `linux !arm64`.
    ///
    /// Terms are separated by whitespace (an `and` between them is optional)
    /// and may be negated with a leading `!` or a preceding `not`. Every term
    /// must hold. Unknown terms never hold. The empty condition always holds.
    pub fn matches(&self, condition: &str) -> bool {
        let mut negate = false;
        for word in condition.split_whitespace() {
            let word = word.to_ascii_lowercase();
            match word.as_str() {
                "and" | "&&" => continue,
                "not" => {
                    negate = !negate;
                    continue;
                }
                _ => {}
            }
            let (bang, term) = match word.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, word.as_str()),
            };
            if self.term(term) == (negate ^ bang) {
                return false;
            }
            negate = false;
        }
        true
    }

    fn term(&self, term: &str) -> bool {
        match term {
            "windows" => self.os == "windows",
            "linux" => self.os == "linux",
            "osx" | "macos" => self.os == "macos",
            "freebsd" => self.os == "freebsd",
            "x64" => self.arch == "x86_64",
            "x86" => self.arch == "x86",
            "arm" => self.arch == "arm",
            "arm64" => self.arch == "aarch64",
            _ => false,
        }
    }
}

impl fmt::Display for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
