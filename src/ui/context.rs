//! Terminal detection for loader output

use std::io::IsTerminal;

/// Environment variables set by common CI services
const CI_MARKERS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
    "BUILDKITE",
    "TEAMCITY_VERSION",
    "TF_BUILD",
];

/// Whether download progress may be drawn as a bar
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    fancy: bool,
}

impl UiContext {
    /// Inspect stderr and the process environment
    pub fn detect() -> Self {
        Self::from_parts(std::io::stderr().is_terminal(), |key| {
            std::env::var_os(key).is_some()
        })
    }

    /// Plain line output only
    pub fn non_interactive() -> Self {
        Self { fancy: false }
    }

    /// Fancy output needs a terminal on stderr and no CI marker
    fn from_parts(stderr_tty: bool, is_set: impl Fn(&str) -> bool) -> Self {
        let in_ci = CI_MARKERS.iter().any(|key| is_set(key));
        Self {
            fancy: stderr_tty && !in_ci,
        }
    }

    pub fn use_fancy_output(&self) -> bool {
        self.fancy
    }
}
