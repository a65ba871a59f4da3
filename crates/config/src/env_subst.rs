use std::sync::OnceLock;

use regex::{Captures, Regex};

fn placeholder() -> Option<&'static Regex> {
    static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").ok())
        .as_ref()
}

/// Replace `${ENV_VAR}` placeholders with values from the process environment.
///
/// Unset variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Replace `${ENV_VAR}` placeholders using `lookup`.
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let Some(re) = placeholder() else {
        return input.to_string();
    };
    re.replace_all(input, |caps: &Captures<'_>| {
        lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}
