//! POSIX shell quoting for rendering command lines in diagnostics.

/// Quote a single argument so a POSIX shell reads it back verbatim.
///
/// Arguments made only of safe characters are returned unchanged. Everything
/// else is wrapped in single quotes, with embedded single quotes spliced as
/// `'"'"'`.
#[must_use]
pub fn quote(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    if arg.chars().all(is_safe) {
        return arg.to_string();
    }

    format!("'{}'", arg.replace('\'', r#"'"'"'"#))
}

/// Join arguments into a single shell-quoted command line.
#[must_use]
pub fn join<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .map(|a| quote(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_safe(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '-')
}
