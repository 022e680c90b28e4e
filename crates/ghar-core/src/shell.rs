//! POSIX shell quoting.
//!
//! Every dynamic value that ends up inside a guest command line goes through
//! [`quote`]; nothing is ever spliced into a command string unquoted.

/// Characters that never need quoting.
fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '_' | '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '-')
}

/// Quotes `s` so that a POSIX shell parses it back as exactly one word.
///
/// Safe strings are returned as-is; everything else is wrapped in single
/// quotes, with embedded single quotes written as `'"'"'`.
///
/// ```
/// use ghar_core::shell::quote;
///
/// assert_eq!(quote("self-hosted"), "self-hosted");
/// assert_eq!(quote(""), "''");
/// assert_eq!(quote("it's"), r#"'it'"'"'s'"#);
/// ```
pub fn quote(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if s.chars().all(is_safe) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r#"'"'"'"#))
}

/// Quotes each argument and joins them with spaces.
pub fn quote_command<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .map(|a| quote(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Argv that runs `command` in the login shell of `user`.
///
/// An empty `command` starts the login shell without `-c`; the shell then
/// reads its script from stdin.
pub fn login_shell_argv(user: &str, shell: &str, command: &[String]) -> Vec<String> {
    let mut argv = vec![
        "su".to_string(),
        "-s".to_string(),
        shell.to_string(),
        "-l".to_string(),
    ];
    if !command.is_empty() {
        argv.push("-c".to_string());
        argv.push(quote_command(command));
    }
    argv.push(user.to_string());
    argv
}
