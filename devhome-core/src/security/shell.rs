//! POSIX shell quoting.

/// Quotes `arg` so that `sh` treats it as one literal word.
///
/// The argument is wrapped in single quotes; embedded single quotes are
/// closed, escaped and reopened (`'` becomes `'\''`).
///
/// ```rust
/// use devhome_core::security::shell_quote;
///
/// assert_eq!(shell_quote("/usr/bin/mysql"), "'/usr/bin/mysql'");
/// assert_eq!(shell_quote("a'b"), "'a'\\''b'");
/// ```
pub fn shell_quote(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len().saturating_add(2));
    quoted.push('\'');
    for ch in arg.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}
