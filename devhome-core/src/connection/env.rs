//! Captured environment variables relevant to database connections.

use std::collections::BTreeMap;

/// Aliases for the user field, most specific first
pub const USER_VARS: &[&str] = &[
    "DB_USER",
    "MYSQL_USER",
    "JAWSDB_USERNAME",
    "JAWSDB_USER",
    "CLEARDB_USERNAME",
];

/// Aliases for the password field
pub const PASSWORD_VARS: &[&str] = &[
    "DB_PASSWORD",
    "MYSQL_PASSWORD",
    "JAWSDB_PASSWORD",
    "CLEARDB_PASSWORD",
];

/// Aliases for the host field
pub const HOST_VARS: &[&str] = &["DB_HOST", "MYSQL_HOST", "JAWSDB_HOST", "CLEARDB_HOST"];

/// Aliases for the database field
pub const DATABASE_VARS: &[&str] = &[
    "DB_NAME",
    "MYSQL_DATABASE",
    "MYSQL_DB",
    "JAWSDB_DATABASE",
    "CLEARDB_DATABASE",
];

/// Aliases for the port field
pub const PORT_VARS: &[&str] = &["DB_PORT", "MYSQL_PORT", "JAWSDB_PORT", "CLEARDB_PORT"];

/// Aliases for the unix socket path
pub const SOCKET_VARS: &[&str] = &["DB_SOCKET", "MYSQL_UNIX_PORT"];

/// Variables that may hold a full connection URL
pub const URL_VARS: &[&str] = &["DATABASE_URL", "JAWSDB_URL", "CLEARDB_DATABASE_URL"];

/// Immutable snapshot of the recognized variables.
///
/// Taking a snapshot keeps the resolver a pure function of its inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Captures every recognized variable from the process environment.
    /// Variables that are unset or not valid UTF-8 are left out.
    pub fn from_process() -> Self {
        let vars = Self::recognized()
            .filter_map(|name| std::env::var(name).ok().map(|v| (name.to_string(), v)))
            .collect();
        Self { vars }
    }

    /// Builds a snapshot from explicit pairs. Unrecognized names are kept;
    /// they are simply never consulted.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of `name`, even when empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// First alias that is set and non-empty.
    pub fn first(&self, aliases: &[&str]) -> Option<&str> {
        aliases
            .iter()
            .filter_map(|name| self.get(name))
            .find(|value| !value.is_empty())
    }

    /// Connection URL from the first populated URL variable.
    pub fn connection_url(&self) -> Option<&str> {
        self.first(URL_VARS)
    }

    /// Whether no database variable was captured.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    fn recognized() -> impl Iterator<Item = &'static str> {
        [
            USER_VARS,
            PASSWORD_VARS,
            HOST_VARS,
            DATABASE_VARS,
            PORT_VARS,
            SOCKET_VARS,
            URL_VARS,
        ]
        .into_iter()
        .flatten()
        .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_skips_empty_values() {
        let env = EnvSnapshot::from_pairs([("DB_USER", ""), ("MYSQL_USER", "mysqluser")]);
        assert_eq!(env.first(USER_VARS), Some("mysqluser"));
    }

    #[test]
    fn test_first_respects_alias_order() {
        let env = EnvSnapshot::from_pairs([
            ("CLEARDB_USERNAME", "cleardb"),
            ("JAWSDB_USERNAME", "jawsdb"),
        ]);
        assert_eq!(env.first(USER_VARS), Some("jawsdb"));
    }

    #[test]
    fn test_connection_url_fallbacks() {
        let env = EnvSnapshot::from_pairs([
            ("DATABASE_URL", ""),
            ("CLEARDB_DATABASE_URL", "mysql://c@h/db"),
        ]);
        assert_eq!(env.connection_url(), Some("mysql://c@h/db"));
    }

    #[test]
    fn test_from_process_environment_capture() {
        temp_env::with_vars(
            [
                ("DB_USER", Some("envuser")),
                ("MYSQL_PASSWORD", Some("")),
                ("DATABASE_URL", None::<&str>),
            ],
            || {
                let env = EnvSnapshot::from_process();
                assert_eq!(env.get("DB_USER"), Some("envuser"));
                assert_eq!(env.get("MYSQL_PASSWORD"), Some(""));
                assert_eq!(env.get("DATABASE_URL"), None);
            },
        );
    }
}
