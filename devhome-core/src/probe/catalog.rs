//! Built-in runtime probes and configuration-declared custom runtimes.

use super::{DetectionStrategy, RuntimeProbe};
use crate::connection::{ConnectionConfig, ExplicitConnection};
use serde::Deserialize;

/// Well-known MySQL client and server install locations, searched in order.
pub const MYSQL_KNOWN_LOCATIONS: &[&str] = &[
    "mysql",
    "mysqld",
    "/usr/local/bin/mysql",
    "/usr/bin/mysql",
    "/opt/homebrew/bin/mysql",
    "/usr/local/mysql/bin/mysql",
    "/opt/local/bin/mysql",
    "/usr/local/mysql/bin/mysqld",
    "/usr/sbin/mysqld",
    "/usr/libexec/mysqld",
];

/// Shell commands that locate a MySQL binary on `PATH`.
pub const MYSQL_DISCOVERY: &[&str] = &[
    "command -v mysql",
    "which mysql",
    "command -v mysqld",
    "which mysqld",
];

/// Version patterns for `mysql`/`mysqld --version` banners.
pub const MYSQL_PATTERNS: &[&str] = &[r"Distrib\s+([0-9.]+)", r"Ver\s+([0-9.]+)"];

/// Version patterns for `SELECT VERSION()` results and library text. The
/// bare `x.y.z` form is only trusted here, never on binary output.
pub const MYSQL_SERVER_PATTERNS: &[&str] = &[
    r"Distrib\s+([0-9.]+)",
    r"Ver\s+([0-9.]+)",
    r"([0-9]+\.[0-9]+\.[0-9]+)",
];

/// Reported when nothing better is known and the MySQL driver is compiled
/// in. Names the client driver, not a server version.
#[cfg(feature = "mysql")]
pub const MYSQL_CLIENT_LIBRARY: &str = "sqlx-mysql driver 0.8";

/// A string or a list of strings in the options file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    OneOrMany::deserialize(deserializer).map(Into::into)
}

/// MySQL section of the options file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MysqlOptions {
    /// Explicit client or server binaries, one path or a list
    #[serde(alias = "binary", deserialize_with = "one_or_many")]
    pub bin: Vec<String>,
    /// Explicit connection fields
    pub connection: ExplicitConnection,
}

/// A runtime declared in the options file.
///
/// ```json
/// { "name": "node", "binaries": ["node"], "version_args": ["--version"],
///   "patterns": ["v([0-9.]+)"] }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CustomRuntime {
    /// Runtime name shown on the report
    pub name: String,
    /// Binaries tried in order
    #[serde(default)]
    pub binaries: Vec<String>,
    /// Shell commands printing a binary path
    #[serde(default)]
    pub discover: Vec<String>,
    /// Arguments that make a binary print its version
    #[serde(default = "default_version_args")]
    pub version_args: Vec<String>,
    /// Version regexes; capture group 1 is the version
    #[serde(default)]
    pub patterns: Vec<String>,
}

fn default_version_args() -> Vec<String> {
    vec!["--version".to_string()]
}

/// Apache httpd
pub fn apache() -> RuntimeProbe {
    RuntimeProbe::new("apache")
        .strategy(DetectionStrategy::KnownLocations(strings(&[
            "httpd",
            "apache2",
            "/usr/sbin/httpd",
            "/usr/sbin/apache2",
            "/usr/local/apache2/bin/httpd",
        ])))
        .strategy(DetectionStrategy::ShellDiscovery(strings(&[
            "command -v httpd",
            "command -v apache2",
        ])))
        .version_args(["-v"])
        .patterns([r"Apache/([0-9.]+)"])
}

/// PHP interpreter
pub fn php() -> RuntimeProbe {
    RuntimeProbe::new("php")
        .strategy(DetectionStrategy::KnownLocations(strings(&[
            "php",
            "/usr/bin/php",
            "/usr/local/bin/php",
            "/opt/homebrew/bin/php",
        ])))
        .strategy(DetectionStrategy::ShellDiscovery(strings(&["command -v php"])))
        .version_args(["--version"])
        .patterns([r"PHP ([0-9.]+)"])
}

/// MySQL / MariaDB: configured binaries, well-known locations, shell
/// discovery, a live connection, then the bundled driver.
pub fn mysql(options: &MysqlOptions, connection: ConnectionConfig) -> RuntimeProbe {
    let mut probe = RuntimeProbe::new("mysql").version_args(["--version"]);

    if !options.bin.is_empty() {
        probe = probe.strategy(DetectionStrategy::ExplicitBinary(options.bin.clone()));
    }

    probe = probe
        .strategy(DetectionStrategy::KnownLocations(strings(
            MYSQL_KNOWN_LOCATIONS,
        )))
        .strategy(DetectionStrategy::ShellDiscovery(strings(MYSQL_DISCOVERY)))
        .strategy(DetectionStrategy::LiveConnection(connection));

    #[cfg(feature = "mysql")]
    {
        probe = probe.strategy(DetectionStrategy::LibraryFallback(
            MYSQL_CLIENT_LIBRARY.to_string(),
        ));
    }

    probe
        .patterns(MYSQL_PATTERNS)
        .server_patterns(MYSQL_SERVER_PATTERNS)
}

/// Probe for a runtime declared in configuration.
pub fn custom(runtime: &CustomRuntime) -> RuntimeProbe {
    let mut probe = RuntimeProbe::new(runtime.name.clone())
        .version_args(runtime.version_args.iter().cloned())
        .patterns(&runtime.patterns);
    if !runtime.binaries.is_empty() {
        probe = probe.strategy(DetectionStrategy::ExplicitBinary(runtime.binaries.clone()));
    }
    if !runtime.discover.is_empty() {
        probe = probe.strategy(DetectionStrategy::ShellDiscovery(runtime.discover.clone()));
    }
    probe
}

/// Built-in probes followed by the custom ones.
pub fn runtimes(
    mysql_options: &MysqlOptions,
    connection: ConnectionConfig,
    extra: &[CustomRuntime],
) -> Vec<RuntimeProbe> {
    let mut probes = vec![apache(), php(), mysql(mysql_options, connection)];
    probes.extend(extra.iter().map(custom));
    probes
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StrategyKind;

    #[test]
    fn test_mysql_strategy_order() {
        let options = MysqlOptions {
            bin: vec!["/custom/mysql".to_string()],
            ..Default::default()
        };
        let probe = mysql(&options, ConnectionConfig::default());
        let kinds: Vec<_> = probe.strategies.iter().map(DetectionStrategy::kind).collect();

        assert_eq!(kinds[0], StrategyKind::ExplicitBinary);
        assert_eq!(kinds[1], StrategyKind::KnownLocations);
        assert_eq!(kinds[2], StrategyKind::ShellDiscovery);
        assert_eq!(kinds[3], StrategyKind::LiveConnection);
        assert_eq!(probe.patterns.len(), 2);
        assert_eq!(probe.server_patterns.len(), 3);
    }

    #[cfg(feature = "mysql")]
    #[test]
    fn test_client_library_matches_manifest_sqlx_series() {
        let manifest = include_str!("../../../Cargo.toml");
        let sqlx_version = manifest
            .lines()
            .find_map(|line| line.strip_prefix("sqlx = { version = \""))
            .and_then(|rest| rest.split('"').next())
            .unwrap();
        let series = MYSQL_CLIENT_LIBRARY.rsplit(' ').next().unwrap();

        assert!(
            sqlx_version.starts_with(&format!("{}.", series)),
            "{} does not match sqlx {}",
            MYSQL_CLIENT_LIBRARY,
            sqlx_version
        );
    }

    #[cfg(feature = "mysql")]
    #[test]
    fn test_client_library_is_not_read_as_server_version() {
        let probe = mysql(&MysqlOptions::default(), ConnectionConfig::default());
        assert_eq!(
            crate::probe::extract_version(&probe.server_patterns, MYSQL_CLIENT_LIBRARY, false),
            None
        );
    }

    #[test]
    fn test_mysql_without_explicit_bins() {
        let probe = mysql(&MysqlOptions::default(), ConnectionConfig::default());
        assert!(matches!(
            &probe.strategies[0],
            DetectionStrategy::KnownLocations(paths) if paths.len() == 10
        ));
    }

    #[test]
    fn test_mysql_options_accept_single_binary() {
        let options: MysqlOptions =
            serde_json::from_str(r#"{"binary": "/opt/mysql/bin/mysql"}"#).unwrap();
        assert_eq!(options.bin, vec!["/opt/mysql/bin/mysql"]);

        let options: MysqlOptions =
            serde_json::from_str(r#"{"bin": ["a", "b"], "connection": {"username": "root"}}"#)
                .unwrap();
        assert_eq!(options.bin, vec!["a", "b"]);
        assert_eq!(options.connection.user.as_deref(), Some("root"));
    }

    #[test]
    fn test_custom_runtime_from_json() {
        let runtime: CustomRuntime = serde_json::from_str(
            r#"{"name": "node", "binaries": ["node"], "patterns": ["v([0-9.]+)"]}"#,
        )
        .unwrap();
        let probe = custom(&runtime);

        assert_eq!(probe.name, "node");
        assert_eq!(probe.version_args, vec!["--version"]);
        assert_eq!(probe.strategies.len(), 1);
        assert_eq!(probe.patterns.len(), 1);
    }

    #[test]
    fn test_runtimes_keeps_builtin_order() {
        let names: Vec<_> = runtimes(&MysqlOptions::default(), ConnectionConfig::default(), &[])
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["apache", "php", "mysql"]);
    }
}
