//! Layered, multi-valued, typed configuration.
//!
//! Parses the git config file grammar: `[section]` / `[section "subsection"]`
//! headers, `key = value` entries, valueless keys (implicit true), `#`/`;`
//! comments, double-quoted values, and trailing-backslash continuations.
//! Keys normalize as `section[.subsection].key` with section and key
//! lowercased and subsection compared case-sensitively.
//!
//! Entries are kept in insertion order and never discarded on read:
//! multi-valued reads are lossless, single-valued reads take the last
//! recorded value so that later (higher-priority) layers override earlier
//! ones.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::ConfigError;

/// A parsed configuration: ordered `(key, value)` pairs.
#[derive(Clone, Debug, Default)]
pub struct Config {
    entries: Vec<(String, String)>,
}

impl Config {
    /// An empty configuration.
    pub fn new() -> Config {
        Config::default()
    }

    /// Load and layer the given files, lowest priority first.
    /// Missing files are skipped; unreadable files are errors.
    pub fn from_paths(paths: &[PathBuf]) -> Result<Config, ConfigError> {
        let mut config = Config::new();

        for path in paths {
            match fs::read_to_string(path) {
                Ok(text) => config.parse_text(&text),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(ConfigError::Io(err)),
            }
        }

        Ok(config)
    }

    /// Parse config text, appending to any already-loaded entries.
    pub fn parse_text(&mut self, text: &str) {
        let mut prefix: Option<String> = None;

        let mut lines = text.lines().peekable();
        while let Some(raw) = lines.next() {
            // Trailing-backslash continuation joins physical lines.
            let mut logical = raw.to_string();
            while logical.ends_with('\\') {
                logical.pop();
                match lines.next() {
                    Some(next) => logical.push_str(next),
                    None => break,
                }
            }

            let line = logical.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') {
                prefix = parse_section_header(line);
                continue;
            }

            let Some(prefix) = prefix.as_ref() else {
                // Keys before any section header are not addressable.
                continue;
            };

            let (key, value) = match line.split_once('=') {
                Some((key, value)) => (key.trim(), parse_value(value)),
                // A valueless key means true.
                None => (line, "true".to_string()),
            };

            if key.is_empty() {
                continue;
            }

            self.entries
                .push((format!("{}.{}", prefix, key.to_lowercase()), value));
        }
    }

    /// All values recorded for a key, in insertion order. Empty when the
    /// key is absent. Multiplicity is preserved here.
    pub fn values(&self, key: &str) -> Vec<String> {
        let key = normalize_key(key);
        self.entries
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// The last recorded value for a key, or `None` when it has no entry.
    pub fn string(&self, key: &str) -> Option<String> {
        let key = normalize_key(key);
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
    }

    /// The last recorded value coerced to a boolean.
    ///
    /// `true`/`yes`/`on`/`1` and `false`/`no`/`off`/`0` are accepted
    /// case-insensitively; any other literal is an error.
    pub fn boolean(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        let Some(value) = self.string(key) else {
            return Ok(None);
        };

        match value.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Some(true)),
            "false" | "no" | "off" | "0" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidBoolean {
                key: normalize_key(key),
                value,
            }),
        }
    }

    /// The last recorded value coerced to an integer.
    ///
    /// Accepts an optional leading sign and a single-letter binary
    /// multiplier suffix (`k`, `m`, or `g`, either case).
    pub fn integer(&self, key: &str) -> Result<Option<i64>, ConfigError> {
        let Some(value) = self.string(key) else {
            return Ok(None);
        };

        parse_integer(&value)
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidInteger {
                key: normalize_key(key),
                value,
            })
    }

    /// One representative (last-wins) value per distinct key, for
    /// enumeration and display.
    pub fn entries(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for (key, value) in &self.entries {
            map.insert(key.clone(), value.clone());
        }
        map
    }

    /// True if the key has at least one entry.
    pub fn has_key(&self, key: &str) -> bool {
        let key = normalize_key(key);
        self.entries.iter().any(|(k, _)| *k == key)
    }

    /// Append a value for a key without disturbing existing entries.
    pub fn add(&mut self, key: &str, value: &str) {
        self.entries.push((normalize_key(key), value.to_string()));
    }

    /// Replace all existing entries for a key with a single value.
    pub fn set(&mut self, key: &str, value: &str) {
        let key = normalize_key(key);
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, value.to_string()));
    }

    /// Serialize all entries back out, grouped by section in first-seen
    /// order, and atomically replace the file at `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let mut sections: Vec<(String, Vec<(String, String)>)> = Vec::new();

        for (key, value) in &self.entries {
            let (header, short_key) = split_key(key);
            match sections.iter_mut().find(|(h, _)| *h == header) {
                Some((_, entries)) => entries.push((short_key, value.clone())),
                None => sections.push((header, vec![(short_key, value.clone())])),
            }
        }

        let mut out = String::new();
        for (header, entries) in sections {
            out.push_str(&header);
            out.push('\n');
            for (key, value) in entries {
                out.push_str(&format!("\t{} = {}\n", key, quote_value(&value)));
            }
        }

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(ConfigError::Io)?;
        tmp.write_all(out.as_bytes()).map_err(ConfigError::Io)?;
        tmp.persist(path).map_err(|e| ConfigError::Io(e.error))?;

        debug!(path = %path.display(), "wrote config");
        Ok(())
    }
}

/// Normalize `Section[.Subsection].Key`: first and last components are
/// lowercased, anything between them is the subsection and stays as-is.
fn normalize_key(key: &str) -> String {
    let Some((section, rest)) = key.split_once('.') else {
        return key.to_lowercase();
    };

    match rest.rsplit_once('.') {
        Some((subsection, short_key)) => format!(
            "{}.{}.{}",
            section.to_lowercase(),
            subsection,
            short_key.to_lowercase()
        ),
        None => format!("{}.{}", section.to_lowercase(), rest.to_lowercase()),
    }
}

/// Split a normalized key into its section header line and short key.
fn split_key(key: &str) -> (String, String) {
    let (section, rest) = key.split_once('.').unwrap_or((key, ""));

    match rest.rsplit_once('.') {
        Some((subsection, short_key)) => (
            format!("[{} \"{}\"]", section, subsection),
            short_key.to_string(),
        ),
        None => (format!("[{}]", section), rest.to_string()),
    }
}

fn parse_section_header(line: &str) -> Option<String> {
    let inner = line.strip_prefix('[')?.split(']').next()?.trim();

    match inner.split_once(' ') {
        Some((section, quoted)) => {
            let subsection = quoted.trim().trim_matches('"').replace("\\\"", "\"");
            Some(format!("{}.{}", section.to_lowercase(), subsection))
        }
        None => Some(inner.to_lowercase()),
    }
}

/// Strip quotes and a trailing unquoted comment from a raw value.
fn parse_value(raw: &str) -> String {
    let mut out = String::new();
    let mut in_quotes = false;
    let mut chars = raw.trim().chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(&next) = chars.peek() {
                    out.push(next);
                    chars.next();
                }
            }
            '#' | ';' if !in_quotes => break,
            _ => out.push(c),
        }
    }

    if in_quotes {
        // Unbalanced quote; keep what we had.
        return out;
    }

    out.trim_end().to_string()
}

fn quote_value(value: &str) -> String {
    if value.contains('#') || value.contains(';') || value.starts_with(' ') || value.ends_with(' ')
    {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

fn parse_integer(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let (digits, multiplier) = match value.as_bytes()[value.len() - 1] {
        b'k' | b'K' => (&value[..value.len() - 1], 1024i64),
        b'm' | b'M' => (&value[..value.len() - 1], 1024 * 1024),
        b'g' | b'G' => (&value[..value.len() - 1], 1024 * 1024 * 1024),
        _ => (value, 1),
    };

    digits.parse::<i64>().ok()?.checked_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(text: &str) -> Config {
        let mut c = Config::new();
        c.parse_text(text);
        c
    }

    #[test]
    fn basic_sections_and_keys() {
        let c = config(
            "[core]\n\
             \trepositoryformatversion = 0\n\
             \tbare = false\n\
             [user]\n\
             \tname = Test User\n\
             \temail = test@example.com\n",
        );

        assert_eq!(c.string("user.name").unwrap(), "Test User");
        assert_eq!(c.string("core.bare").unwrap(), "false");
        assert_eq!(c.string("non.existent"), None);
        assert!(c.has_key("user.email"));
        assert!(!c.has_key("user.phone"));
    }

    #[test]
    fn case_normalization() {
        let c = config("[CORE]\n\tBare = true\n[branch \"Main\"]\n\tremote = origin\n");

        assert_eq!(c.string("core.bare").unwrap(), "true");
        assert_eq!(c.string("Core.BARE").unwrap(), "true");

        // Subsection is case-sensitive.
        assert_eq!(c.string("branch.Main.remote").unwrap(), "origin");
        assert_eq!(c.string("branch.main.remote"), None);
    }

    #[test]
    fn multi_valued_keys_preserve_order() {
        let c = config(
            "[remote \"origin\"]\n\
             \tfetch = +refs/heads/*:refs/remotes/origin/*\n\
             \tfetch = +refs/tags/*:refs/tags/*\n",
        );

        let values = c.values("remote.origin.fetch");
        assert_eq!(
            values,
            vec![
                "+refs/heads/*:refs/remotes/origin/*",
                "+refs/tags/*:refs/tags/*"
            ]
        );

        // Single-valued read is an explicit last-wins projection.
        assert_eq!(
            c.string("remote.origin.fetch").unwrap(),
            "+refs/tags/*:refs/tags/*"
        );

        assert!(c.values("remote.origin.push").is_empty());
    }

    #[test]
    fn add_preserves_multiplicity() {
        let mut c = Config::new();
        c.add("remote.origin.url", "https://a.example/repo.git");
        c.add("remote.origin.url", "https://b.example/repo.git");

        assert_eq!(
            c.values("remote.origin.url"),
            vec!["https://a.example/repo.git", "https://b.example/repo.git"]
        );
        assert_eq!(
            c.string("remote.origin.url").unwrap(),
            "https://b.example/repo.git"
        );
    }

    #[test]
    fn boolean_coercion() {
        let c = config(
            "[a]\n\tt1 = true\n\tt2 = YES\n\tt3 = on\n\tt4 = 1\n\
             \tf1 = false\n\tf2 = no\n\tf3 = Off\n\tf4 = 0\n\
             \tbad = maybe\n\timplicit\n",
        );

        for key in ["a.t1", "a.t2", "a.t3", "a.t4"] {
            assert_eq!(c.boolean(key).unwrap(), Some(true), "{}", key);
        }
        for key in ["a.f1", "a.f2", "a.f3", "a.f4"] {
            assert_eq!(c.boolean(key).unwrap(), Some(false), "{}", key);
        }

        // A valueless key is implicitly true.
        assert_eq!(c.boolean("a.implicit").unwrap(), Some(true));

        assert_eq!(c.boolean("a.missing").unwrap(), None);

        let err = c.boolean("a.bad").unwrap_err();
        assert!(err.to_string().contains("invalid boolean"));
    }

    #[test]
    fn integer_coercion() {
        let c = config(
            "[n]\n\tplain = 42\n\tneg = -7\n\tsigned = +9\n\
             \tkilo = 2k\n\tmega = 3M\n\tgiga = 1g\n\tbad = 12q\n",
        );

        assert_eq!(c.integer("n.plain").unwrap(), Some(42));
        assert_eq!(c.integer("n.neg").unwrap(), Some(-7));
        assert_eq!(c.integer("n.signed").unwrap(), Some(9));
        assert_eq!(c.integer("n.kilo").unwrap(), Some(2048));
        assert_eq!(c.integer("n.mega").unwrap(), Some(3 * 1024 * 1024));
        assert_eq!(c.integer("n.giga").unwrap(), Some(1024 * 1024 * 1024));
        assert_eq!(c.integer("n.missing").unwrap(), None);

        let err = c.integer("n.bad").unwrap_err();
        assert!(err.to_string().contains("invalid integer"));
    }

    #[test]
    fn comments_quotes_and_continuations() {
        let c = config(
            "; leading comment\n\
             [alias]\n\
             \tst = status # trailing comment\n\
             \tquoted = \"  spaced ; value \"\n\
             \tlong = one\\\ntwo\n",
        );

        assert_eq!(c.string("alias.st").unwrap(), "status");
        assert_eq!(c.string("alias.quoted").unwrap(), "  spaced ; value");
        assert_eq!(c.string("alias.long").unwrap(), "onetwo");
    }

    #[test]
    fn layering_overrides_earlier_files() {
        let mut c = config("[user]\n\tname = Global\n");
        c.parse_text("[user]\n\tname = Local\n");

        assert_eq!(c.string("user.name").unwrap(), "Local");
        assert_eq!(c.values("user.name"), vec!["Global", "Local"]);
    }

    #[test]
    fn entries_last_wins_per_key() {
        let c = config("[user]\n\tname = A\n\tname = B\n[core]\n\tbare = false\n");

        let entries = c.entries();
        assert_eq!(entries.get("user.name").unwrap(), "B");
        assert_eq!(entries.get("core.bare").unwrap(), "false");
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");

        let mut c = Config::new();
        c.add("core.bare", "false");
        c.add("remote.origin.url", "https://example.com/repo.git");
        c.add("remote.origin.fetch", "+refs/heads/*:refs/remotes/origin/*");
        c.add("remote.origin.fetch", "+refs/tags/*:refs/tags/*");
        c.save_to(&path).unwrap();

        let reloaded = Config::from_paths(&[path]).unwrap();
        assert_eq!(reloaded.string("core.bare").unwrap(), "false");
        assert_eq!(
            reloaded.values("remote.origin.fetch"),
            vec![
                "+refs/heads/*:refs/remotes/origin/*",
                "+refs/tags/*:refs/tags/*"
            ]
        );
    }

    #[test]
    fn missing_file_is_empty_layer() {
        let dir = tempfile::tempdir().unwrap();
        let c = Config::from_paths(&[dir.path().join("no-such-file")]).unwrap();
        assert!(c.entries().is_empty());
    }
}
