//! A single config file: parse, query, mutate, serialize.

use std::path::{Path, PathBuf};

use bstr::{BStr, BString, ByteSlice};

use crate::{ConfigError, ConfigKey, ConfigScope};

/// One `key = value` entry. `value` is `None` for a bare key.
#[derive(Debug, Clone)]
struct Entry {
    key: ConfigKey,
    value: Option<BString>,
}

/// A parsed config file at one scope.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: Option<PathBuf>,
    scope: ConfigScope,
    entries: Vec<Entry>,
}

impl ConfigFile {
    /// An empty file for the given scope.
    pub fn empty(scope: ConfigScope) -> Self {
        Self {
            path: None,
            scope,
            entries: Vec::new(),
        }
    }

    /// Load and parse a file. A missing file parses as empty.
    pub fn load(path: &Path, scope: ConfigScope) -> Result<Self, ConfigError> {
        let content = match std::fs::read(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let mut file = Self::parse(&content, scope)?;
        file.path = Some(path.to_path_buf());
        Ok(file)
    }

    /// Parse raw config syntax.
    pub fn parse(content: &[u8], scope: ConfigScope) -> Result<Self, ConfigError> {
        let mut entries = Vec::new();
        let mut section: Option<(BString, Option<BString>)> = None;

        for (lineno, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line[0] == b'#' || line[0] == b';' {
                continue;
            }

            if line[0] == b'[' {
                section = Some(parse_section_header(line, lineno + 1)?);
                continue;
            }

            let (section_name, subsection) =
                section.clone().ok_or_else(|| ConfigError::Parse {
                    line: lineno + 1,
                    reason: "key outside any section".into(),
                })?;

            let (name, value) = parse_key_line(line, lineno + 1)?;
            entries.push(Entry {
                key: ConfigKey {
                    section: section_name,
                    subsection,
                    name,
                },
                value,
            });
        }

        Ok(Self {
            path: None,
            scope,
            entries,
        })
    }

    pub fn scope(&self) -> ConfigScope {
        self.scope
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Last value for a key. Outer `None` = key absent; inner `None` = key
    /// present without a value.
    pub fn get(&self, key: &ConfigKey) -> Option<Option<&BStr>> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.key == *key)
            .map(|e| e.value.as_ref().map(|v| v.as_bstr()))
    }

    /// Set a key, replacing any previous occurrences.
    pub fn set(&mut self, key: &ConfigKey, value: &BStr) {
        self.entries.retain(|e| e.key != *key);
        self.entries.push(Entry {
            key: key.clone(),
            value: Some(BString::from(value.as_bytes())),
        });
    }

    /// Remove all occurrences of a key. Returns whether any existed.
    pub fn remove(&mut self, key: &ConfigKey) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.key != *key);
        self.entries.len() != before
    }

    /// Serialize to config syntax, grouping entries by section in first-seen
    /// order.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut sections: Vec<(&BString, &Option<BString>)> = Vec::new();
        for entry in &self.entries {
            let sec = (&entry.key.section, &entry.key.subsection);
            if !sections.contains(&sec) {
                sections.push(sec);
            }
        }

        for (section, subsection) in sections {
            out.push(b'[');
            out.extend_from_slice(section);
            if let Some(sub) = subsection {
                out.extend_from_slice(b" \"");
                out.extend_from_slice(sub);
                out.push(b'"');
            }
            out.extend_from_slice(b"]\n");

            for entry in &self.entries {
                if entry.key.section == *section && entry.key.subsection == *subsection {
                    out.push(b'\t');
                    out.extend_from_slice(&entry.key.name);
                    if let Some(value) = &entry.value {
                        out.extend_from_slice(b" = ");
                        out.extend_from_slice(value);
                    }
                    out.push(b'\n');
                }
            }
        }

        out
    }

    /// Write the serialized form to the given path.
    pub fn write_to(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.serialize())?;
        Ok(())
    }
}

/// Parse `[section]` or `[section "subsection"]`.
fn parse_section_header(
    line: &[u8],
    lineno: usize,
) -> Result<(BString, Option<BString>), ConfigError> {
    let close = line
        .find_byte(b']')
        .ok_or_else(|| ConfigError::Parse {
            line: lineno,
            reason: "unterminated section header".into(),
        })?;
    let inner = line[1..close].trim();

    if let Some(quote) = inner.find_byte(b'"') {
        let section = inner[..quote].trim();
        let rest = &inner[quote + 1..];
        let end_quote = rest.find_byte(b'"').ok_or_else(|| ConfigError::Parse {
            line: lineno,
            reason: "unterminated subsection".into(),
        })?;
        Ok((
            section.to_ascii_lowercase().into(),
            Some(BString::from(&rest[..end_quote])),
        ))
    } else {
        Ok((inner.to_ascii_lowercase().into(), None))
    }
}

/// Parse `name = value` or a bare `name`.
fn parse_key_line(
    line: &[u8],
    lineno: usize,
) -> Result<(BString, Option<BString>), ConfigError> {
    let (name, value) = match line.find_byte(b'=') {
        Some(eq) => {
            let mut value = line[eq + 1..].trim();
            // Trailing comments; quoting is respected only at the ends.
            if let Some(comment) = value.iter().position(|&b| b == b'#' || b == b';') {
                if !value.starts_with(b"\"") {
                    value = value[..comment].trim();
                }
            }
            let value = if value.len() >= 2 && value[0] == b'"' && value[value.len() - 1] == b'"'
            {
                &value[1..value.len() - 1]
            } else {
                value
            };
            (line[..eq].trim(), Some(BString::from(value)))
        }
        None => (line, None),
    };

    if name.is_empty()
        || !name
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'-')
    {
        return Err(ConfigError::Parse {
            line: lineno,
            reason: format!("invalid key name: {:?}", name.as_bstr()),
        });
    }

    Ok((name.to_ascii_lowercase().into(), value))
}
