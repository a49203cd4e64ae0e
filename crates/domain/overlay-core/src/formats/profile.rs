use crate::{Action, ConfigError};
use camino::Utf8Path;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fmt;

/// Top level of a profile file:
///
/// ```yaml
/// actions:
///   shot:
///     label: Screenshot
///     command: magick import screen.png
///     cwd: C:/captures
/// ```
#[derive(Debug, Default, Deserialize)]
struct ProfileDocument {
    #[serde(default, deserialize_with = "ordered_entries")]
    actions: Vec<(String, Option<ActionEntry>)>,
}

#[derive(Debug, Deserialize)]
struct ActionEntry {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    cwd: Option<String>,
}

/// Keeps declaration order and rejects duplicate keys instead of letting the last one win.
fn ordered_entries<'de, D>(deserializer: D) -> Result<Vec<(String, Option<ActionEntry>)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<(String, Option<ActionEntry>)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping of action keys to action definitions")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut seen = HashSet::new();
            let mut entries = Vec::new();
            while let Some((key, entry)) = map.next_entry::<String, Option<ActionEntry>>()? {
                if !seen.insert(key.clone()) {
                    return Err(de::Error::custom(format!("duplicate action '{key}'")));
                }
                entries.push((key, entry));
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_any(EntriesVisitor)
}

/// Parses profile text into actions, in declaration order.
///
/// Fails on the first action without a usable command; no partial list is returned.
pub fn parse_profile(text: &str) -> Result<Vec<Action>, ConfigError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let doc: Option<ProfileDocument> = serde_yaml::from_str(text)?;
    let doc = doc.unwrap_or_default();

    doc.actions
        .into_iter()
        .map(|(id, entry)| {
            let entry = entry.ok_or_else(|| ConfigError::MissingCommand { id: id.clone() })?;
            let command = entry
                .command
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingCommand { id: id.clone() })?;

            Ok(Action {
                label: entry.label.unwrap_or_else(|| id.clone()),
                id,
                command,
                working_dir: entry.cwd,
            })
        })
        .collect()
}

pub fn load_profile(path: &Utf8Path) -> Result<Vec<Action>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_profile(&text)
}
