// Environment snapshots and the differ that turns two of them into config entries.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered name -> value bindings (insertion order is declaration order).
pub type Bindings = Map<String, Value>;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct EnvironmentSnapshot {
    #[serde(default)]
    pub constants: Bindings,
    #[serde(default)]
    pub variables: Bindings,
    #[serde(default)]
    pub included_files: Vec<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Constant,
    Variable,
    Includes,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Constant => "constant",
            EntryKind::Variable => "variable",
            EntryKind::Includes => "includes",
        }
    }
}

/// One `{name, value, type}` record reported by introspection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfigEntry {
    pub name: String,
    pub value: Value,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// Keys present in `after` but not in `before`, minus `exclude`, in `after` order.
pub fn diff(
    before: &Bindings,
    after: &Bindings,
    kind: EntryKind,
    exclude: &[&str],
) -> Vec<ConfigEntry> {
    after
        .iter()
        .filter(|(name, _)| !before.contains_key(name.as_str()))
        .filter(|(name, _)| !exclude.contains(&name.as_str()))
        .map(|(name, value)| ConfigEntry {
            name: name.clone(),
            value: value.clone(),
            kind,
        })
        .collect()
}

/// Files loaded during execution, reported with their basename.
pub fn diff_includes(before: &[String], after: &[String]) -> Vec<ConfigEntry> {
    after
        .iter()
        .filter(|path| !before.contains(path))
        .map(|path| ConfigEntry {
            name: basename(path).to_string(),
            value: Value::String(path.clone()),
            kind: EntryKind::Includes,
        })
        .collect()
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
