//! Purpose: Format-preserving add/update/remove of single definitions in a config file.
//! Exports: `ConfigTransformer`, `TransformOptions`, `UpdateResult`, `KindFilter`, text-level helpers.
//! Role: Combines the definition locator and anchor resolver into whole-file rewrites.
//! Invariants: Bytes outside the edited statement (or the inserted text) are never changed.
//! Invariants: Each file operation is one read -> compute -> atomic replace cycle.
//! Invariants: Missing entries are only created when `add` is set.
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::anchor::{self, AnchorSpec};
use crate::core::error::{Error, ErrorKind};
use crate::core::file::ConfigSource;
use crate::core::locator::{self, Definition, DefinitionKind};

/// Which namespace(s) a lookup considers.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KindFilter {
    Constant,
    Variable,
    #[default]
    All,
}

impl KindFilter {
    pub fn matches(self, kind: DefinitionKind) -> bool {
        match self {
            KindFilter::Constant => kind == DefinitionKind::Constant,
            KindFilter::Variable => kind == DefinitionKind::Variable,
            KindFilter::All => true,
        }
    }
}

impl From<DefinitionKind> for KindFilter {
    fn from(kind: DefinitionKind) -> Self {
        match kind {
            DefinitionKind::Constant => KindFilter::Constant,
            DefinitionKind::Variable => KindFilter::Variable,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TransformOptions {
    /// Insert the value verbatim as an expression instead of a quoted string.
    pub raw: bool,
    /// Create the definition at the anchor when it does not exist yet.
    pub add: bool,
    /// Re-render the whole statement instead of swapping only its value.
    pub normalize: bool,
    pub anchor: AnchorSpec,
}

impl TransformOptions {
    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    pub fn with_add(mut self, add: bool) -> Self {
        self.add = add;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_anchor(mut self, anchor: AnchorSpec) -> Self {
        self.anchor = anchor;
        self
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct UpdateResult {
    pub created: bool,
}

/// Render a value for insertion: verbatim when raw, else a single-quoted literal.
pub fn render_value(value: &str, raw: bool) -> String {
    if raw {
        return value.to_string();
    }
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

pub fn render_statement(kind: DefinitionKind, name: &str, rendered_value: &str) -> String {
    match kind {
        DefinitionKind::Constant => {
            format!("define({}, {rendered_value});", render_value(name, false))
        }
        DefinitionKind::Variable => format!("${name} = {rendered_value};"),
    }
}

pub fn exists_in(source: &str, kind: DefinitionKind, name: &str) -> bool {
    locator::find(source, kind, name).is_some()
}

/// Narrow a filter to one kind; both kinds present under `All` is ambiguous.
pub fn resolve_kind_in(
    source: &str,
    filter: KindFilter,
    name: &str,
) -> Result<Option<DefinitionKind>, Error> {
    let has = |kind| filter.matches(kind) && exists_in(source, kind, name);
    match (has(DefinitionKind::Constant), has(DefinitionKind::Variable)) {
        (true, true) => Err(ambiguous_error(name)),
        (true, false) => Ok(Some(DefinitionKind::Constant)),
        (false, true) => Ok(Some(DefinitionKind::Variable)),
        (false, false) => Ok(None),
    }
}

pub fn update_source(
    source: &str,
    kind: DefinitionKind,
    name: &str,
    value: &str,
    options: &TransformOptions,
) -> Result<(String, UpdateResult), Error> {
    validate_name(kind, name)?;
    let rendered = render_value(value, options.raw);

    if let Some(existing) = locator::find(source, kind, name) {
        let count = locator::occurrences(source, kind, name);
        if count > 1 {
            warn!(%kind, definition = name, count, "multiple definitions found; updating the last one");
        }
        let (range, replacement) = if options.normalize {
            (existing.span.clone(), render_statement(kind, name, &rendered))
        } else {
            (existing.value_span.clone(), rendered)
        };
        debug!(%kind, definition = name, start = range.start, end = range.end, "updating definition");
        return Ok((splice(source, range, &replacement), UpdateResult { created: false }));
    }

    if !options.add {
        return Err(not_found_error(kind, name)
            .with_hint("Drop --no-add to create it, or check --type."));
    }

    let offset = anchor::locate(source, &options.anchor)?;
    let separator = options.anchor.separator.as_str();
    let mut insertion = String::new();
    if offset > 0 && !source[..offset].ends_with('\n') {
        insertion.push_str(separator);
    }
    insertion.push_str(&render_statement(kind, name, &rendered));
    insertion.push_str(separator);
    debug!(%kind, definition = name, offset, "inserting definition at anchor");
    Ok((
        splice(source, offset..offset, &insertion),
        UpdateResult { created: true },
    ))
}

pub fn remove_source(source: &str, kind: DefinitionKind, name: &str) -> Result<String, Error> {
    let existing = locator::find(source, kind, name).ok_or_else(|| not_found_error(kind, name))?;
    let range = removal_range(source, &existing.span);
    debug!(%kind, definition = name, start = range.start, end = range.end, "removing definition");
    Ok(splice(source, range, ""))
}

// Whole line when the statement stands alone on it (a trailing line comment goes too);
// otherwise just the statement and the horizontal whitespace joining it to its neighbour.
fn removal_range(source: &str, span: &Range<usize>) -> Range<usize> {
    let is_horizontal = |c: char| c == ' ' || c == '\t';
    let line_start = source[..span.start].rfind('\n').map_or(0, |idx| idx + 1);
    let lead = &source[line_start..span.start];
    let lead_blank = lead.chars().all(is_horizontal);

    let rest = &source[span.end..];
    let line_len = rest.find('\n').map_or(rest.len(), |idx| idx + 1);
    let tail = rest[..line_len]
        .trim_end_matches(['\n', '\r'])
        .trim_start_matches(is_horizontal);
    let tail_blank = tail.is_empty()
        || ((tail.starts_with("//") || tail.starts_with('#')) && !tail.contains("?>"));

    if lead_blank && tail_blank {
        return line_start..span.end + line_len;
    }
    if lead_blank {
        let trailing = rest.len() - rest.trim_start_matches(is_horizontal).len();
        return span.start..span.end + trailing;
    }
    let leading = lead.len() - lead.trim_end_matches(is_horizontal).len();
    span.start - leading..span.end
}

fn splice(source: &str, range: Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(source.len() + replacement.len());
    out.push_str(&source[..range.start]);
    out.push_str(replacement);
    out.push_str(&source[range.end..]);
    out
}

fn validate_name(kind: DefinitionKind, name: &str) -> Result<(), Error> {
    let valid = match kind {
        DefinitionKind::Constant => !name.is_empty(),
        DefinitionKind::Variable => {
            let mut chars = name.chars();
            chars
                .next()
                .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
    };
    if valid {
        return Ok(());
    }
    Err(Error::new(ErrorKind::Usage)
        .with_message(format!("invalid {kind} name"))
        .with_name(name))
}

fn not_found_error(kind: DefinitionKind, name: &str) -> Error {
    Error::new(ErrorKind::NotFound)
        .with_message(format!("the {kind} '{name}' is not defined"))
        .with_name(name)
}

fn ambiguous_error(name: &str) -> Error {
    Error::new(ErrorKind::AmbiguousKind)
        .with_message(format!("found both a constant and a variable '{name}'"))
        .with_name(name)
        .with_hint("Use --type=constant or --type=variable to disambiguate.")
}

/// File-bound transformer; every call re-reads the file.
#[derive(Clone, Debug)]
pub struct ConfigTransformer {
    path: PathBuf,
}

impl ConfigTransformer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self, kind: DefinitionKind, name: &str) -> Result<bool, Error> {
        let source = ConfigSource::read(&self.path)?;
        Ok(exists_in(source.text(), kind, name))
    }

    pub fn get(&self, kind: DefinitionKind, name: &str) -> Result<Option<Definition>, Error> {
        let source = ConfigSource::read(&self.path)?;
        Ok(locator::find(source.text(), kind, name))
    }

    pub fn definitions(&self) -> Result<Vec<Definition>, Error> {
        let source = ConfigSource::read(&self.path)?;
        Ok(locator::find_all(source.text()))
    }

    pub fn resolve_kind(
        &self,
        filter: KindFilter,
        name: &str,
    ) -> Result<Option<DefinitionKind>, Error> {
        let source = ConfigSource::read(&self.path)?;
        resolve_kind_in(source.text(), filter, name).map_err(|err| err.with_path(&self.path))
    }

    pub fn update(
        &self,
        kind: DefinitionKind,
        name: &str,
        value: &str,
        options: &TransformOptions,
    ) -> Result<UpdateResult, Error> {
        let source = ConfigSource::read(&self.path)?;
        let (contents, result) = update_source(source.text(), kind, name, value, options)
            .map_err(|err| err.with_path(&self.path))?;
        source.replace(&contents)?;
        Ok(result)
    }

    /// Apply several updates of the same kind in one read/replace cycle.
    pub fn update_all(
        &self,
        kind: DefinitionKind,
        entries: &[(&str, &str)],
        options: &TransformOptions,
    ) -> Result<Vec<UpdateResult>, Error> {
        let source = ConfigSource::read(&self.path)?;
        let mut contents = source.text().to_string();
        let mut results = Vec::with_capacity(entries.len());
        for (name, value) in entries {
            let (next, result) = update_source(&contents, kind, name, value, options)
                .map_err(|err| err.with_path(&self.path))?;
            contents = next;
            results.push(result);
        }
        source.replace(&contents)?;
        Ok(results)
    }

    pub fn remove(&self, kind: DefinitionKind, name: &str) -> Result<(), Error> {
        let source = ConfigSource::read(&self.path)?;
        let contents =
            remove_source(source.text(), kind, name).map_err(|err| err.with_path(&self.path))?;
        source.replace(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::anchor::Placement;
    use crate::core::locator::DefinitionValue;

    const CONFIG: &str = "<?php\n\
define( 'DB_NAME', 'old' );\n\
define( 'DB_USER', 'root' ); // who\n\
$table_prefix = 'wp_';\n\
\n\
/* That's all, stop editing! Happy publishing. */\n\
require_once ABSPATH . 'wp-settings.php';\n";

    fn add() -> TransformOptions {
        TransformOptions::default().with_add(true)
    }

    #[test]
    fn update_swaps_only_the_value() {
        let (out, result) =
            update_source(CONFIG, DefinitionKind::Constant, "DB_NAME", "new", &add()).expect("ok");
        assert!(!result.created);
        assert_eq!(out, CONFIG.replace("'old'", "'new'"));
    }

    #[test]
    fn normalize_rewrites_the_statement() {
        let options = add().with_normalize(true);
        let (out, _) =
            update_source(CONFIG, DefinitionKind::Constant, "DB_NAME", "new", &options).expect("ok");
        assert!(out.contains("\ndefine('DB_NAME', 'new');\n"));
    }

    #[test]
    fn raw_insert_goes_before_anchor() {
        let options = add().with_raw(true);
        let (out, result) =
            update_source(CONFIG, DefinitionKind::Constant, "WP_DEBUG", "true", &options).expect("ok");
        assert!(result.created);
        assert_eq!(
            out,
            CONFIG.replace(
                "/* That's all",
                "define('WP_DEBUG', true);\n/* That's all"
            )
        );
    }

    #[test]
    fn insert_after_anchor_with_custom_separator() {
        let anchor = AnchorSpec::default()
            .with_placement(Placement::After)
            .with_separator("\n\n");
        let options = add().with_anchor(anchor);
        let (out, _) =
            update_source(CONFIG, DefinitionKind::Variable, "x", "1", &options).expect("ok");
        assert!(out.contains("publishing. */\n$x = '1';\n\nrequire_once"));
    }

    #[test]
    fn missing_without_add_is_not_found() {
        let err = update_source(
            CONFIG,
            DefinitionKind::Constant,
            "NOPE",
            "v",
            &TransformOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn missing_anchor_fails_insert() {
        let err = update_source("<?php\n", DefinitionKind::Constant, "A", "b", &add()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AnchorNotFound);
    }

    #[test]
    fn values_round_trip_through_the_locator() {
        for value in ["plain", "it's", r"back\slash", r"\'", "", "multi\nline", "$dollar"] {
            let (out, _) =
                update_source(CONFIG, DefinitionKind::Constant, "DB_NAME", value, &add()).expect("ok");
            let found = locator::find(&out, DefinitionKind::Constant, "DB_NAME").expect("found");
            assert_eq!(found.value, DefinitionValue::Quoted(value.to_string()), "value {value:?}");
        }
    }

    #[test]
    fn remove_drops_the_whole_line_and_comment() {
        let out = remove_source(CONFIG, DefinitionKind::Constant, "DB_USER").expect("ok");
        assert_eq!(out, CONFIG.replace("define( 'DB_USER', 'root' ); // who\n", ""));
    }

    #[test]
    fn remove_keeps_neighbours_on_the_same_line() {
        let src = "<?php\n$a = 1; $b = 2;\n$c = 3;  $d = 4; // d\n";
        let out = remove_source(src, DefinitionKind::Variable, "b").expect("ok");
        assert_eq!(out, "<?php\n$a = 1;\n$c = 3;  $d = 4; // d\n");
        let out = remove_source(&out, DefinitionKind::Variable, "c").expect("ok");
        assert_eq!(out, "<?php\n$a = 1;\n$d = 4; // d\n");
    }

    #[test]
    fn remove_twice_is_not_found() {
        let out = remove_source(CONFIG, DefinitionKind::Variable, "table_prefix").expect("ok");
        let err = remove_source(&out, DefinitionKind::Variable, "table_prefix").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn duplicate_definitions_update_the_last() {
        let src = "<?php\ndefine('X', 'a');\ndefine('X', 'b');\n";
        let (out, _) =
            update_source(src, DefinitionKind::Constant, "X", "c", &add()).expect("ok");
        assert_eq!(out, "<?php\ndefine('X', 'a');\ndefine('X', 'c');\n");
    }

    #[test]
    fn ambiguity_needs_an_explicit_kind() {
        let src = "<?php\n$DB_PASSWORD = 'a';\ndefine('DB_PASSWORD', 'b');\n";
        let err = resolve_kind_in(src, KindFilter::All, "DB_PASSWORD").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousKind);
        assert_eq!(
            resolve_kind_in(src, KindFilter::Variable, "DB_PASSWORD").expect("ok"),
            Some(DefinitionKind::Variable)
        );
        assert_eq!(
            resolve_kind_in(CONFIG, KindFilter::All, "DB_PASSWORD").expect("ok"),
            None
        );
    }

    #[test]
    fn invalid_variable_names_are_rejected() {
        let err = update_source(CONFIG, DefinitionKind::Variable, "1abc", "v", &add()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn file_round_trip() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("wp-config.php");
        std::fs::write(&path, CONFIG).expect("write");
        let transformer = ConfigTransformer::new(&path);

        assert!(!transformer.exists(DefinitionKind::Constant, "WP_DEBUG").expect("exists"));
        let result = transformer
            .update(DefinitionKind::Constant, "WP_DEBUG", "true", &add().with_raw(true))
            .expect("update");
        assert!(result.created);
        assert!(transformer.exists(DefinitionKind::Constant, "WP_DEBUG").expect("exists"));

        transformer
            .remove(DefinitionKind::Constant, "WP_DEBUG")
            .expect("remove");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), CONFIG);
    }

    #[test]
    fn update_all_writes_once() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("wp-config.php");
        std::fs::write(&path, CONFIG).expect("write");
        let transformer = ConfigTransformer::new(&path);

        let results = transformer
            .update_all(
                DefinitionKind::Constant,
                &[("DB_NAME", "new"), ("AUTH_KEY", "k'1")],
                &add(),
            )
            .expect("update");
        assert_eq!(
            results,
            vec![UpdateResult { created: false }, UpdateResult { created: true }]
        );
        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.contains("define( 'DB_NAME', 'new' );"));
        assert_eq!(
            locator::find(&text, DefinitionKind::Constant, "AUTH_KEY").map(|def| def.value),
            Some(DefinitionValue::Quoted("k'1".into()))
        );
    }
}
