// Insertion anchor: the marker line new definitions are placed next to.
use serde::Serialize;

use crate::core::error::{Error, ErrorKind};

/// Marker line shipped in every generated config file.
pub const DEFAULT_ANCHOR: &str = "/* That's all, stop editing!";
/// Marker text that designates the end of the file instead of a line.
pub const EOF_ANCHOR: &str = "EOF";
pub const DEFAULT_SEPARATOR: &str = "\n";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    #[default]
    Before,
    After,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AnchorSpec {
    pub marker_text: String,
    pub placement: Placement,
    pub separator: String,
}

impl Default for AnchorSpec {
    fn default() -> Self {
        Self {
            marker_text: DEFAULT_ANCHOR.to_string(),
            placement: Placement::Before,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl AnchorSpec {
    pub fn new(marker_text: impl Into<String>) -> Self {
        Self {
            marker_text: marker_text.into(),
            ..Self::default()
        }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

/// Byte offset where a new definition goes.
pub fn locate(source: &str, anchor: &AnchorSpec) -> Result<usize, Error> {
    if anchor.marker_text == EOF_ANCHOR {
        return Ok(source.len());
    }
    if anchor.marker_text.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("anchor text must not be empty"));
    }

    let mut line_start = 0;
    for line in source.split_inclusive('\n') {
        let line_end = line_start + line.len();
        if line.contains(anchor.marker_text.as_str()) {
            return Ok(match anchor.placement {
                Placement::Before => line_start,
                Placement::After => line_end,
            });
        }
        line_start = line_end;
    }

    Err(Error::new(ErrorKind::AnchorNotFound)
        .with_message(format!(
            "unable to locate placement anchor `{}`",
            anchor.marker_text
        ))
        .with_hint("Pass --anchor with a line present in the file, or --anchor EOF to append."))
}
