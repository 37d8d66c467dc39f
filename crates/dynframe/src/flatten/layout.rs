//! Per-field layout annotations.
//!
//! An annotation is a comma separated tag with up to three segments:
//!
//! ```text
//! rename,layoutModifier,leadMarker
//! ```
//!
//! - `rename`: emitted field name (blank keeps the source name)
//! - `layoutModifier`: only `omitparent` is recognized; it drops the
//!   nesting prefix for the field's descendants
//! - `leadMarker`: any non-blank value moves the field to the first column
//!
//! Trailing and blank segments mean "no override".

use std::convert::Infallible;
use std::str::FromStr;

use tracing::debug;

/// Modifier that resets the nesting prefix for a field's descendants.
pub const OMIT_PARENT: &str = "omitparent";

/// Parsed layout annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    /// Emitted name, overriding the source field name.
    pub rename: Option<String>,
    /// Descendants are named without this field's prefix.
    pub omit_parent: bool,
    /// This field becomes the first column of the table.
    pub lead: bool,
}

impl Layout {
    /// Parse an annotation tag. Never fails: unknown modifiers are ignored.
    pub fn parse(tag: &str) -> Self {
        let mut segments = tag.splitn(3, ',').map(str::trim);

        let rename = segments
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let omit_parent = match segments.next() {
            Some(OMIT_PARENT) => true,
            Some("") | None => false,
            Some(other) => {
                debug!("Ignoring unknown layout modifier '{}' in tag '{}'", other, tag);
                false
            }
        };

        let lead = segments.next().is_some_and(|s| !s.is_empty());

        Self {
            rename,
            omit_parent,
            lead,
        }
    }

    /// Check if the annotation changes nothing.
    pub fn is_default(&self) -> bool {
        self == &Self::default()
    }

    /// Name to emit for a field whose source name is `source_name`.
    pub fn resolve<'a>(&'a self, source_name: &'a str) -> &'a str {
        self.rename.as_deref().unwrap_or(source_name)
    }
}

impl FromStr for Layout {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}
