//! Status glyphs shared by the `status`, `engines` and `recognize` output.

use console::{style, StyledObject};

type Glyph = StyledObject<&'static str>;

/// Recognition finished or an engine is usable.
pub fn success() -> Glyph {
    style("✓").green()
}

/// Work is starting.
pub fn info() -> Glyph {
    style("→").cyan()
}

/// Degraded but continuing, e.g. in-process fallback or a rejected language.
pub fn warn() -> Glyph {
    style("!").yellow()
}

/// Engine missing or initialization refused.
pub fn error() -> Glyph {
    style("✗").red()
}

/// Indented detail under a status line.
pub fn dim_arrow() -> Glyph {
    style("→").dim()
}

/// Yes/no marker for capability tables.
pub fn flag(value: bool) -> Glyph {
    if value {
        style("yes").green()
    } else {
        style("no").dim()
    }
}
