//! Fence stripping for model output.
//!
//! Models sometimes wrap otherwise-valid JSON in a markdown code block even
//! when asked for raw JSON. Only a leading ```` ```json ```` and a trailing
//! ```` ``` ```` are removed, each anchored at the string boundary.

use regex_lite::Regex;
use std::sync::LazyLock;

static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```json\s*").expect("valid leading fence pattern"));
static TRAILING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*```$").expect("valid trailing fence pattern"));

/// Strip code fences from already-trimmed model output.
pub fn strip_fences(trimmed: &str) -> String {
    let without_leading = LEADING_FENCE.replace(trimmed, "");
    TRAILING_FENCE.replace(&without_leading, "").into_owned()
}
