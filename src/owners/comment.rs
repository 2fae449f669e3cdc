use std::sync::LazyLock;

use regex::Regex;

/// `/ok-to-test` alone on a line: at the start of the text or after a line
/// break, followed by a line break or the end of the text.
pub const TRUST_COMMENT_PATTERN: &str = r"(^|\n)/ok-to-test(\r\n|\r|\n|$)";

static TRUST_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TRUST_COMMENT_PATTERN).expect("static trust comment regex"));

/// Whether a comment body grants trust to the pull request it was posted on.
pub fn is_trust_comment(body: &str) -> bool {
    TRUST_COMMENT.is_match(body)
}
