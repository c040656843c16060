//! Bracketed list text format.
//!
//! Ancestry chains and card-type grant sets are persisted as
//! comma-joined bracketed tokens:
//!
//! ```text
//! [admin],[reseller1],[reseller1_sub]
//! ```
//!
//! Decoding extracts every non-empty `[...]` token left to right and trims
//! it. Anything between tokens (commas, stray text) is ignored, and input
//! with no well-formed token decodes to an empty list. Decoding never fails.

/// Decodes a bracketed list into its tokens.
///
/// A token runs from a `[` to the next `]`; its content may itself contain
/// `[`. Tokens that are empty after trimming are dropped.
///
/// # Example
///
/// ```
/// use agentree_types::bracket::decode;
///
/// assert_eq!(decode("[day], [ week ],[]"), vec!["day", "week"]);
/// assert!(decode("not a list").is_empty());
/// ```
#[must_use]
pub fn decode(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = raw;

    while let Some(open) = rest.find('[') {
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find(']') else {
            break;
        };

        if close == 0 {
            // "[]" cannot start a token; resume scanning at the ']'.
            rest = after_open;
            continue;
        }

        let token = after_open[..close].trim();
        if !token.is_empty() {
            tokens.push(token.to_string());
        }
        rest = &after_open[close + 1..];
    }

    tokens
}

/// Encodes tokens as a bracketed list.
///
/// Blank tokens are skipped. An empty input encodes to the empty string.
///
/// # Example
///
/// ```
/// use agentree_types::bracket::encode;
///
/// assert_eq!(encode(["day", "week"]), "[day],[week]");
/// assert_eq!(encode(Vec::<String>::new()), "");
/// ```
#[must_use]
pub fn encode<I, S>(tokens: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .filter(|t| !t.as_ref().trim().is_empty())
        .map(|t| format!("[{}]", t.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Returns `true` if `token` survives an encode/decode round-trip unchanged.
///
/// Names containing brackets or surrounding whitespace, and blank names,
/// cannot be represented in this format.
#[must_use]
pub fn is_encodable(token: &str) -> bool {
    !token.is_empty() && token.trim() == token && !token.contains(['[', ']'])
}
