//! Longest-common-substring decomposition and the regexes built from it.
//!
//! A decomposition of two strings is a list of fragments: literal runs both
//! strings share, in order, with `""` standing for a gap where they differ.
//! `decompose("xcci", "xbbi")` is `["x", "", "i"]`, which becomes the
//! anchored regex `^x(?s:.*)i$`.

/// Regex fragment emitted for a gap between literals.
pub const WILDCARD: &str = "(?s:.*)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Lit(char),
    Wild,
}

impl Token {
    /// Gaps never match anything, including other gaps.
    fn same(self, other: Self) -> bool {
        matches!((self, other), (Self::Lit(a), Self::Lit(b)) if a == b)
    }
}

/// A sequence of literal characters and gaps accepting a family of strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Template {
    tokens: Vec<Token>,
}

impl Template {
    /// Template accepting exactly `text`.
    pub(crate) fn literal(text: &str) -> Self {
        Self {
            tokens: text.chars().map(Token::Lit).collect(),
        }
    }

    /// The most specific template accepting everything `self` and `other` accept.
    pub(crate) fn generalize(&self, other: &Self) -> Self {
        let mut tokens = Vec::with_capacity(self.tokens.len().max(other.tokens.len()));
        generalize_into(&self.tokens, &other.tokens, &mut tokens);
        Self { tokens }
    }

    /// Whether at least one literal character survived generalization.
    pub(crate) fn has_literal(&self) -> bool {
        self.tokens.iter().any(|t| matches!(t, Token::Lit(_)))
    }

    /// Literal runs and `""` gap markers.
    pub(crate) fn fragments(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut run = String::new();
        for token in &self.tokens {
            match token {
                Token::Lit(c) => run.push(*c),
                Token::Wild => {
                    if !run.is_empty() {
                        out.push(std::mem::take(&mut run));
                    }
                    out.push(String::new());
                }
            }
        }
        if !run.is_empty() {
            out.push(run);
        }
        out
    }

    pub(crate) fn to_regex(&self) -> String {
        regexpify(&self.fragments())
    }
}

fn generalize_into(a: &[Token], b: &[Token], out: &mut Vec<Token>) {
    if a.is_empty() && b.is_empty() {
        return;
    }
    if a.is_empty() || b.is_empty() {
        out.push(Token::Wild);
        return;
    }
    let Some((i, j, len)) = longest_common_run(a, b) else {
        out.push(Token::Wild);
        return;
    };
    generalize_into(&a[..i], &b[..j], out);
    out.extend_from_slice(&a[i..i + len]);
    generalize_into(&a[i + len..], &b[j + len..], out);
}

/// Longest shared run as `(start in a, start in b, length)`.
///
/// Ties go to the earliest start in `a`, then the earliest start in `b`.
fn longest_common_run(a: &[Token], b: &[Token]) -> Option<(usize, usize, usize)> {
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    let mut best: Option<(usize, usize, usize)> = None;

    for (i, &ta) in a.iter().enumerate() {
        for (j, &tb) in b.iter().enumerate() {
            cur[j + 1] = if ta.same(tb) { prev[j] + 1 } else { 0 };
            let len = cur[j + 1];
            if len > best.map_or(0, |(_, _, l)| l) {
                best = Some((i + 1 - len, j + 1 - len, len));
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    best
}

/// Splits two strings into shared literal fragments and `""` gaps.
///
/// # Examples
///
/// ```
/// use expects::synthesis::decompose;
///
/// assert_eq!(decompose("moi", "moi"), vec!["moi"]);
/// assert_eq!(decompose("abba", "baba"), vec!["", "ab", "", "a"]);
/// assert_eq!(decompose("xyz", "abc"), vec![""]);
/// ```
#[must_use]
pub fn decompose(a: &str, b: &str) -> Vec<String> {
    Template::literal(a)
        .generalize(&Template::literal(b))
        .fragments()
}

/// Returns the longest substring shared by `a` and `b` (empty if none).
#[must_use]
pub fn longest_common_substring(a: &str, b: &str) -> String {
    let ta = Template::literal(a).tokens;
    let tb = Template::literal(b).tokens;
    longest_common_run(&ta, &tb).map_or_else(String::new, |(i, _, len)| {
        a.chars().skip(i).take(len).collect()
    })
}

/// Builds an anchored regex from a decomposition.
#[must_use]
pub fn regexpify(fragments: &[String]) -> String {
    let mut pattern = String::from("^");
    for fragment in fragments {
        if fragment.is_empty() {
            pattern.push_str(WILDCARD);
        } else {
            pattern.push_str(&regex::escape(fragment));
        }
    }
    pattern.push('$');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, s: &str) -> bool {
        regex::Regex::new(pattern).unwrap().is_match(s)
    }

    #[test]
    fn test_identical_strings() {
        assert_eq!(decompose("moi", "moi"), vec!["moi"]);
    }

    #[test]
    fn test_nothing_in_common() {
        assert_eq!(decompose("xyz", "abc"), vec![""]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(decompose("", "").is_empty());
        assert_eq!(decompose("", "a"), vec![""]);
        assert_eq!(decompose("a", ""), vec![""]);
    }

    #[test]
    fn test_tie_breaks_on_earliest_in_first() {
        assert_eq!(decompose("abba", "baba"), vec!["", "ab", "", "a"]);
    }

    #[test]
    fn test_gap_in_the_middle() {
        assert_eq!(decompose("xcci", "xbbi"), vec!["x", "", "i"]);
        assert_eq!(decompose("abcXdef", "abcYdef"), vec!["abc", "", "def"]);
    }

    #[test]
    fn test_longest_common_substring() {
        assert_eq!(longest_common_substring("hello world", "yellow"), "ello");
        assert_eq!(longest_common_substring("abc", "xyz"), "");
    }

    #[test]
    fn test_regexpify_escapes_literals() {
        let pattern = regexpify(&decompose("a.b(1)", "a.b(2)"));
        assert_eq!(pattern, r"^a\.b\((?s:.*)\)$");
        assert!(matches(&pattern, "a.b(1)"));
        assert!(matches(&pattern, "a.b(22)"));
        assert!(!matches(&pattern, "aXb(1)"));
    }

    #[test]
    fn test_wildcard_spans_newlines() {
        let pattern = regexpify(&decompose("<p>1</p>", "<p>2</p>"));
        assert_eq!(pattern, "^<p>(?s:.*)</p>$");
        assert!(matches(&pattern, "<p>line\nbreak</p>"));
    }

    #[test]
    fn test_generalize_keeps_every_input() {
        let t = Template::literal("id-100-ok")
            .generalize(&Template::literal("id-2-ok"))
            .generalize(&Template::literal("id-33-fail"));
        let pattern = t.to_regex();
        for s in ["id-100-ok", "id-2-ok", "id-33-fail"] {
            assert!(matches(&pattern, s), "{pattern} should match {s}");
        }
        assert!(t.has_literal());
    }

    #[test]
    fn test_multibyte_text() {
        let pattern = regexpify(&decompose("päivää 1", "päivää 2"));
        assert!(matches(&pattern, "päivää 1"));
        assert!(matches(&pattern, "päivää 9"));
    }
}
