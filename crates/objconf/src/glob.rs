// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Glob pattern analysis for remote listing
//!
//! Patterns understand three wildcards:
//! - `*` matches zero or more characters other than `/`
//! - `?` matches exactly one character other than `/`
//! - `{a,b,c}` matches exactly one of the literal alternatives (no nesting)
//!
//! A backslash makes the following `*`, `?`, `{`, `}`, `,` or `\` literal.
//!
//! The literal prefix of a pattern (everything before the first wildcard)
//! scopes the remote listing call; [`GlobPattern::matches`] then filters
//! the listed keys client-side.

use crate::error::{Error, Result};

/// Characters that may follow a backslash
const ESCAPABLE: [char; 6] = ['*', '?', '{', '}', ',', '\\'];

/// Key separator; `*` and `?` never match it
pub const DELIMITER: char = '/';

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    /// `*`
    AnyRun,
    /// `?`
    AnyOne,
    /// `{a,b}`
    Alternation(Vec<Vec<char>>),
}

/// Position of the first unescaped wildcard character
fn first_wildcard(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '*' | '?' | '{' => return Some(i),
            _ => {}
        }
    }
    None
}

/// True iff `s` contains an unescaped `*`, `?` or `{`
#[must_use]
pub fn has_wildcard(s: &str) -> bool {
    first_wildcard(s).is_some()
}

/// The raw substring before the first wildcard character
///
/// Returns `s` unchanged when it has no wildcard, and `""` when it starts
/// with one. Escapes are kept as written; see [`unescape`].
#[must_use]
pub fn literal_prefix(s: &str) -> &str {
    match first_wildcard(s) {
        Some(i) => &s[..i],
        None => s,
    }
}

/// Trim a prefix back to just after its last `/`
///
/// Delimiter-scoped listing APIs (directories, `object_store`) cannot
/// list by a partial path segment.
#[must_use]
pub fn align_to_delimiter(prefix: &str) -> &str {
    match prefix.rfind(DELIMITER) {
        Some(i) => &prefix[..=i],
        None => "",
    }
}

/// Remove escape backslashes from a literal string
#[must_use]
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Backslash-escape every glob metacharacter in `s`
#[must_use]
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if ESCAPABLE.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Check that `pattern` is well formed without keeping the compiled form
pub fn validate(pattern: &str) -> Result<()> {
    GlobPattern::parse(pattern).map(|_| ())
}

/// One-shot match of `key` against `pattern`
pub fn matches(pattern: &str, key: &str) -> Result<bool> {
    Ok(GlobPattern::parse(pattern)?.matches(key))
}

/// A compiled glob pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    source: String,
    tokens: Vec<Token>,
}

impl GlobPattern {
    /// Compile `pattern`, failing on unterminated or empty alternations,
    /// nested alternations and invalid escapes
    pub fn parse(pattern: &str) -> Result<Self> {
        let chars: Vec<(usize, char)> = pattern.char_indices().collect();
        let mut tokens = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let (pos, c) = chars[i];
            match c {
                '\\' => {
                    tokens.push(Token::Literal(escaped_char(pattern, &chars, i)?));
                    i += 2;
                }
                '*' => {
                    if tokens.last() != Some(&Token::AnyRun) {
                        tokens.push(Token::AnyRun);
                    }
                    i += 1;
                }
                '?' => {
                    tokens.push(Token::AnyOne);
                    i += 1;
                }
                '{' => {
                    let (alternatives, next) = parse_alternation(pattern, &chars, i)?;
                    if alternatives.len() == 1 && alternatives[0].is_empty() {
                        let end = chars.get(next - 1).map_or(pattern.len(), |(p, _)| p + 1);
                        return Err(Error::pattern(
                            pattern,
                            &pattern[pos..end],
                            "empty alternation",
                        ));
                    }
                    tokens.push(Token::Alternation(alternatives));
                    i = next;
                }
                other => {
                    tokens.push(Token::Literal(other));
                    i += 1;
                }
            }
        }

        Ok(Self {
            source: pattern.to_string(),
            tokens,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if the compiled pattern contains any wildcard
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.tokens.iter().any(|t| !matches!(t, Token::Literal(_)))
    }

    /// The literal prefix with escapes removed, ready to send to a backend
    #[must_use]
    pub fn key_prefix(&self) -> String {
        self.tokens
            .iter()
            .map_while(|t| match t {
                Token::Literal(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    /// Match the whole of `key` against the pattern
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        let key: Vec<char> = key.chars().collect();
        let n = key.len();

        // reach[j]: the tokens consumed so far can end at key position j
        let mut reach = vec![false; n + 1];
        reach[0] = true;

        for token in &self.tokens {
            let mut next = vec![false; n + 1];
            match token {
                Token::Literal(c) => {
                    for j in 0..n {
                        if reach[j] && key[j] == *c {
                            next[j + 1] = true;
                        }
                    }
                }
                Token::AnyOne => {
                    for j in 0..n {
                        if reach[j] && key[j] != DELIMITER {
                            next[j + 1] = true;
                        }
                    }
                }
                Token::AnyRun => {
                    for j in 0..=n {
                        next[j] = reach[j] || (j > 0 && next[j - 1] && key[j - 1] != DELIMITER);
                    }
                }
                Token::Alternation(alternatives) => {
                    for j in 0..=n {
                        if !reach[j] {
                            continue;
                        }
                        for alt in alternatives {
                            let end = j + alt.len();
                            if end <= n && key[j..end] == alt[..] {
                                next[end] = true;
                            }
                        }
                    }
                }
            }
            if !next.iter().any(|r| *r) {
                return false;
            }
            reach = next;
        }

        reach[n]
    }
}

impl std::fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn escaped_char(pattern: &str, chars: &[(usize, char)], i: usize) -> Result<char> {
    let (pos, _) = chars[i];
    match chars.get(i + 1) {
        None => Err(Error::pattern(pattern, &pattern[pos..], "trailing escape")),
        Some((_, next)) if ESCAPABLE.contains(next) => Ok(*next),
        Some((_, next)) => Err(Error::pattern(
            pattern,
            &pattern[pos..pos + 1 + next.len_utf8()],
            "invalid escape",
        )),
    }
}

/// Parse `{...}` starting at `chars[start]`; returns the alternatives and
/// the index just past the closing brace
fn parse_alternation(
    pattern: &str,
    chars: &[(usize, char)],
    start: usize,
) -> Result<(Vec<Vec<char>>, usize)> {
    let (open, _) = chars[start];
    let mut alternatives = Vec::new();
    let mut current = Vec::new();
    let mut j = start + 1;

    loop {
        let Some((pos, c)) = chars.get(j).copied() else {
            return Err(Error::pattern(
                pattern,
                &pattern[open..],
                "unterminated alternation",
            ));
        };
        match c {
            '}' => {
                alternatives.push(current);
                return Ok((alternatives, j + 1));
            }
            ',' => {
                alternatives.push(std::mem::take(&mut current));
                j += 1;
            }
            '{' => {
                return Err(Error::pattern(
                    pattern,
                    &pattern[open..=pos],
                    "nested alternation",
                ));
            }
            '\\' => {
                current.push(escaped_char(pattern, chars, j)?);
                j += 2;
            }
            other => {
                current.push(other);
                j += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_paths_have_no_wildcard() {
        for p in ["", "a", "data/file.csv", "/abs/path/x.parquet", "esc\\*aped"] {
            assert!(!has_wildcard(p), "{p}");
            assert_eq!(literal_prefix(p), p);
        }
    }

    #[test]
    fn test_literal_prefix() {
        assert_eq!(literal_prefix("a/b/*.parquet"), "a/b/");
        assert_eq!(literal_prefix("data/{2020,2021}/*.csv"), "data/");
        assert_eq!(literal_prefix("logs/day?.txt"), "logs/day");
        assert_eq!(literal_prefix("*.csv"), "");
        assert_eq!(literal_prefix("{a,b}"), "");
        assert_eq!(literal_prefix("x\\*y/*"), "x\\*y/");
    }

    #[test]
    fn test_align_to_delimiter() {
        assert_eq!(align_to_delimiter("data/fi"), "data/");
        assert_eq!(align_to_delimiter("data/"), "data/");
        assert_eq!(align_to_delimiter("file"), "");
    }

    #[test]
    fn test_alternation_matching() {
        let glob = GlobPattern::parse("data/{2020,2021}/*.csv").expect("valid");
        assert!(glob.matches("data/2020/jan.csv"));
        assert!(glob.matches("data/2021/.csv"));
        assert!(!glob.matches("data/2022/jan.csv"));
        assert!(!glob.matches("data/2020/jan.csv.gz"));
        assert!(!glob.matches("data/2020/sub/jan.csv"));
    }

    #[test]
    fn test_star_and_question_stop_at_delimiter() {
        assert_eq!(matches("a/*", "a/b/c").ok(), Some(false));
        assert_eq!(matches("a/*/c", "a/b/c").ok(), Some(true));
        assert_eq!(matches("a/?", "a/bc").ok(), Some(false));
        assert_eq!(matches("a?b", "a/b").ok(), Some(false));
        assert_eq!(matches("a*", "a").ok(), Some(true));
        assert_eq!(matches("**x", "abx").ok(), Some(true));
    }

    #[test]
    fn test_alternatives_share_prefix() {
        let glob = GlobPattern::parse("f{a,ab}c").expect("valid");
        assert!(glob.matches("fac"));
        assert!(glob.matches("fabc"));
        assert!(!glob.matches("fc"));

        let glob = GlobPattern::parse("f{,x}.csv").expect("valid");
        assert!(glob.matches("f.csv"));
        assert!(glob.matches("fx.csv"));
    }

    #[test]
    fn test_escapes_are_literal() {
        let glob = GlobPattern::parse("a\\*b\\{c\\}").expect("valid");
        assert!(!glob.has_wildcard());
        assert!(glob.matches("a*b{c}"));
        assert!(!glob.matches("axb{c}"));
        assert_eq!(glob.key_prefix(), "a*b{c}");
        assert_eq!(unescape("a\\*b"), "a*b");

        let root = "/srv/{team}/data?";
        assert!(!has_wildcard(&escape(root)));
        assert_eq!(unescape(&escape(root)), root);
    }

    #[test]
    fn test_unterminated_alternation_names_fragment() {
        let err = GlobPattern::parse("data/{2020,2021").expect_err("must fail");
        match err {
            Error::Pattern { fragment, reason, .. } => {
                assert_eq!(fragment, "{2020,2021");
                assert_eq!(reason, "unterminated alternation");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_malformed_patterns() {
        assert!(validate("a/{}").expect_err("empty").is_pattern());
        assert!(validate("a/{x,{y}}").expect_err("nested").is_pattern());
        assert!(validate("a\\").expect_err("trailing").is_pattern());
        assert!(validate("a\\n").expect_err("invalid escape").is_pattern());
        assert!(validate("a/}b").is_ok());
    }

    #[test]
    fn test_key_prefix_stops_at_first_wildcard() {
        let glob = GlobPattern::parse("data/{2020,2021}/*.csv").expect("valid");
        assert_eq!(glob.key_prefix(), "data/");
        assert_eq!(glob.as_str(), "data/{2020,2021}/*.csv");
        assert!(glob.has_wildcard());
    }

    #[test]
    fn test_many_stars_stay_linear() {
        let pattern = "*a*a*a*a*a*a*a*a*a*a*b";
        let key = "a".repeat(200);
        assert_eq!(matches(pattern, &key).ok(), Some(false));
    }
}
