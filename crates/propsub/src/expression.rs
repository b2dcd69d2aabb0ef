//! `${...}` token syntax
//!
//! A line is split into [Segment]s:
//! - plain text
//! - the escape `$${`, which stands for a literal `${`
//! - [Token]s: `${keys}` or `${keys:default}`, where `keys` is a `,` separated list of alternatives
//!
//! Tokens nest (`${prefix.${inner}}`), the closing `}` of a token is found by counting the `${` opened inside it.
//! A `${` without a matching `}` is plain text.
//!
//! Splitting never allocates, all segments borrow from the scanned text.

pub const OPEN: &str = "${";
pub const ESCAPED_OPEN: &str = "$${";
const CLOSE: u8 = b'}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    /// `$${`, emitted as `${`
    Escaped,
    Token(Token<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// The complete token including delimiters
    pub raw: &'a str,
    keys: &'a str,
    pub default: Option<&'a str>,
}

impl<'a> Token<'a> {
    fn parse(raw: &'a str) -> Self {
        let inner = &raw[OPEN.len()..raw.len() - 1];

        match find_top_level(inner, b':') {
            Some(colon) => Self {
                raw,
                keys: &inner[..colon],
                default: Some(&inner[colon + 1..]),
            },
            None => Self {
                raw,
                keys: inner,
                default: None,
            },
        }
    }

    /// Alternative keys in order of preference
    ///
    /// Keys may still contain nested tokens.
    pub fn keys(&self) -> impl Iterator<Item = &'a str> {
        let keys = self.keys;
        let mut start = 0;
        let mut done = false;

        std::iter::from_fn(move || {
            if done {
                return None;
            }
            let rest = &keys[start..];
            match find_top_level(rest, b',') {
                Some(comma) => {
                    start += comma + 1;
                    Some(&rest[..comma])
                }
                None => {
                    done = true;
                    Some(rest)
                }
            }
        })
    }
}

/// Split text into segments
pub fn segments(text: &str) -> Segments<'_> {
    Segments { rest: text }
}

pub struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        if let Some(rest) = self.rest.strip_prefix(ESCAPED_OPEN) {
            self.rest = rest;
            return Some(Segment::Escaped);
        }

        if self.rest.starts_with(OPEN) {
            if let Some(close) = find_close(&self.rest[OPEN.len()..]) {
                let (raw, rest) = self.rest.split_at(OPEN.len() + close + 1);
                self.rest = rest;
                return Some(Segment::Token(Token::parse(raw)));
            }

            // unterminated, nothing after this point can be a token either
            let text = std::mem::take(&mut self.rest);
            return Some(Segment::Text(text));
        }

        let end = self
            .rest
            .char_indices()
            .skip(1)
            .map(|(index, _)| index)
            .find(|&index| is_marker(&self.rest[index..]))
            .unwrap_or(self.rest.len());

        let (text, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(Segment::Text(text))
    }
}

fn is_marker(text: &str) -> bool {
    text.starts_with(OPEN) || text.starts_with(ESCAPED_OPEN)
}

/// Index of the `}` closing a token whose body starts at `body`
fn find_close(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut index = 0;

    while index < bytes.len() {
        let rest = &bytes[index..];
        if rest.starts_with(ESCAPED_OPEN.as_bytes()) {
            index += ESCAPED_OPEN.len();
        } else if rest.starts_with(OPEN.as_bytes()) {
            depth += 1;
            index += OPEN.len();
        } else if bytes[index] == CLOSE {
            if depth == 0 {
                return Some(index);
            }
            depth -= 1;
            index += 1;
        } else {
            index += 1;
        }
    }

    None
}

/// Index of the first `separator` that isn't inside a nested token
fn find_top_level(body: &str, separator: u8) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut index = 0;

    while index < bytes.len() {
        let rest = &bytes[index..];
        if rest.starts_with(ESCAPED_OPEN.as_bytes()) {
            index += ESCAPED_OPEN.len();
        } else if rest.starts_with(OPEN.as_bytes()) {
            depth += 1;
            index += OPEN.len();
        } else if bytes[index] == CLOSE {
            depth = depth.saturating_sub(1);
            index += 1;
        } else if depth == 0 && bytes[index] == separator {
            return Some(index);
        } else {
            index += 1;
        }
    }

    None
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token(raw: &str) -> Token<'_> {
        match segments(raw).collect::<Vec<_>>().as_slice() {
            [Segment::Token(token)] => *token,
            other => panic!("expected a single token, got {other:?}"),
        }
    }

    #[test]
    fn plain_text() {
        assert_eq!(
            segments("no tokens $ here {}").collect::<Vec<_>>(),
            vec![Segment::Text("no tokens $ here {}")]
        );
        assert_eq!(segments("").count(), 0);
    }

    #[test]
    fn adjacent_tokens() {
        let found: Vec<_> = segments("a${x}${y}b").collect();
        assert_eq!(
            found,
            vec![
                Segment::Text("a"),
                Segment::Token(token("${x}")),
                Segment::Token(token("${y}")),
                Segment::Text("b"),
            ]
        );
    }

    #[test]
    fn escape() {
        assert_eq!(
            segments("cost $${price} $$x").collect::<Vec<_>>(),
            vec![
                Segment::Text("cost "),
                Segment::Escaped,
                Segment::Text("price} $$x"),
            ]
        );
    }

    #[test]
    fn nested_token_is_one_segment() {
        let t = token("${db.${env}.host:${fallback}}");
        assert_eq!(t.keys().collect::<Vec<_>>(), vec!["db.${env}.host"]);
        assert_eq!(t.default, Some("${fallback}"));
    }

    #[test]
    fn alternatives() {
        let t = token("${first,second,${third:x}:none}");
        assert_eq!(
            t.keys().collect::<Vec<_>>(),
            vec!["first", "second", "${third:x}"]
        );
        assert_eq!(t.default, Some("none"));
    }

    #[test]
    fn empty_default() {
        let t = token("${key:}");
        assert_eq!(t.keys().collect::<Vec<_>>(), vec!["key"]);
        assert_eq!(t.default, Some(""));
    }

    #[test]
    fn unterminated() {
        assert_eq!(
            segments("x=${open ${closed}").collect::<Vec<_>>(),
            vec![Segment::Text("x="), Segment::Text("${open ${closed}")]
        );
    }

    #[test]
    fn multibyte_text() {
        assert_eq!(
            segments("€${k}ü").collect::<Vec<_>>(),
            vec![
                Segment::Text("€"),
                Segment::Token(token("${k}")),
                Segment::Text("ü")
            ]
        );
    }
}
