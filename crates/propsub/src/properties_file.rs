//! loading external property files
//!
//! The format is picked by file extension:
//!
//! | extension       | format                                                  |
//! |-----------------|---------------------------------------------------------|
//! | `.json`         | JSON object, flattened (see [crate::value])             |
//! | `.yaml`, `.yml` | YAML mapping, flattened                                 |
//! | `.hcl`          | HCL attributes, flattened                               |
//! | anything else   | classic `key=value` properties, see [parse_properties]  |
//!
//! All formats are decoded with the run's [Encoding] before parsing.
use crate::encoding::Encoding;
use crate::properties::{ConfigurationError, Properties};
use crate::value::Value;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Properties,
    Json,
    Yaml,
    Hcl,
}

impl Format {
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());

        match extension.as_deref() {
            Some("json") => Format::Json,
            Some("yaml" | "yml") => Format::Yaml,
            Some("hcl") => Format::Hcl,
            _ => Format::Properties,
        }
    }
}

pub fn load(path: &Path, encoding: Encoding) -> Result<Properties, ConfigurationError> {
    tracing::info!(path=%path.display(), %encoding, "loading properties file");

    let bytes = std::fs::read(path).map_err(|source| ConfigurationError::Unreadable {
        path: path.to_owned(),
        source,
    })?;
    let text = encoding
        .decode(&bytes)
        .map_err(|source| ConfigurationError::Undecodable {
            path: path.to_owned(),
            source,
        })?;

    let invalid = |message: String| ConfigurationError::Invalid {
        path: path.to_owned(),
        message,
    };

    let value: Value = match Format::from_path(path) {
        Format::Properties => return Ok(parse_properties(&text)),
        Format::Json => serde_json::from_str::<serde_json::Value>(&text)
            .map_err(|e| invalid(e.to_string()))?
            .into(),
        Format::Yaml => serde_yaml::from_str::<serde_yaml::Value>(&text)
            .map_err(|e| invalid(e.to_string()))?
            .into(),
        Format::Hcl => hcl::from_str::<hcl::Value>(&text)
            .map_err(|e| invalid(e.to_string()))?
            .into(),
    };

    value
        .flatten()
        .ok_or_else(|| invalid("top level must be a mapping".into()))
}

/// Parse classic `key=value` properties
///
/// - blank lines and lines starting with `#` or `!` are ignored
/// - the key ends at the first unescaped `=`, `:` or whitespace
/// - a line ending in an odd number of `\` continues on the next line, leading whitespace of the continuation is
///   dropped
/// - escapes: `\t`, `\n`, `\r`, `\f`, `\uXXXX`, any other escaped character stands for itself
///
/// Later definitions of a key replace earlier ones.
pub fn parse_properties(text: &str) -> Properties {
    let mut entries: Vec<(String, String)> = vec![];
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let line = line.trim_start_matches(is_blank);
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let mut logical = line.to_string();
        while continues(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start_matches(is_blank)),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        entries.push((unescape(key), unescape(value)));
    }

    entries.into_iter().collect()
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0C')
}

fn continues(line: &str) -> bool {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    trailing % 2 == 1
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();

    for (index, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = index;
                break;
            }
            c if is_blank(c) => {
                key_end = index;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let rest = line[key_end..].trim_start_matches(is_blank);
    let rest = rest
        .strip_prefix('=')
        .or_else(|| rest.strip_prefix(':'))
        .unwrap_or(rest);

    (key, rest.trim_start_matches(is_blank))
}

fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }

        match chars.next() {
            Some('t') => result.push('\t'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('f') => result.push('\x0C'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => result.push(decoded),
                    None => {
                        tracing::debug!(escape = %hex, "invalid unicode escape kept verbatim");
                        result.push_str("\\u");
                        result.push_str(&hex);
                    }
                }
            }
            Some(other) => result.push(other),
            None => {}
        }
    }

    result
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entries(text: &str) -> Vec<(String, String)> {
        parse_properties(text)
            .into_iter()
            .collect()
    }

    fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn separators_and_comments() {
        let text = "# comment\n! also a comment\n\none=1\ntwo : 2\nthree 3\n  four=\n";
        assert_eq!(
            entries(text),
            pairs(&[("one", "1"), ("two", "2"), ("three", "3"), ("four", "")])
        );
    }

    #[test]
    fn continuation_lines() {
        let text = "list=a,\\\n    b,\\\n    c\nliteral=ends with \\\\\nnext=x\n";
        assert_eq!(
            entries(text),
            pairs(&[("list", "a,b,c"), ("literal", "ends with \\"), ("next", "x")])
        );
    }

    #[test]
    fn escapes() {
        let text = "key\\ with\\=specials=tab\\there\nunicode=caf\\u00e9\nexpr=${other}\n";
        assert_eq!(
            entries(text),
            pairs(&[
                ("key with=specials", "tab\there"),
                ("unicode", "café"),
                ("expr", "${other}")
            ])
        );
    }

    #[test]
    fn last_definition_wins() {
        let properties = parse_properties("k=1\nk=2\n");
        assert_eq!(properties.get("k"), Some("2"));
        assert_eq!(properties.len(), 1);
    }

    #[test]
    fn format_by_extension() {
        assert_eq!(Format::from_path(Path::new("a.JSON")), Format::Json);
        assert_eq!(Format::from_path(Path::new("a.yml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a.hcl")), Format::Hcl);
        assert_eq!(Format::from_path(Path::new("a.properties")), Format::Properties);
        assert_eq!(Format::from_path(Path::new("noextension")), Format::Properties);
    }
}
