//! expression resolution
//!
//! [Resolver::resolve] replaces every token of a line with the value of its key. The result only depends on the
//! [Properties] and the line.
//!
//! - values are expanded recursively, a value may reference other properties
//! - the first defined key of `${a,b}` wins, `${key:default}` falls back to `default` when no key is defined
//! - tokens without a defined key and without default are kept as they are
//! - `$${` turns into a literal `${`
//!
//! While a value is expanded its key is on the active path. A token referring to a key on the active path is treated
//! as undefined, which ends the cycle: with `a = ${b}` and `b = ${a}` the line `${a}` resolves to `${a}`. The same
//! happens to keys nested more than [MAX_DEPTH] levels deep and to keys found after [MAX_EXPANDED_LENGTH] bytes of
//! values were already pulled into the line.
use crate::expression::{segments, Segment, Token, OPEN};
use crate::properties::Properties;

/// A resolved line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'l> {
    pub original: &'l str,
    pub resolved: String,
    pub changed: bool,
}

impl<'l> Resolution<'l> {
    fn new(original: &'l str, resolved: String) -> Self {
        let changed = original != resolved;
        Self {
            original,
            resolved,
            changed,
        }
    }
}

/// Resolve a single line against `properties`
pub fn resolve<'l>(properties: &Properties, line: &'l str) -> Resolution<'l> {
    Resolver::new(properties).resolve(line)
}

/// Keys nested deeper than this are treated as undefined
pub const MAX_DEPTH: usize = 128;

/// Total length of property values a single line may pull in
///
/// Once used up, further tokens are treated as undefined. This bounds values that refer to the same key more than
/// once on every level (`a = ${b}${b}`, `b = ${c}${c}`, ...).
pub const MAX_EXPANDED_LENGTH: usize = 1 << 20;

#[derive(Debug, Clone, Copy, derive_new::new)]
pub struct Resolver<'p> {
    properties: &'p Properties,
}

/// State of a single [Resolver::resolve] call
struct Expansion {
    /// keys currently being expanded, outermost first
    active: Vec<String>,
    remaining: usize,
}

impl<'p> Resolver<'p> {
    pub fn resolve<'l>(&self, line: &'l str) -> Resolution<'l> {
        let mut expansion = Expansion {
            active: vec![],
            remaining: MAX_EXPANDED_LENGTH,
        };
        let resolved = self.expand(line, &mut expansion);
        Resolution::new(line, resolved)
    }

    fn expand(&self, text: &str, expansion: &mut Expansion) -> String {
        let mut result = String::with_capacity(text.len());

        for segment in segments(text) {
            match segment {
                Segment::Text(text) => result.push_str(text),
                Segment::Escaped => result.push_str(OPEN),
                Segment::Token(token) => match self.expand_token(&token, expansion) {
                    Some(value) => result.push_str(&value),
                    None => result.push_str(token.raw),
                },
            }
        }

        result
    }

    /// Returns [None] if the token stays unresolved
    fn expand_token(&self, token: &Token, expansion: &mut Expansion) -> Option<String> {
        for key in token.keys() {
            let key = self.expand(key, expansion);

            if expansion.active.contains(&key) {
                tracing::debug!(%key, path=?expansion.active, "cyclic reference");
                continue;
            }

            let Some(value) = self.properties.get(&key) else {
                continue;
            };

            if expansion.active.len() >= MAX_DEPTH {
                tracing::debug!(%key, depth = expansion.active.len(), "nesting too deep");
                continue;
            }

            let cost = value.len().max(1);
            if cost > expansion.remaining {
                tracing::debug!(%key, "expansion too long");
                continue;
            }
            expansion.remaining -= cost;

            expansion.active.push(key);
            let expanded = self.expand(value, expansion);
            expansion.active.pop();

            return Some(expanded);
        }

        token.default.map(|default| self.expand(default, expansion))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::properties;
    use pretty_assertions::assert_eq;

    fn resolved(properties: &Properties, line: &str) -> String {
        resolve(properties, line).resolved
    }

    #[test]
    fn no_tokens() {
        let properties = properties! {"name" => "world"};
        for line in ["", "plain text", "cost: $5 {braces}", "$ {name}", "${"] {
            let resolution = resolve(&properties, line);
            assert_eq!(resolution.resolved, line);
            assert!(!resolution.changed);
        }
    }

    #[test]
    fn replaces_every_token() {
        let properties = properties! {"a" => "1", "b" => "2", "name" => "world"};
        let resolution = resolve(&properties, "hello ${name}, ${a}${b} and ${a}");

        assert_eq!(resolution.original, "hello ${name}, ${a}${b} and ${a}");
        assert_eq!(resolution.resolved, "hello world, 12 and 1");
        assert!(resolution.changed);
    }

    #[test]
    fn idempotent_once_resolved() {
        let properties = properties! {"name" => "world"};
        let once = resolved(&properties, "hello ${name}");
        let twice = resolve(&properties, &once);

        assert_eq!(twice.resolved, once);
        assert!(!twice.changed);
    }

    #[test]
    fn missing_key_passes_through() {
        let resolution = resolve(&properties!(), "x=${undefined}");
        assert_eq!(resolution.resolved, "x=${undefined}");
        assert!(!resolution.changed);
    }

    #[test]
    fn partially_defined_line() {
        let properties = properties! {"known" => "yes"};
        assert_eq!(
            resolved(&properties, "${known} ${unknown}"),
            "yes ${unknown}"
        );
    }

    #[test]
    fn nested_values() {
        let properties = properties! {
            "greeting" => "hello ${name}",
            "name" => "${first} ${last}",
            "first" => "Ada",
            "last" => "Lovelace",
        };
        assert_eq!(resolved(&properties, "${greeting}!"), "hello Ada Lovelace!");
    }

    #[test]
    fn nested_keys() {
        let properties = properties! {
            "env" => "prod",
            "db.prod.host" => "db.example.com",
        };
        assert_eq!(resolved(&properties, "${db.${env}.host}"), "db.example.com");
        assert_eq!(
            resolved(&properties, "${db.${stage}.host}"),
            "${db.${stage}.host}"
        );
    }

    #[test]
    fn defaults_and_alternatives() {
        let properties = properties! {"second" => "2", "fallback" => "fb"};

        assert_eq!(resolved(&properties, "${first,second}"), "2");
        assert_eq!(resolved(&properties, "${first:none}"), "none");
        assert_eq!(resolved(&properties, "${first:${fallback}}"), "fb");
        assert_eq!(resolved(&properties, "${first:}"), "");
        assert_eq!(resolved(&properties, "${first,third}"), "${first,third}");
        assert_eq!(resolved(&properties, "${second:unused}"), "2");
    }

    #[test]
    fn escaped_token() {
        let properties = properties! {"name" => "world"};
        let resolution = resolve(&properties, "literal $${name} and ${name}");

        assert_eq!(resolution.resolved, "literal ${name} and world");
        assert!(resolution.changed);
    }

    #[test]
    fn escape_inside_value() {
        let properties = properties! {"template" => "use $${name} here"};
        assert_eq!(resolved(&properties, "${template}"), "use ${name} here");
    }

    #[test]
    fn cycle_terminates() {
        let properties = properties! {"a" => "${b}", "b" => "${a}"};
        let resolution = resolve(&properties, "${a}");

        assert!(resolution.resolved.contains("${"));
        assert_eq!(resolution.resolved, "${a}");
        assert!(!resolution.changed);
    }

    #[test]
    fn deep_chain_stops_expanding() {
        let properties: Properties = (0..10_000)
            .map(|i| (format!("k{i}"), format!("${{k{}}}", i + 1)))
            .collect();

        let resolution = resolve(&properties, "${k0}");
        assert_eq!(resolution.resolved, format!("${{k{MAX_DEPTH}}}"));
        assert!(resolution.changed);
    }

    #[test]
    fn deep_chain_uses_default() {
        let properties: Properties = (0..1_000)
            .map(|i| (format!("k{i}"), format!("${{k{}:bottom}}", i + 1)))
            .collect();

        assert_eq!(resolved(&properties, "${k0}"), "bottom");
    }

    #[test]
    fn doubling_values_are_bounded() {
        let mut properties: Properties = (0..40)
            .map(|i| (format!("l{i}"), format!("${{l{0}}}${{l{0}}}", i + 1)))
            .collect();
        properties.overlay(properties! {"l40" => "x"});

        let resolution = resolve(&properties, "${l0}");
        assert!(resolution.resolved.len() <= MAX_EXPANDED_LENGTH + "${l0}".len());
        assert!(resolution.resolved.starts_with('x'));
        assert!(resolution.resolved.contains("${"));
    }

    #[test]
    fn self_reference() {
        let properties = properties! {"path" => "${path}:/usr/bin"};
        assert_eq!(resolved(&properties, "${path}"), "${path}:/usr/bin");
    }

    #[test]
    fn cycle_uses_default() {
        let properties = properties! {"a" => "${b}", "b" => "${a:stop}"};
        assert_eq!(resolved(&properties, "${a}"), "stop");
    }

    #[test]
    fn repeated_key_is_not_a_cycle() {
        let properties = properties! {"x" => "${y}${y}", "y" => "1"};
        assert_eq!(resolved(&properties, "${x}"), "11");
    }

    #[test]
    fn case_sensitive_keys() {
        let properties = properties! {"Name" => "upper"};
        assert_eq!(resolved(&properties, "${name}"), "${name}");
        assert_eq!(resolved(&properties, "${Name}"), "upper");
    }
}
