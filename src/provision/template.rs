//! Placeholder substitution for configuration templates

use std::collections::BTreeMap;

/// Placeholder token (e.g. `###TODO1###`) → replacement value.
///
/// A `BTreeMap` so substitution order, and therefore output, never depends on
/// hashing.
pub type Bindings = BTreeMap<String, String>;

/// Build bindings from `(token, value)` pairs.
pub fn bindings<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Bindings
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Replace every literal occurrence of each bound token with its value.
///
/// Single left-to-right pass over `template`: inserted values are copied
/// verbatim and never rescanned, so the result does not depend on binding
/// order. Where two tokens match at the same position the longer one wins.
/// Tokens without a binding stay verbatim; bindings whose token does not
/// appear are ignored.
pub fn render(template: &str, bindings: &Bindings) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while !rest.is_empty() {
        let hit = bindings
            .iter()
            .filter(|(token, _)| !token.is_empty() && rest.starts_with(token.as_str()))
            .max_by_key(|(token, _)| token.len());

        if let Some((token, value)) = hit {
            out.push_str(value);
            rest = &rest[token.len()..];
            continue;
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    out
}
