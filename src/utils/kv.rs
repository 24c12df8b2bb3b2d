//! Flat `"key" = "value"` files.
//!
//! Both the digest manifest and the handoff file use this format: one entry
//! per line, keys and values written as TOML basic strings, entries in
//! insertion order. The output is valid TOML, so it parses back with `toml`.

use indexmap::IndexMap;

/// Render entries as `"key" = "value"` lines.
pub fn render<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = String::new();
    for (key, value) in entries {
        quote_into(&mut out, key);
        out.push_str(" = ");
        quote_into(&mut out, value);
        out.push('\n');
    }
    out
}

/// Parse a flat key/value file back into an ordered map.
pub fn parse(content: &str) -> Result<IndexMap<String, String>, toml::de::Error> {
    toml::from_str(content)
}

fn quote_into(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}
