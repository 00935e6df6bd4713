//! Canonical JSON encoding for hash preimages.
//!
//! Hashes must agree across implementations and across library upgrades, so
//! this encoder does not defer to `serde_json`'s output format. Encoding
//! rules (version 1):
//!
//! - `null`, `true`, `false` as literals.
//! - Integers (`i64`/`u64`) in base 10.
//! - Other numbers as the shortest decimal that round-trips to the same
//!   `f64`, never in exponent form (`0.1`, `2.5`, `1`, `100000000000000000000`).
//! - Strings in double quotes; `"` and `\` are backslash-escaped, `\b \t \n
//!   \f \r` use their short escapes, other code points below U+0020 use
//!   `\u00xx` (lowercase hex), everything else is emitted as literal UTF-8.
//! - Arrays in element order, comma separated.
//! - Objects with keys sorted by their UTF-8 bytes, `key:value` pairs comma
//!   separated.
//! - No whitespace anywhere.

use std::fmt::Write as _;

use serde_json::{Number, Value};

/// Encode `value` canonically into a new string.
pub fn to_canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Append the canonical encoding of `value` to `out`.
pub fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_str(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_str(out, key);
                out.push(':');
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

/// Append `s` as a canonical JSON string literal.
pub fn write_str(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{0C}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => {
                // Writing into a String cannot fail.
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

fn write_number(out: &mut String, n: &Number) {
    if let Some(i) = n.as_i64() {
        let _ = write!(out, "{}", i);
    } else if let Some(u) = n.as_u64() {
        let _ = write!(out, "{}", u);
    } else if let Some(f) = n.as_f64() {
        // `Display` for f64 is the shortest round-trip decimal, without exponent.
        let _ = write!(out, "{}", f);
    } else {
        // Only reachable with serde_json's arbitrary_precision feature.
        out.push_str(&n.to_string());
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::to_canonical_string;

    #[test]
    fn object_keys_are_sorted_at_every_depth() {
        let value = json!({ "b": 1, "a": { "z": true, "m": null }, "A": [3, 2] });
        assert_eq!(
            to_canonical_string(&value),
            r#"{"A":[3,2],"a":{"m":null,"z":true},"b":1}"#
        );
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let a: serde_json::Value = serde_json::from_str(r#"{"x":1,"y":[1,{"q":2,"p":1}]}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{"y":[1,{"p":1,"q":2}],"x":1}"#).unwrap();
        assert_eq!(to_canonical_string(&a), to_canonical_string(&b));
    }

    #[test]
    fn strings_are_escaped() {
        let value = json!("quote\" slash\\ nl\n tab\t bell\u{07} é");
        assert_eq!(
            to_canonical_string(&value),
            "\"quote\\\" slash\\\\ nl\\n tab\\t bell\\u0007 é\""
        );
    }

    #[test]
    fn numbers_are_pinned() {
        let value = json!([0, -7, 18446744073709551615u64, 0.1, 2.5, 1e20, -0.000001]);
        assert_eq!(
            to_canonical_string(&value),
            "[0,-7,18446744073709551615,0.1,2.5,100000000000000000000,-0.000001]"
        );
    }

    #[test]
    fn scalars_and_empty_containers() {
        assert_eq!(to_canonical_string(&json!(null)), "null");
        assert_eq!(to_canonical_string(&json!(false)), "false");
        assert_eq!(to_canonical_string(&json!({})), "{}");
        assert_eq!(to_canonical_string(&json!([])), "[]");
    }
}
