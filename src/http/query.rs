//! Query-string parsing into a nested JSON map.
//!
//! Mirrors the shapes the sanitizer has to deal with:
//!
//! ```text
//! ?name=jane&sort=price               {name: "jane", sort: "price"}
//! ?name=jane&name=sam                 {name: ["jane", "sam"]}
//! ?price[gt]=5&price[lt]=9            {price: {gt: "5", lt: "9"}}
//! ?name[gt]=jane&name=sam             {name: {gt: "jane", sam: true}}
//! ?name[gt]=jane&name=sam&name=tom    {name: {gt: "jane", 0: "sam", 1: "tom"}}
//! ```

use serde_json::{Map, Value};

pub fn parse(raw: &str) -> Map<String, Value> {
    let mut query = Map::new();
    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        if key.is_empty() {
            continue;
        }
        match split_key(&key) {
            Some((base, sub)) => insert_nested(&mut query, base, sub, value.into_owned()),
            None => insert_flat(&mut query, &key, value.into_owned()),
        }
    }
    query
}

/// `name[gt]` -> `("name", "gt")`.
fn split_key(key: &str) -> Option<(&str, &str)> {
    let open = key.find('[')?;
    let rest = key[open + 1..].strip_suffix(']')?;
    if open == 0 || rest.contains('[') || rest.contains(']') {
        return None;
    }
    Some((&key[..open], rest))
}

fn insert_flat(query: &mut Map<String, Value>, key: &str, value: String) {
    match query.get_mut(key) {
        None => {
            query.insert(key.to_string(), Value::String(value));
        }
        Some(Value::Array(items)) => items.push(Value::String(value)),
        Some(Value::Object(object)) => {
            // a bare value next to operators is kept as a flag until a second
            // one arrives, then all of them become positional
            let positional = object.keys().any(|k| k.parse::<usize>().is_ok());
            let flagged = object.values().any(|v| matches!(v, Value::Bool(true)));
            if !positional && !flagged {
                object.insert(value, Value::Bool(true));
            } else {
                promote_flags(object);
                let index = object.keys().filter(|k| k.parse::<usize>().is_ok()).count();
                object.insert(index.to_string(), Value::String(value));
            }
        }
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, Value::String(value)]);
        }
    }
}

/// Turn `{sam: true}` flags back into positional entries once a second bare
/// value arrives.
fn promote_flags(object: &mut Map<String, Value>) {
    let flags: Vec<String> = object
        .iter()
        .filter(|(_, v)| matches!(v, Value::Bool(true)))
        .map(|(k, _)| k.clone())
        .collect();
    for (offset, flag) in flags.into_iter().enumerate() {
        object.shift_remove(&flag);
        object.insert(offset.to_string(), Value::String(flag));
    }
}

fn insert_nested(query: &mut Map<String, Value>, base: &str, sub: &str, value: String) {
    let entry = query
        .entry(base.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(object) = &mut *entry {
        object.insert(sub.to_string(), Value::String(value));
        return;
    }
    let mut object = Map::new();
    match entry.take() {
        Value::String(flag) => {
            object.insert(flag, Value::Bool(true));
        }
        Value::Array(items) => {
            for (index, item) in items.into_iter().enumerate() {
                object.insert(index.to_string(), item);
            }
        }
        _ => {}
    }
    object.insert(sub.to_string(), Value::String(value));
    *entry = Value::Object(object);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_pairs() {
        assert_eq!(
            Value::Object(parse("name=jane&sort=price")),
            json!({ "name": "jane", "sort": "price" })
        );
    }

    #[test]
    fn test_repeated_key_becomes_array() {
        assert_eq!(
            Value::Object(parse("name=jane&name=sam&sort=price")),
            json!({ "name": ["jane", "sam"], "sort": "price" })
        );
    }

    #[test]
    fn test_bracket_operators_become_object() {
        assert_eq!(
            Value::Object(parse("price[gt]=5&price[lt]=9")),
            json!({ "price": { "gt": "5", "lt": "9" } })
        );
    }

    #[test]
    fn test_operator_mixed_with_bare_value() {
        assert_eq!(
            Value::Object(parse("name[gt]=jane&name=sam&sort=price")),
            json!({ "name": { "gt": "jane", "sam": true }, "sort": "price" })
        );
        assert_eq!(
            Value::Object(parse("name[gt]=jane&name=sam&name=tom")),
            json!({ "name": { "gt": "jane", "0": "sam", "1": "tom" } })
        );
    }

    #[test]
    fn test_percent_decoding_and_empty() {
        assert_eq!(Value::Object(parse("q=a%20b")), json!({ "q": "a b" }));
        assert!(parse("").is_empty());
    }
}
