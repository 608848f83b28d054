//! Parsing of `key=value,key=value` lists such as `OTEL_EXPORTER_OTLP_HEADERS`
//! and `OTEL_RESOURCE_ATTRIBUTES`.

/// Parses a comma separated list of `key=value` pairs.
///
/// Keys and values are trimmed and values are percent-decoded when they are
/// valid percent-encoded UTF-8. Entries without `=`, with an empty key or with
/// an empty value are skipped. When a key repeats, the last value wins while
/// the key keeps the position of its first occurrence.
pub fn parse_key_value_list(input: &str) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = Vec::new();
    for (key, value) in input
        .split_terminator(',')
        .map(str::trim)
        .filter_map(parse_key_value_string)
    {
        match entries.iter_mut().find(|(existing, _)| existing == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key.to_owned(), value)),
        }
    }
    entries
}

/// Combines two ordered name/value lists. Every entry of `higher` is kept and
/// `lower` only contributes names `higher` does not define.
pub fn merge_key_value_lists(
    higher: Vec<(String, String)>,
    lower: Vec<(String, String)>,
) -> Vec<(String, String)> {
    let mut merged = higher;
    for (key, value) in lower {
        if !merged.iter().any(|(existing, _)| *existing == key) {
            merged.push((key, value));
        }
    }
    merged
}

fn parse_key_value_string(key_value_string: &str) -> Option<(&str, String)> {
    key_value_string
        .split_once('=')
        .map(|(key, value)| {
            let value = value.trim();
            (
                key.trim(),
                url_decode(value).unwrap_or_else(|| value.to_string()),
            )
        })
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
}

fn url_decode(value: &str) -> Option<String> {
    let mut result = String::with_capacity(value.len());
    let mut chars_to_decode = Vec::<u8>::new();
    let mut all_chars = value.chars();

    loop {
        let ch = all_chars.next();

        if ch == Some('%') {
            let hex: String = [all_chars.next()?, all_chars.next()?].iter().collect();
            chars_to_decode.push(u8::from_str_radix(&hex, 16).ok()?);
            continue;
        }

        if !chars_to_decode.is_empty() {
            result.push_str(std::str::from_utf8(&chars_to_decode).ok()?);
            chars_to_decode.clear();
        }

        match ch {
            Some(c) => result.push(c),
            None => return Some(result),
        }
    }
}
