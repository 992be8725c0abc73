use crate::select::weights::strip_marker;

/// Trait value of an asset file: weight marker and extension removed.
///
/// `red#80.png` becomes `red`; `dark-blue.v2.png` becomes `dark-blue.v2`.
pub fn clean_asset_name(file: &str) -> String {
    let stripped = strip_marker(file);
    match stripped.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < stripped.len() => stripped[..dot].to_string(),
        _ => stripped,
    }
}

/// Uppercase the first character of every word.
///
/// Words are runs of ASCII alphanumerics and `_`; everything else is left untouched.
pub fn humanize_trait_type(raw: &str) -> String {
    capitalize_words(raw)
}

/// Hyphens become spaces, then every word is capitalized.
pub fn humanize_value(raw: &str) -> String {
    capitalize_words(&raw.replace('-', " "))
}

fn capitalize_words(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_word = false;
    for c in s.chars() {
        let word = c.is_ascii_alphanumeric() || c == '_';
        if word && !prev_word {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        prev_word = word;
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/naming.rs"]
mod tests;
