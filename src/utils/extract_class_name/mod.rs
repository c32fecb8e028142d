use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SINGLE_CLASS_RE: Regex = Regex::new(r"^\.([\w-]+)$").unwrap();
}

/// Extracts the class name of a selector made of exactly one class, such as `.panel`.
///
/// Compound, pseudo, combinator and list selectors yield `None`: their
/// declarations do not belong to the class alone.
pub fn extract_class_name(selector: &str) -> Option<String> {
    SINGLE_CLASS_RE
        .captures(selector.trim())
        .and_then(|caps| caps.get(1))
        .map(|class_name| class_name.as_str().to_string())
}
