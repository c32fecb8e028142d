use cssparser::serialize_identifier;

/// Escapes a class name so it can be written after a `.` in a selector.
///
/// Punctuation such as brackets, dots and `%` is backslash-escaped, and a
/// leading digit is written as a code point escape.
pub fn escape_class_name(class_name: &str) -> String {
    let mut escaped = String::with_capacity(class_name.len());

    // Writing into a `String` never fails.
    let _ = serialize_identifier(class_name, &mut escaped);

    escaped
}
