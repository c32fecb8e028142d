use cssparser::{ParseError, Parser, ParserInput};

/// Splits CSS text on its top-level commas.
///
/// Commas inside functions, parenthesised groups, attribute selectors and
/// strings are part of their item. Every item is trimmed.
///
/// # Arguments
///
/// * `text` - A selector list or a comma separated property value.
///
/// # Returns
///
/// The items as slices of `text`, at least one of them.
pub fn split_comma_separated(text: &str) -> Vec<&str> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);

    parser
        .parse_comma_separated(consume_item)
        .unwrap_or_else(|_| vec![text.trim()])
}

fn consume_item<'i>(input: &mut Parser<'i, '_>) -> Result<&'i str, ParseError<'i, ()>> {
    let start = input.position();

    while input.next_including_whitespace_and_comments().is_ok() {}

    Ok(input.slice_from(start).trim())
}

#[cfg(test)]
mod tests {
    use crate::utils::split_comma_separated::split_comma_separated;

    #[test]
    fn splits_selector_lists() {
        assert_eq!(split_comma_separated(".a, .b .c,.d"), vec![".a", ".b .c", ".d"]);
        assert_eq!(
            split_comma_separated(":is(.a, .b) > .c, a[title=\"x,y\"]"),
            vec![":is(.a, .b) > .c", "a[title=\"x,y\"]"]
        );
    }

    #[test]
    fn splits_value_layers() {
        assert_eq!(
            split_comma_separated("1s steps(4, end) spin, 2s cubic-bezier(0, 0, 1, 1) fade"),
            vec!["1s steps(4, end) spin", "2s cubic-bezier(0, 0, 1, 1) fade"]
        );
    }

    #[test]
    fn single_item() {
        assert_eq!(split_comma_separated("  .a  "), vec![".a"]);
    }
}
