use cssparser::{ParseError, Parser, ParserInput, Token};

/// Tokenizes CSS text into its top-level component values.
///
/// Each value is returned with its first token and its source text. A
/// function, a bracketed group or a block is one value spanning up to its
/// closing token. Whitespace is kept as values; comments are dropped.
pub fn split_component_values(text: &str) -> Vec<(Token<'_>, &str)> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut values = vec![];

    loop {
        let start = parser.position();
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        if matches!(
            token,
            Token::Function(_)
                | Token::ParenthesisBlock
                | Token::SquareBracketBlock
                | Token::CurlyBracketBlock
        ) {
            let _ = parser.parse_nested_block(consume_block);
        }

        values.push((token, parser.slice_from(start)));
    }

    values
}

fn consume_block<'i>(input: &mut Parser<'i, '_>) -> Result<(), ParseError<'i, ()>> {
    while input.next_including_whitespace_and_comments().is_ok() {}

    Ok(())
}

#[cfg(test)]
mod tests {
    use cssparser::Token;

    use crate::utils::split_component_values::split_component_values;

    #[test]
    fn keeps_groups_whole() {
        let values = split_component_values("li:nth-child(2n + 1) a[title='x y']");
        let texts: Vec<&str> = values.iter().map(|(_, text)| *text).collect();

        assert_eq!(
            texts,
            vec!["li", ":", "nth-child(2n + 1)", " ", "a", "[title='x y']"]
        );
        assert!(matches!(values[1].0, Token::Colon));
        assert!(matches!(values[3].0, Token::WhiteSpace(_)));
    }

    #[test]
    fn escapes_stay_inside_identifiers() {
        let values = split_component_values(".md\\:flex");

        assert_eq!(values.len(), 2);
        assert_eq!(values[0].0, Token::Delim('.'));
        assert_eq!(values[1].1, "md\\:flex");
    }
}
