use cssparser::Token;
use lazy_static::lazy_static;
use regex::Regex;

use crate::utils::{
    split_comma_separated::split_comma_separated, split_component_values::split_component_values,
};

pub mod flatten;
pub mod nest;

lazy_static! {
    static ref GLOBAL_ESCAPE_RE: Regex = Regex::new(r":global\b").unwrap();
}

/// Splits a selector into its combinator and pseudo segments.
///
/// Combinators travel with the segment that follows them: a descendant
/// segment starts with a space, a child or sibling segment starts with its
/// combinator (`> .c`), and a pseudo segment starts with `:`. Selector lists,
/// global escapes and selectors opening with a combinator are never split.
///
/// # Arguments
///
/// * `selector` - The selector to split.
///
/// # Returns
///
/// The segments, the first one being the top-level selector.
pub fn split_selector(selector: &str) -> Vec<String> {
    let selector = selector.split_whitespace().collect::<Vec<_>>().join(" ");

    if selector.contains(',')
        || GLOBAL_ESCAPE_RE.is_match(&selector)
        || selector.starts_with(['>', '+', '~'])
    {
        return vec![selector];
    }

    let mut segments: Vec<String> = vec![];
    let mut current = String::new();
    let mut combinator: Option<char> = None;
    let mut after_colon = false;

    for (token, text) in split_component_values(&selector) {
        match token {
            Token::WhiteSpace(_) => {
                if !current.is_empty() && combinator.is_none() {
                    combinator = Some(' ');
                }

                continue;
            }
            Token::Delim(character @ ('>' | '+' | '~')) => {
                combinator = Some(character);
                continue;
            }
            Token::Colon
                if combinator.is_none() && !current.is_empty() && current != "&" && !after_colon =>
            {
                segments.push(std::mem::take(&mut current));
                current.push(':');
                after_colon = true;
                continue;
            }
            _ => {}
        }

        if let Some(pending) = combinator.take() {
            segments.push(std::mem::take(&mut current));

            if pending != ' ' {
                current.push(pending);
            }

            current.push(' ');
        }

        after_colon = matches!(token, Token::Colon);
        current.push_str(text);
    }

    if !current.is_empty() {
        segments.push(current);
    }

    segments
}

/// Turns a non-leading segment into a selector relative to its parent rule.
pub fn normalize_segment(segment: &str) -> String {
    if let Some(descendant) = segment.strip_prefix(' ') {
        descendant.to_string()
    } else if segment.starts_with('&') {
        segment.to_string()
    } else if segment.starts_with(['>', '+', '~']) {
        format!("& {}", segment)
    } else {
        format!("&{}", segment)
    }
}

/// Resolves a nested selector against its parent selector.
///
/// `&` is replaced by the parent; a child without `&` becomes a descendant
/// of the parent. Selector lists on either side are expanded pairwise.
pub fn join_selector(parent: &str, child: &str) -> String {
    let parent = parent.trim();
    let child = child.trim();

    if parent.is_empty() {
        return child.to_string();
    }

    let mut joined = vec![];

    for parent_part in split_comma_separated(parent) {
        for child_part in split_comma_separated(child) {
            if child_part.contains('&') {
                joined.push(child_part.replace('&', parent_part));
            } else {
                joined.push(format!("{} {}", parent_part, child_part));
            }
        }
    }

    joined.join(", ")
}
