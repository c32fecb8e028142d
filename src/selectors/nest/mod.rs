use indexmap::IndexMap;
use indextree::NodeId;

use crate::{
    selectors::{normalize_segment, split_selector},
    stylesheet::Stylesheet,
};

/// Nests flat combinator selectors into a tree of `&`-relative rules.
///
/// `.a .b { color: red }` becomes `.a { .b { color: red } }`, merging into an
/// existing `.a` rule found among the siblings when there is one. Conditional
/// at-rules are nested the same way, and a bare `&` rule directly inside one
/// of them is unwrapped into the at-rule.
///
/// # Arguments
///
/// * `stylesheet` - The document to rewrite in place.
pub fn nest_selectors(stylesheet: &mut Stylesheet) {
    let root = stylesheet.root();
    let nodes = stylesheet.children(root);

    tracing::info!(num_nodes = nodes.len(), "Nesting selectors");

    traverse_nodes(stylesheet, root, nodes);
}

fn traverse_nodes(stylesheet: &mut Stylesheet, parent: NodeId, nodes: Vec<NodeId>) {
    let mut top_level_rules: IndexMap<String, NodeId> = IndexMap::new();

    for node in &nodes {
        if let Some(selector) = stylesheet.selector(*node) {
            let mut segments = split_selector(selector);

            if segments.len() == 1 {
                top_level_rules.insert(segments.remove(0), *node);

                let children = stylesheet.children(*node);
                traverse_nodes(stylesheet, *node, children);
            }
        }
    }

    let mut touched_rules: Vec<NodeId> = vec![];

    for node in nodes {
        if let Some(selector) = stylesheet.selector(node).map(str::to_string) {
            let segments = split_selector(&selector);

            if segments.len() < 2 {
                continue;
            }

            let top_rule = match top_level_rules.get(&segments[0]) {
                Some(top_rule) => *top_rule,
                None => {
                    let top_rule = stylesheet.create_rule(&segments[0]);

                    stylesheet.append(parent, top_rule);
                    top_level_rules.insert(segments[0].clone(), top_rule);

                    top_rule
                }
            };

            let mut current = top_rule;

            for segment in segments.iter().skip(1) {
                let normalized = normalize_segment(segment);

                current = match find_child_rule(stylesheet, current, &normalized) {
                    Some(existing) => existing,
                    None => {
                        let nested = stylesheet.create_rule(&normalized);
                        stylesheet.append(current, nested);

                        nested
                    }
                };
            }

            tracing::trace!(selector = %selector, "Nested flat selector");

            stylesheet.move_children(node, current);
            stylesheet.remove(node);

            if !touched_rules.contains(&top_rule) {
                touched_rules.push(top_rule);
            }
        } else if stylesheet.is_conditional_at_rule(node) {
            for child in stylesheet.children(node) {
                if stylesheet.selector(child) == Some("&") {
                    stylesheet.move_children(child, node);
                    stylesheet.remove(child);
                }
            }

            let children = stylesheet.children(node);
            traverse_nodes(stylesheet, node, children);
        }
    }

    // Moved children may themselves hold flat selectors.
    for top_rule in touched_rules {
        let children = stylesheet.children(top_rule);
        traverse_nodes(stylesheet, top_rule, children);
    }
}

fn find_child_rule(stylesheet: &Stylesheet, parent: NodeId, selector: &str) -> Option<NodeId> {
    stylesheet
        .children(parent)
        .into_iter()
        .find(|child| stylesheet.selector(*child) == Some(selector))
}

#[cfg(test)]
mod tests {
    use crate::{selectors::nest::nest_selectors, stylesheet::Stylesheet};

    fn nest(css: &str) -> String {
        let mut sheet = Stylesheet::parse(css).unwrap();
        nest_selectors(&mut sheet);

        sheet.to_css()
    }

    #[test]
    fn nests_pseudo_classes_into_their_rule() {
        assert_eq!(
            nest(".example { color: red; }\n.example:hover { color: blue; }"),
            ".example {\n  color: red;\n  &:hover {\n    color: blue;\n  }\n}\n"
        );
    }

    #[test]
    fn creates_missing_parents() {
        assert_eq!(
            nest(".a .b > .c { color: red; }"),
            ".a {\n  .b {\n    & > .c {\n      color: red;\n    }\n  }\n}\n"
        );
    }

    #[test]
    fn merges_into_existing_nested_rules() {
        assert_eq!(
            nest(".panel .box { padding: 2em; }\n.panel { .box { padding: 1em; } }"),
            ".panel {\n  .box {\n    padding: 1em;\n    padding: 2em;\n  }\n}\n"
        );
    }

    #[test]
    fn keeps_selector_lists_and_global_escapes() {
        let css = ".a .b, .c {\n  color: red;\n}\n:global(.x) .y {\n  color: blue;\n}\n";

        assert_eq!(nest(css), css);
    }

    #[test]
    fn nests_inside_conditional_at_rules() {
        assert_eq!(
            nest("@media screen { .a .b { color: blue; } & { color: red; } }"),
            "@media screen {\n  color: red;\n  .a {\n    .b {\n      color: blue;\n    }\n  }\n}\n"
        );
    }

    #[test]
    fn normalizes_moved_children() {
        assert_eq!(
            nest(".a .b { .c .d { color: red; } }"),
            ".a {\n  .b {\n    .c {\n      .d {\n        color: red;\n      }\n    }\n  }\n}\n"
        );
    }

    #[test]
    fn is_idempotent() {
        let once = nest(".a .b { color: red; }\n.a:hover { color: blue; }");
        let twice = nest(&once);

        assert_eq!(once, twice);
    }
}
