use indextree::NodeId;

use crate::stylesheet::Stylesheet;

/// Removes a rule left without children and climbs to its parent.
///
/// The climb continues through class rules (selector starting with `.`) and
/// conditional at-rules, and stops at the first node that still has content,
/// at any other kind of parent, or at the root.
pub fn remove_rule_if_empty(stylesheet: &mut Stylesheet, node: NodeId) {
    if node == stylesheet.root() || stylesheet.has_children(node) {
        return;
    }

    let parent = stylesheet.parent(node);
    stylesheet.remove(node);

    tracing::trace!(node = ?node, "Removed empty rule");

    if let Some(parent) = parent {
        let is_prunable = stylesheet
            .selector(parent)
            .is_some_and(|selector| selector.starts_with('.'))
            || stylesheet.is_conditional_at_rule(parent);

        if is_prunable {
            remove_rule_if_empty(stylesheet, parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{stylesheet::Stylesheet, utils::remove_rule_if_empty::remove_rule_if_empty};

    #[test]
    fn prunes_emptied_class_ancestors() {
        let mut sheet = Stylesheet::parse(".a { .b { @media screen { .c {} } } }\n.d { color: red; }").unwrap();
        let innermost = sheet.rules()[2];

        remove_rule_if_empty(&mut sheet, innermost);

        assert_eq!(sheet.to_css(), ".d {\n  color: red;\n}\n");
    }

    #[test]
    fn stops_at_parents_with_content() {
        let mut sheet = Stylesheet::parse(".a { color: red; .b {} }").unwrap();
        let inner = sheet.rules()[1];

        remove_rule_if_empty(&mut sheet, inner);

        assert_eq!(sheet.to_css(), ".a {\n  color: red;\n}\n");
    }

    #[test]
    fn stops_at_non_class_parents() {
        let mut sheet = Stylesheet::parse("div { .b {} }").unwrap();
        let inner = sheet.rules()[1];

        remove_rule_if_empty(&mut sheet, inner);

        assert_eq!(sheet.to_css(), "div {}\n");
    }

    #[test]
    fn keeps_rules_with_children() {
        let mut sheet = Stylesheet::parse(".a { color: red; }").unwrap();
        let rule = sheet.rules()[0];

        remove_rule_if_empty(&mut sheet, rule);

        assert_eq!(sheet.to_css(), ".a {\n  color: red;\n}\n");
    }
}
