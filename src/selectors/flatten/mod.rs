use indextree::NodeId;

use crate::{
    selectors::join_selector, stylesheet::Stylesheet,
    utils::split_comma_separated::split_comma_separated,
};

/// Linearizes the nested rules of a document back into flat selectors.
///
/// In soft mode a rule is only merged into its single nested child rule,
/// leaving every other nest in place. In hard mode every rule is fully
/// de-nested and conditional at-rules found inside rules are hoisted around
/// the rules they apply to.
///
/// The root is re-ordered as: untouched nodes, plain rules, conditional
/// groups, keyframes. Top-level rules left without content are dropped.
///
/// # Arguments
///
/// * `stylesheet` - The document to rewrite in place.
/// * `soft` - `true` to only merge single-child chains.
pub fn flat_selectors(stylesheet: &mut Stylesheet, soft: bool) {
    let root = stylesheet.root();
    let mut rules: Vec<NodeId> = vec![];
    let mut groups: Vec<NodeId> = vec![];
    let mut keyframes: Vec<NodeId> = vec![];

    tracing::info!(soft, "Flattening selectors");

    for node in stylesheet.children(root) {
        if stylesheet.is_keyframes(node) {
            keyframes.push(node);
        } else if stylesheet.is_rule(node) {
            if soft {
                soft_flatten(stylesheet, node);

                if stylesheet.has_children(node) {
                    rules.push(node);
                } else {
                    stylesheet.remove(node);
                }
            } else {
                let selector = stylesheet.selector(node).unwrap_or_default().trim().to_string();

                hard_flatten_rule(stylesheet, node, &selector, &mut rules);
                stylesheet.remove(node);
            }
        } else if stylesheet.is_conditional_at_rule(node) {
            flatten_group(stylesheet, node, soft);
            groups.push(node);
        }
    }

    for node in rules.into_iter().chain(groups).chain(keyframes) {
        stylesheet.append(root, node);
    }
}

fn soft_flatten(stylesheet: &mut Stylesheet, node: NodeId) {
    while let Some(child) = single_child_rule(stylesheet, node) {
        let (Some(parent_selector), Some(child_selector)) =
            (stylesheet.selector(node), stylesheet.selector(child))
        else {
            break;
        };

        if split_comma_separated(parent_selector).len() > 1
            || split_comma_separated(child_selector).len() > 1
        {
            break;
        }

        let joined = join_selector(parent_selector, child_selector);

        stylesheet.move_children(child, node);
        stylesheet.remove(child);
        stylesheet.set_selector(node, joined);
    }

    for child in stylesheet.children(node) {
        if stylesheet.is_rule(child) || stylesheet.is_conditional_at_rule(child) {
            soft_flatten(stylesheet, child);
        }
    }
}

fn single_child_rule(stylesheet: &Stylesheet, node: NodeId) -> Option<NodeId> {
    if !stylesheet.is_rule(node) {
        return None;
    }

    match stylesheet.children(node).as_slice() {
        [child] if stylesheet.is_rule(*child) => Some(*child),
        _ => None,
    }
}

/// Flattens `node`, whose resolved selector is `selector`, pushing the
/// produced top-level nodes to `output` in document order.
fn hard_flatten_rule(
    stylesheet: &mut Stylesheet,
    node: NodeId,
    selector: &str,
    output: &mut Vec<NodeId>,
) {
    let flat_rule = stylesheet.create_rule(selector);
    let mut nested: Vec<NodeId> = vec![];

    for child in stylesheet.children(node) {
        if let Some(child_selector) = stylesheet.selector(child) {
            let resolved = join_selector(selector, child_selector);
            hard_flatten_rule(stylesheet, child, &resolved, &mut nested);
        } else if stylesheet.is_conditional_at_rule(child) {
            let wrapper = hoist_group(stylesheet, child, selector);

            if stylesheet.has_children(wrapper) {
                nested.push(wrapper);
            }
        } else {
            stylesheet.append(flat_rule, child);
        }
    }

    if stylesheet.has_children(flat_rule) {
        output.push(flat_rule);
    }

    output.extend(nested);
}

/// Rebuilds a conditional at-rule found inside a rule as a top-level group
/// wrapping flat copies of the rule.
fn hoist_group(stylesheet: &mut Stylesheet, at_rule: NodeId, selector: &str) -> NodeId {
    let (name, params) = match stylesheet.at_rule(at_rule) {
        Some((name, params)) => (name.to_string(), params.to_string()),
        None => (String::new(), String::new()),
    };

    let wrapper = stylesheet.create_at_rule(&name, &params);
    let own_rule = stylesheet.create_rule(selector);
    let mut nested: Vec<NodeId> = vec![];

    for child in stylesheet.children(at_rule) {
        if let Some(child_selector) = stylesheet.selector(child) {
            let resolved = join_selector(selector, child_selector);
            hard_flatten_rule(stylesheet, child, &resolved, &mut nested);
        } else if stylesheet.is_conditional_at_rule(child) {
            let inner = hoist_group(stylesheet, child, selector);

            if stylesheet.has_children(inner) {
                nested.push(inner);
            }
        } else {
            stylesheet.append(own_rule, child);
        }
    }

    if stylesheet.has_children(own_rule) {
        stylesheet.append(wrapper, own_rule);
    }

    for node in nested {
        stylesheet.append(wrapper, node);
    }

    wrapper
}

/// Flattens the rules of a top-level conditional group, keeping their order.
fn flatten_group(stylesheet: &mut Stylesheet, group: NodeId, soft: bool) {
    for child in stylesheet.children(group) {
        if stylesheet.is_rule(child) {
            if soft {
                soft_flatten(stylesheet, child);
                stylesheet.append(group, child);
            } else {
                let selector = stylesheet.selector(child).unwrap_or_default().trim().to_string();
                let mut output = vec![];

                hard_flatten_rule(stylesheet, child, &selector, &mut output);
                stylesheet.remove(child);

                for node in output {
                    stylesheet.append(group, node);
                }
            }
        } else {
            if stylesheet.is_conditional_at_rule(child) {
                flatten_group(stylesheet, child, soft);
            }

            stylesheet.append(group, child);
        }
    }
}
