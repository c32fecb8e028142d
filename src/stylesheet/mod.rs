use indextree::{Arena, NodeId};

use crate::UtilityModulesResult;

mod parser;

/// Conditional group at-rules that may wrap rules and declarations.
pub const CONDITIONAL_AT_RULES: [&str; 5] = ["media", "container", "layer", "supports", "scope"];

/// A single node of the stylesheet tree.
#[derive(Clone, PartialEq, Debug)]
pub enum CssNode {
    Root,
    /// A qualified rule, e.g. `.panel { ... }`.
    Rule { selector: String },
    /// An at-rule. Statement at-rules such as `@import` have no block.
    AtRule {
        name: String,
        params: String,
        has_block: bool,
    },
    /// A `prop: value` pair. Priority flags stay in the value text.
    Declaration { prop: String, value: String },
}

impl CssNode {
    pub fn is_rule(&self) -> bool {
        matches!(self, CssNode::Rule { .. })
    }

    pub fn is_at_rule(&self) -> bool {
        matches!(self, CssNode::AtRule { .. })
    }

    pub fn is_declaration(&self) -> bool {
        matches!(self, CssNode::Declaration { .. })
    }

    /// Whether the node is one of the conditional group at-rules (media, container...).
    pub fn is_conditional_at_rule(&self) -> bool {
        match self {
            CssNode::AtRule { name, .. } => CONDITIONAL_AT_RULES.contains(&name.as_str()),
            _ => false,
        }
    }

    /// Whether the node is a `@keyframes` block, vendor prefixed or not.
    pub fn is_keyframes(&self) -> bool {
        match self {
            CssNode::AtRule { name, .. } => name == "keyframes" || name.ends_with("-keyframes"),
            _ => false,
        }
    }
}

/// Mutable stylesheet tree backed by an arena.
///
/// Removing a node only detaches its subtree, so every `NodeId` collected
/// before a mutation stays valid and can be checked with [`Stylesheet::is_attached`].
#[derive(Clone, Debug)]
pub struct Stylesheet {
    arena: Arena<CssNode>,
    root: NodeId,
}

impl Default for Stylesheet {
    fn default() -> Self {
        Self::new()
    }
}

impl Stylesheet {
    /// Creates an empty stylesheet holding only its root node.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(CssNode::Root);

        Self { arena, root }
    }

    /// Parses the given CSS text into a tree.
    ///
    /// # Arguments
    ///
    /// * `css` - The stylesheet source.
    ///
    /// # Returns
    ///
    /// The parsed `Stylesheet`, or a `StylesheetParsingError` when an item at
    /// the root cannot be read as a rule or an at-rule. Comments are dropped.
    pub fn parse(css: &str) -> UtilityModulesResult<Self> {
        parser::parse(css)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&CssNode> {
        self.arena.get(id).map(|node| node.get())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut CssNode> {
        self.arena.get_mut(id).map(|node| node.get_mut())
    }

    /// Selector of a rule node, `None` for any other node.
    pub fn selector(&self, id: NodeId) -> Option<&str> {
        match self.node(id) {
            Some(CssNode::Rule { selector }) => Some(selector.as_str()),
            _ => None,
        }
    }

    pub fn set_selector(&mut self, id: NodeId, new_selector: String) {
        if let Some(CssNode::Rule { selector }) = self.node_mut(id) {
            *selector = new_selector;
        }
    }

    /// Name and params of an at-rule node.
    pub fn at_rule(&self, id: NodeId) -> Option<(&str, &str)> {
        match self.node(id) {
            Some(CssNode::AtRule { name, params, .. }) => Some((name.as_str(), params.as_str())),
            _ => None,
        }
    }

    pub fn set_at_rule_params(&mut self, id: NodeId, new_params: String) {
        if let Some(CssNode::AtRule { params, .. }) = self.node_mut(id) {
            *params = new_params;
        }
    }

    /// Property and value of a declaration node.
    pub fn declaration(&self, id: NodeId) -> Option<(&str, &str)> {
        match self.node(id) {
            Some(CssNode::Declaration { prop, value }) => Some((prop.as_str(), value.as_str())),
            _ => None,
        }
    }

    pub fn set_declaration(&mut self, id: NodeId, new_prop: String, new_value: String) {
        if let Some(CssNode::Declaration { prop, value }) = self.node_mut(id) {
            *prop = new_prop;
            *value = new_value;
        }
    }

    pub fn is_rule(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(CssNode::is_rule)
    }

    pub fn is_at_rule(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(CssNode::is_at_rule)
    }

    pub fn is_declaration(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(CssNode::is_declaration)
    }

    pub fn is_conditional_at_rule(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(CssNode::is_conditional_at_rule)
    }

    pub fn is_keyframes(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(CssNode::is_keyframes)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(|node| node.parent())
    }

    /// Snapshot of the direct children of a node.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        id.children(&self.arena).collect()
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        id.children(&self.arena).next().is_some()
    }

    /// Snapshot of every node below `id`, in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        id.descendants(&self.arena).skip(1).collect()
    }

    /// Snapshot of every rule in the document, in document order.
    pub fn rules(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.is_rule(*id))
            .collect()
    }

    /// Snapshot of every at-rule in the document, in document order.
    pub fn at_rules(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.is_at_rule(*id))
            .collect()
    }

    /// Snapshot of the declarations found anywhere below `id`.
    pub fn declarations(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|id| self.is_declaration(*id))
            .collect()
    }

    /// Whether the node still belongs to the document.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || id.ancestors(&self.arena).any(|ancestor| ancestor == self.root)
    }

    pub fn create_rule(&mut self, selector: &str) -> NodeId {
        self.arena.new_node(CssNode::Rule {
            selector: selector.to_string(),
        })
    }

    pub fn create_at_rule(&mut self, name: &str, params: &str) -> NodeId {
        self.arena.new_node(CssNode::AtRule {
            name: name.to_string(),
            params: params.to_string(),
            has_block: true,
        })
    }

    pub fn create_declaration(&mut self, prop: &str, value: &str) -> NodeId {
        self.arena.new_node(CssNode::Declaration {
            prop: prop.to_string(),
            value: value.to_string(),
        })
    }

    pub(crate) fn create_node(&mut self, node: CssNode) -> NodeId {
        self.arena.new_node(node)
    }

    /// Moves `child` (and its subtree) to the end of `parent`.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        child.detach(&mut self.arena);
        parent.append(child, &mut self.arena);
    }

    /// Moves every child of `from` to the end of `to`, keeping their order.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        for child in self.children(from) {
            self.append(to, child);
        }
    }

    /// Detaches a node and its subtree from the document.
    pub fn remove(&mut self, id: NodeId) {
        if id != self.root {
            id.detach(&mut self.arena);
        }
    }

    /// Copies a node and its whole subtree. The copy is detached.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let data = self.arena[id].get().clone();
        let copy = self.arena.new_node(data);

        for child in self.children(id) {
            let child_copy = self.deep_clone(child);
            copy.append(child_copy, &mut self.arena);
        }

        copy
    }

    /// Serializes the whole document.
    pub fn to_css(&self) -> String {
        let mut output = String::new();
        self.print_node(self.root, 0, &mut output);

        output
    }

    /// Serializes a single node and its subtree, without a trailing newline.
    pub fn node_to_css(&self, id: NodeId) -> String {
        let mut output = String::new();
        self.print_node(id, 0, &mut output);

        output.trim_end().to_string()
    }

    fn print_node(&self, id: NodeId, depth: usize, output: &mut String) {
        let indent = "  ".repeat(depth);

        match self.node(id) {
            Some(CssNode::Root) => {
                for child in self.children(id) {
                    self.print_node(child, depth, output);
                }
            }
            Some(CssNode::Rule { selector }) => self.print_block(id, &indent, selector, depth, output),
            Some(CssNode::AtRule {
                name,
                params,
                has_block,
            }) => {
                let header = if params.is_empty() {
                    format!("@{}", name)
                } else {
                    format!("@{} {}", name, params)
                };

                if *has_block {
                    self.print_block(id, &indent, &header, depth, output);
                } else {
                    output.push_str(&format!("{}{};\n", indent, header));
                }
            }
            Some(CssNode::Declaration { prop, value }) => {
                output.push_str(&format!("{}{}: {};\n", indent, prop, value));
            }
            None => {}
        }
    }

    fn print_block(&self, id: NodeId, indent: &str, header: &str, depth: usize, output: &mut String) {
        if !self.has_children(id) {
            output.push_str(&format!("{}{} {{}}\n", indent, header));
            return;
        }

        output.push_str(&format!("{}{} {{\n", indent, header));

        for child in self.children(id) {
            self.print_node(child, depth + 1, output);
        }

        output.push_str(&format!("{}}}\n", indent));
    }
}
