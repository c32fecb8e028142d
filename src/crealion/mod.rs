use indexmap::IndexMap;
use indextree::NodeId;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, trace};

use crate::{
    configatron::{SelectorsMode, UtilityOptions},
    stylesheet::Stylesheet,
    utils::{
        escape_class_name::escape_class_name,
        extract_class_name::extract_class_name,
        generate_hash::generate_hash,
        generate_utility_class_name::{generate_utility_class_name, AtRuleContext},
        remove_rule_if_empty::remove_rule_if_empty,
    },
};

lazy_static! {
    static ref VENDOR_PREFIX_RE: Regex = Regex::new(r"^-{1,2}(webkit|moz|ms|o)-").unwrap();
}

/// A node sharing a group key, with its distance from the root.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RuleOccurrence {
    pub ancestors: usize,
    pub node: NodeId,
}

/// Occurrences of every group key, in discovery order.
pub type RuleGroups = IndexMap<String, Vec<RuleOccurrence>>;

/// A utility rule built during extraction, still detached from the document.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct UtilityRule {
    pub node: NodeId,
    /// Whether the declarations are wrapped by conditional at-rules.
    pub conditional: bool,
}

/// Owning class and enclosing conditional at-rules (outermost first) of a groupable node.
fn resolve_group(
    stylesheet: &Stylesheet,
    node: NodeId,
    options: &UtilityOptions,
) -> Option<(String, Vec<AtRuleContext>)> {
    let root = stylesheet.root();
    let mut owner: Option<String> = None;
    let mut contexts: Vec<AtRuleContext> = vec![];

    if let Some(selector) = stylesheet.selector(node) {
        owner = Some(extract_class_name(selector)?);
    } else {
        let (name, params) = stylesheet.at_rule(node)?;

        if !stylesheet.is_conditional_at_rule(node) || !options.allows_at_rule(name) {
            return None;
        }

        contexts.push(AtRuleContext::new(name, params));
    }

    let mut current = stylesheet.parent(node)?;

    while current != root {
        if let Some(selector) = stylesheet.selector(current) {
            if owner.is_none() {
                owner = Some(extract_class_name(selector)?);
            }
        } else if let Some((name, params)) = stylesheet.at_rule(current) {
            if !stylesheet.is_conditional_at_rule(current) || !options.allows_at_rule(name) {
                return None;
            }

            contexts.push(AtRuleContext::new(name, params));
        }

        current = stylesheet.parent(current)?;
    }

    contexts.reverse();

    owner.map(|owner| (owner, contexts))
}

fn context_label(context: &AtRuleContext) -> String {
    if context.params.is_empty() {
        format!("@{}", context.name)
    } else {
        format!("@{} {}", context.name, context.params)
    }
}

/// Computes the key a rule or conditional at-rule is grouped under.
///
/// Rules are keyed by their class selector alone (`.a`), wherever they sit,
/// so a repeat nested deeper than the shallowest occurrence is left out of
/// extraction. At-rules are keyed by their owning class followed by the
/// enclosing chain, themselves included (`.a @media X`).
///
/// # Returns
///
/// `None` when the node does not take part in extraction: a rule that is not
/// a single class, an at-rule without a single class owner, a node inside a
/// disabled or non-conditional at-rule, or a node detached from the document.
pub fn rule_group_key(stylesheet: &Stylesheet, node: NodeId, options: &UtilityOptions) -> Option<String> {
    let (owner, contexts) = resolve_group(stylesheet, node, options)?;
    let owner = format!(".{}", owner);

    if stylesheet.is_rule(node) {
        return Some(owner);
    }

    let key: Vec<String> = std::iter::once(owner)
        .chain(contexts.iter().map(context_label))
        .collect();

    Some(key.join(" "))
}

/// Extracts the declarations of grouped class rules into shared utility rules.
#[derive(Debug)]
pub struct Crealion<'a> {
    stylesheet: &'a mut Stylesheet,
    options: &'a UtilityOptions,
    scope_length: usize,
    selectors: SelectorsMode,
}

impl<'a> Crealion<'a> {
    pub fn new(
        stylesheet: &'a mut Stylesheet,
        options: &'a UtilityOptions,
        scope_length: usize,
        selectors: SelectorsMode,
    ) -> Self {
        Self {
            stylesheet,
            options,
            scope_length,
            selectors,
        }
    }

    /// Processes every group, most recently discovered key first.
    ///
    /// # Arguments
    ///
    /// * `groups` - The collected rule groups.
    /// * `modules` - Class module map; entries are created on demand as `class utility...`.
    /// * `utility_modules` - Utility rules by name, shared by every group of the document.
    pub fn process_rule_groups(
        &mut self,
        groups: &RuleGroups,
        modules: &mut IndexMap<String, String>,
        utility_modules: &mut IndexMap<String, UtilityRule>,
    ) {
        info!(num_groups = groups.len(), "Extracting utility classes");

        for (key, occurrences) in groups.iter().rev() {
            self.process_rule_group(key, occurrences, modules, utility_modules);
        }
    }

    fn process_rule_group(
        &mut self,
        key: &str,
        occurrences: &[RuleOccurrence],
        modules: &mut IndexMap<String, String>,
        utility_modules: &mut IndexMap<String, UtilityRule>,
    ) {
        let mut occurrences: Vec<RuleOccurrence> = occurrences
            .iter()
            .filter(|occurrence| self.stylesheet.is_attached(occurrence.node))
            .copied()
            .collect();

        occurrences.sort_by_key(|occurrence| occurrence.ancestors);

        let Some(lower) = occurrences.first().map(|occurrence| occurrence.ancestors) else {
            return;
        };

        let Some((owner, contexts)) = resolve_group(self.stylesheet, occurrences[0].node, self.options)
        else {
            return;
        };

        // Same-depth occurrences under other conditional at-rules keep their declarations.
        let selected: Vec<NodeId> = occurrences
            .iter()
            .take_while(|occurrence| occurrence.ancestors == lower)
            .map(|occurrence| occurrence.node)
            .filter(|node| {
                resolve_group(self.stylesheet, *node, self.options)
                    .is_some_and(|(_, node_contexts)| node_contexts == contexts)
            })
            .collect();

        debug!(key = %key, owner = %owner, num_nodes = selected.len(), depth = lower, "Processing rule group");

        let pooled = self.pool_declarations(&selected);

        for (property, declarations) in pooled {
            let Some(first_value) = declarations.values().next() else {
                continue;
            };

            let utility_name = generate_utility_class_name(
                self.options.get_mode(),
                &property,
                first_value,
                self.scope_length,
                &contexts,
            );
            let utility_name =
                self.disambiguate_utility_name(utility_name, &contexts, &declarations, utility_modules);

            if !utility_modules.contains_key(&utility_name) {
                let node = self.build_utility_rule(&utility_name, &contexts, &declarations);

                trace!(utility = %utility_name, "Created utility rule");

                utility_modules.insert(
                    utility_name.clone(),
                    UtilityRule {
                        node,
                        conditional: !contexts.is_empty(),
                    },
                );
            }

            let entry = modules.entry(owner.clone()).or_insert_with(|| owner.clone());

            if !entry.split_whitespace().skip(1).any(|token| token == utility_name) {
                entry.push(' ');
                entry.push_str(&utility_name);
            }
        }

        for node in selected {
            remove_rule_if_empty(self.stylesheet, node);
        }
    }

    /// Keeps a generated name unless it is already taken by a utility with another body.
    ///
    /// Readable names fold distinct values together (`"a b"` and `"a_b"`), so a
    /// clash gets a hash of the declarations appended.
    fn disambiguate_utility_name(
        &mut self,
        utility_name: String,
        contexts: &[AtRuleContext],
        declarations: &IndexMap<String, String>,
        utility_modules: &IndexMap<String, UtilityRule>,
    ) -> String {
        let Some(existing) = utility_modules.get(&utility_name) else {
            return utility_name;
        };

        let candidate = self.build_utility_rule(&utility_name, contexts, declarations);

        if self.stylesheet.node_to_css(candidate) == self.stylesheet.node_to_css(existing.node) {
            return utility_name;
        }

        let parts: Vec<&str> = declarations
            .iter()
            .flat_map(|(property, value)| [property.as_str(), value.as_str()])
            .collect();
        let disambiguated = format!("{}_{}", utility_name, generate_hash(self.scope_length, &parts));

        debug!(utility = %utility_name, renamed = %disambiguated, "Utility name taken by another body");

        disambiguated
    }

    /// Removes the extractable declarations of the nodes and pools them by canonical
    /// property, in document order. A repeated raw property keeps its first position
    /// and takes the later value.
    fn pool_declarations(&mut self, nodes: &[NodeId]) -> IndexMap<String, IndexMap<String, String>> {
        let mut pooled: IndexMap<String, IndexMap<String, String>> = IndexMap::new();

        for node in nodes {
            for child in self.stylesheet.children(*node) {
                let Some((property, value)) = self.stylesheet.declaration(child) else {
                    continue;
                };

                if property.starts_with("--") && !VENDOR_PREFIX_RE.is_match(property) {
                    continue;
                }

                let is_filtered_out = self
                    .options
                    .get_property_filter()
                    .is_some_and(|filter| !filter.allows(property))
                    || self
                        .options
                        .get_value_filter()
                        .is_some_and(|filter| !filter.allows(value));

                if is_filtered_out {
                    continue;
                }

                let canonical = VENDOR_PREFIX_RE.replace(property, "").to_string();

                pooled
                    .entry(canonical)
                    .or_default()
                    .insert(property.to_string(), value.to_string());

                self.stylesheet.remove(child);
            }
        }

        pooled
    }

    /// Builds `.name { @at { decls } }` in nested mode and `@at { .name { decls } }` in flat mode.
    fn build_utility_rule(
        &mut self,
        utility_name: &str,
        contexts: &[AtRuleContext],
        declarations: &IndexMap<String, String>,
    ) -> NodeId {
        let rule = self
            .stylesheet
            .create_rule(&format!(".{}", escape_class_name(utility_name)));

        let wrappers: Vec<NodeId> = contexts
            .iter()
            .map(|context| self.stylesheet.create_at_rule(&context.name, &context.params))
            .collect();

        for pair in wrappers.windows(2) {
            self.stylesheet.append(pair[0], pair[1]);
        }

        let (top, body) = match (wrappers.first(), wrappers.last()) {
            (Some(outermost), Some(innermost)) => match self.selectors {
                SelectorsMode::Nested => {
                    self.stylesheet.append(rule, *outermost);

                    (rule, *innermost)
                }
                SelectorsMode::Flat => {
                    self.stylesheet.append(*innermost, rule);

                    (*outermost, rule)
                }
            },
            _ => (rule, rule),
        };

        for (property, value) in declarations {
            let declaration = self.stylesheet.create_declaration(property, value);
            self.stylesheet.append(body, declaration);
        }

        top
    }
}
