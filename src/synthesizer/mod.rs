use indexmap::{IndexMap, IndexSet};
use indextree::NodeId;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    configatron::{Configatron, SelectorsMode},
    crealion::{rule_group_key, Crealion, RuleGroups, RuleOccurrence, UtilityRule},
    scopist::Scopist,
    selectors::{flatten::flat_selectors, nest::nest_selectors},
    stylesheet::Stylesheet,
    utils::count_ancestors::count_ancestors,
    UtilityModulesResult,
};

mod animations;
mod class_names;
mod used_classes;
mod variables;

/// Outcome of transforming one document.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct TransformReport {
    /// `false` when the document was filtered out or the options left nothing to do.
    pub processed: bool,
    /// Original class name to `scoped_name utility...`.
    pub modules: IndexMap<String, String>,
    /// Utility class name to the CSS text defining it.
    pub utility_modules: IndexMap<String, String>,
    /// Original animation name to its scoped name.
    pub keyframes: IndexMap<String, String>,
    /// Original custom property to its scoped name.
    pub css_variables: IndexMap<String, String>,
}

/// Per-document state, created empty for every call to [`Synthesizer::transform`].
#[derive(Debug, Default)]
struct Transformation {
    file_path: String,
    source_css: String,
    suffix: String,
    modules: IndexMap<String, String>,
    keyframes: IndexMap<String, String>,
    css_variables: IndexMap<String, String>,
    /// Animations referenced by removed rules.
    unused_animations: IndexSet<String>,
    /// Animations referenced by the rules left in the document.
    referenced_animations: IndexSet<String>,
    groups: RuleGroups,
}

impl Transformation {
    fn collect_group(&mut self, stylesheet: &Stylesheet, key: String, node: NodeId) {
        if let Some(ancestors) = count_ancestors(stylesheet, node) {
            self.groups
                .entry(key)
                .or_default()
                .push(RuleOccurrence { ancestors, node });
        }
    }
}

/// Drives the transformation of documents with a fixed configuration.
///
/// A `Synthesizer` holds no per-document state, so one instance can
/// transform any number of documents, concurrently or not.
#[derive(Clone, Debug)]
pub struct Synthesizer {
    configatron: Configatron,
    scopist: Scopist,
}

impl Synthesizer {
    pub fn new(configatron: Configatron) -> Self {
        let scopist = configatron.generate_scopist();

        Self {
            configatron,
            scopist,
        }
    }

    pub fn get_configatron(&self) -> &Configatron {
        &self.configatron
    }

    /// Transforms a document in place.
    ///
    /// The stages run in order: file filter, nesting, rule walk (used classes,
    /// rule groups), declaration rewrite (animations, custom properties),
    /// at-rule walk (keyframes, at-rule groups), utility extraction, class
    /// suffixing, flattening and utility output. The registered callbacks then
    /// receive the final maps.
    ///
    /// # Arguments
    ///
    /// * `stylesheet` - The document to transform.
    /// * `file_path` - Path of the document, `"unknown"` when not given.
    ///
    /// # Returns
    ///
    /// The report holding the produced maps, or the error returned by a callback.
    /// A failing callback leaves the document in its transformed state.
    pub async fn transform(
        &self,
        stylesheet: &mut Stylesheet,
        file_path: Option<&str>,
    ) -> UtilityModulesResult<TransformReport> {
        let file_path = file_path.unwrap_or("unknown");

        if let Some(filter) = self.configatron.get_test_filter() {
            if !filter.allows(file_path) {
                debug!(file_path, "Skipping stylesheet rejected by the test filter");

                return Ok(TransformReport::default());
            }
        }

        let class_scoping = self.scopist.is_class_scoping_enabled();
        let utility = self.configatron.get_utility();

        if !class_scoping && !self.scopist.is_variable_scoping_enabled() && utility.is_some() {
            info!(
                file_path,
                "Class and variable scoping are disabled while utility classes are requested, leaving the stylesheet untouched"
            );

            return Ok(TransformReport::default());
        }

        let source_css = stylesheet.to_css();
        let suffix = self.scopist.class_suffix(&source_css);

        info!(file_path, suffix = %suffix, "Transforming stylesheet");

        let mut transformation = Transformation {
            file_path: file_path.to_string(),
            source_css,
            suffix,
            ..Default::default()
        };

        nest_selectors(stylesheet);

        self.scope_root_variables(stylesheet, &mut transformation);
        self.walk_rules(stylesheet, &mut transformation);
        self.rewrite_declarations(stylesheet, &mut transformation);
        self.walk_at_rules(stylesheet, &mut transformation);

        let mut utility_rules: IndexMap<String, UtilityRule> = IndexMap::new();

        if let Some(options) = utility {
            Crealion::new(
                stylesheet,
                options,
                self.configatron.get_scope_length(),
                self.configatron.get_selectors(),
            )
            .process_rule_groups(
                &transformation.groups,
                &mut transformation.modules,
                &mut utility_rules,
            );
        }

        if class_scoping {
            self.rewrite_class_names(stylesheet, &mut transformation);
        }

        flat_selectors(
            stylesheet,
            self.configatron.get_selectors() != SelectorsMode::Flat,
        );

        if utility.is_some_and(|options| options.get_output()) {
            let root = stylesheet.root();
            let plain = utility_rules.values().filter(|rule| !rule.conditional);
            let conditional = utility_rules.values().filter(|rule| rule.conditional);

            for rule in plain.chain(conditional) {
                stylesheet.append(root, rule.node);
            }
        }

        let report = TransformReport {
            processed: true,
            utility_modules: utility_rules
                .iter()
                .map(|(name, rule)| (name.clone(), stylesheet.node_to_css(rule.node)))
                .collect(),
            modules: transformation.modules,
            keyframes: transformation.keyframes,
            css_variables: transformation.css_variables,
        };

        info!(
            file_path,
            num_modules = report.modules.len(),
            num_utility_modules = report.utility_modules.len(),
            num_keyframes = report.keyframes.len(),
            num_css_variables = report.css_variables.len(),
            "Stylesheet transformed"
        );

        if class_scoping || utility.is_some() {
            if let Some(on_modules) = self.configatron.get_on_modules() {
                on_modules(file_path.to_string(), report.modules.clone()).await?;
            }
        }

        if utility.is_some() {
            if let Some(on_utility_modules) = self.configatron.get_on_utility_modules() {
                on_utility_modules(file_path.to_string(), report.utility_modules.clone()).await?;
            }
        }

        Ok(report)
    }

    /// Walks the rules: drops unused classes and collects the rule groups.
    fn walk_rules(&self, stylesheet: &mut Stylesheet, transformation: &mut Transformation) {
        let utility = self.configatron.get_utility();

        for rule in stylesheet.rules() {
            if !stylesheet.is_attached(rule) || is_inside_keyframes(stylesheet, rule) {
                continue;
            }

            if !self.is_rule_used(stylesheet, rule) {
                self.remove_unused_rule(stylesheet, rule, transformation);
                continue;
            }

            if let Some(options) = utility {
                if let Some(key) = rule_group_key(stylesheet, rule, options) {
                    transformation.collect_group(stylesheet, key, rule);
                }
            }
        }
    }

    /// Walks the at-rules: renames or drops keyframes and collects the at-rule groups.
    fn walk_at_rules(&self, stylesheet: &mut Stylesheet, transformation: &mut Transformation) {
        let utility = self.configatron.get_utility();

        for at_rule in stylesheet.at_rules() {
            if !stylesheet.is_attached(at_rule) {
                continue;
            }

            if stylesheet.is_keyframes(at_rule) {
                self.resolve_keyframes(stylesheet, at_rule, transformation);
            } else if let Some(options) = utility {
                let is_nested = count_ancestors(stylesheet, at_rule).is_some_and(|depth| depth > 0);

                if is_nested {
                    if let Some(key) = rule_group_key(stylesheet, at_rule, options) {
                        transformation.collect_group(stylesheet, key, at_rule);
                    }
                }
            }
        }
    }
}

fn is_inside_keyframes(stylesheet: &Stylesheet, node: NodeId) -> bool {
    let mut current = stylesheet.parent(node);

    while let Some(parent) = current {
        if stylesheet.is_keyframes(parent) {
            return true;
        }

        current = stylesheet.parent(parent);
    }

    false
}
