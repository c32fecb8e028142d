use indextree::NodeId;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::{stylesheet::Stylesheet, utils::remove_rule_if_empty::remove_rule_if_empty};

use super::{
    animations::{animation_names, is_animation_property},
    Synthesizer, Transformation,
};

lazy_static! {
    static ref CLASS_SELECTOR_RE: Regex = Regex::new(r"^&?\.\w").unwrap();
}

impl Synthesizer {
    /// Whether a rule survives the used-class filter.
    ///
    /// Only rules whose selector starts with a class (`.name` or `&.name`) are
    /// checked; every rule passes when no used classes were configured.
    pub(super) fn is_rule_used(&self, stylesheet: &Stylesheet, rule: NodeId) -> bool {
        let (Some(used_classes), Some(selector)) =
            (self.configatron.get_used_classes(), stylesheet.selector(rule))
        else {
            return true;
        };

        let selector = selector.trim();

        if !CLASS_SELECTOR_RE.is_match(selector) {
            return true;
        }

        let class_name = selector.trim_start_matches('&').trim_start_matches('.');

        used_classes.iter().any(|pattern| pattern.is_match(class_name))
    }

    /// Removes an unused rule, remembering the animations it referenced and
    /// pruning the ancestors it leaves empty.
    pub(super) fn remove_unused_rule(
        &self,
        stylesheet: &mut Stylesheet,
        rule: NodeId,
        transformation: &mut Transformation,
    ) {
        for declaration in stylesheet.declarations(rule) {
            if let Some((property, value)) = stylesheet.declaration(declaration) {
                if is_animation_property(property) {
                    transformation.unused_animations.extend(animation_names(value));
                }
            }
        }

        debug!(selector = ?stylesheet.selector(rule), "Removing unused rule");

        let parent = stylesheet.parent(rule);
        stylesheet.remove(rule);

        if let Some(parent) = parent {
            let is_prunable = stylesheet
                .selector(parent)
                .is_some_and(|selector| selector.trim_start_matches('&').starts_with('.'))
                || stylesheet.is_conditional_at_rule(parent);

            if is_prunable {
                remove_rule_if_empty(stylesheet, parent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{configatron::Configatron, stylesheet::Stylesheet, synthesizer::Synthesizer};

    async fn transform(config: &str, css: &str) -> String {
        let mut sheet = Stylesheet::parse(css).unwrap();

        Synthesizer::new(Configatron::from_json(config).unwrap())
            .transform(&mut sheet, None)
            .await
            .unwrap();

        sheet.to_css()
    }

    #[tokio::test]
    async fn removes_unused_classes_and_their_keyframes() {
        let output = transform(
            r#"{ "scope": { "classNames": false }, "usedClasses": ["class1"] }"#,
            ".class1 { animation: 1s animation1; }\n.class2 { animation: 1s animation2; }\n@keyframes animation1 { to { opacity: 0; } }\n@keyframes animation2 { to { opacity: 1; } }",
        )
        .await;

        assert_eq!(
            output,
            ".class1 {\n  animation: 1s animation1;\n}\n@keyframes animation1 {\n  to {\n    opacity: 0;\n  }\n}\n"
        );
    }

    #[tokio::test]
    async fn keeps_keyframes_still_referenced_by_used_classes() {
        let output = transform(
            r#"{ "scope": { "classNames": false }, "usedClasses": ["^kept$"] }"#,
            ".kept { animation: 1s shared; }\n.dropped { animation: 1s shared; }\n@keyframes shared { to { opacity: 0; } }",
        )
        .await;

        assert_eq!(
            output,
            ".kept {\n  animation: 1s shared;\n}\n@keyframes shared {\n  to {\n    opacity: 0;\n  }\n}\n"
        );
    }

    #[tokio::test]
    async fn keeps_keyframes_referenced_from_nested_rules() {
        let output = transform(
            r#"{ "scope": { "classNames": false }, "usedClasses": ["kept", "inner"] }"#,
            ".kept { .inner { animation: 1s shared; } }\n.dropped { animation: 1s shared; }\n@keyframes shared { to { opacity: 0; } }",
        )
        .await;

        assert_eq!(
            output,
            ".kept .inner {\n  animation: 1s shared;\n}\n@keyframes shared {\n  to {\n    opacity: 0;\n  }\n}\n"
        );
    }

    #[tokio::test]
    async fn prunes_nested_unused_classes() {
        let output = transform(
            r#"{ "scope": { "classNames": false }, "usedClasses": ["panel", "title"] }"#,
            ".panel { .title { color: red; } .unused { color: blue; } }\n.panel .other { color: green; }\ndiv { color: black; }",
        )
        .await;

        assert_eq!(
            output,
            ".panel .title {\n  color: red;\n}\ndiv {\n  color: black;\n}\n"
        );
    }

    #[tokio::test]
    async fn empty_used_classes_keep_every_rule() {
        let output = transform(
            r#"{ "scope": { "classNames": false }, "usedClasses": [] }"#,
            ".a { color: red; }\n.b { color: blue; }",
        )
        .await;

        assert_eq!(output, ".a {\n  color: red;\n}\n.b {\n  color: blue;\n}\n");
    }

    #[tokio::test]
    async fn prunes_parents_left_empty() {
        let output = transform(
            r#"{ "scope": { "classNames": false }, "usedClasses": ["a"] }"#,
            "@media (x) { .b { color: red; } }\n.a { color: blue; }",
        )
        .await;

        assert_eq!(output, ".a {\n  color: blue;\n}\n");
    }
}
