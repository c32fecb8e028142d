use indextree::NodeId;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, trace};

use crate::{stylesheet::Stylesheet, utils::split_comma_separated::split_comma_separated};

use super::{variables::rewrite_variable_references, Synthesizer, Transformation};

lazy_static! {
    static ref ANIMATION_PROPERTY_RE: Regex =
        Regex::new(r"^(-(webkit|moz|ms|o)-)?animation(-name)?$").unwrap();
    static ref ANIMATION_NAME_RE: Regex = Regex::new(r"(global\()?[\w\-$]+\)?$").unwrap();
}

/// Trailing tokens of an animation layer that are never animation names.
const RESERVED_ANIMATION_TOKENS: [&str; 22] = [
    "none",
    "initial",
    "inherit",
    "unset",
    "revert",
    "linear",
    "ease",
    "ease-in",
    "ease-out",
    "ease-in-out",
    "step-start",
    "step-end",
    "infinite",
    "normal",
    "reverse",
    "alternate",
    "alternate-reverse",
    "forwards",
    "backwards",
    "both",
    "running",
    "paused",
];

/// Locates the animation name of a layer.
///
/// # Returns
///
/// The byte range of the matched token and the bare name, with a `global(...)`
/// escape removed and a flag telling whether it was present.
fn find_animation_name(layer: &str) -> Option<(usize, usize, &str, bool)> {
    let trimmed = layer.trim_end();
    let token = ANIMATION_NAME_RE.find(trimmed)?;
    let preceding = trimmed[..token.start()].chars().next_back();

    if preceding.is_some_and(|character| !character.is_whitespace()) {
        return None;
    }

    let (name, is_global) = match token.as_str().strip_prefix("global(") {
        Some(escaped) => (escaped.trim_end_matches(')'), true),
        None if token.as_str().ends_with(')') => return None,
        None => (token.as_str(), false),
    };

    let is_reserved = RESERVED_ANIMATION_TOKENS.contains(&name.to_ascii_lowercase().as_str());

    if name.is_empty() || is_reserved || name.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    Some((token.start(), token.end(), name, is_global))
}

/// Bare animation names referenced by a value.
pub(super) fn animation_names(value: &str) -> Vec<String> {
    split_comma_separated(value)
        .into_iter()
        .filter_map(|layer| find_animation_name(layer).map(|(_, _, name, _)| name.to_string()))
        .collect()
}

pub(super) fn is_animation_property(property: &str) -> bool {
    ANIMATION_PROPERTY_RE.is_match(property)
}

impl Synthesizer {
    /// Rewrites the animation names and `var()` references of every declaration left in the document.
    pub(super) fn rewrite_declarations(
        &self,
        stylesheet: &mut Stylesheet,
        transformation: &mut Transformation,
    ) {
        for declaration in stylesheet.declarations(stylesheet.root()) {
            let Some((property, value)) = stylesheet.declaration(declaration) else {
                continue;
            };

            let mut rewritten = value.to_string();

            if is_animation_property(property) {
                rewritten = self.rewrite_animation_value(&rewritten, transformation);
            }

            if !transformation.css_variables.is_empty() {
                rewritten = rewrite_variable_references(&rewritten, &transformation.css_variables);
            }

            if rewritten != value {
                let property = property.to_string();

                trace!(property = %property, value = %rewritten, "Rewrote declaration");

                stylesheet.set_declaration(declaration, property, rewritten);
            }
        }
    }

    /// Renames each layer's animation name, recording it as referenced.
    ///
    /// `global(name)` is unwrapped to `name`; any other name gets the document
    /// suffix when class scoping is enabled.
    fn rewrite_animation_value(&self, value: &str, transformation: &mut Transformation) -> String {
        let class_scoping = self.scopist.is_class_scoping_enabled();
        let mut layers: Vec<String> = vec![];

        for layer in split_comma_separated(value) {
            let Some((start, end, name, is_global)) = find_animation_name(layer) else {
                layers.push(layer.to_string());
                continue;
            };

            transformation.referenced_animations.insert(name.to_string());

            let renamed = if is_global || !class_scoping {
                name.to_string()
            } else {
                transformation
                    .keyframes
                    .entry(name.to_string())
                    .or_insert_with(|| format!("{}{}", name, transformation.suffix))
                    .clone()
            };

            layers.push(format!("{}{}{}", &layer[..start], renamed, &layer[end..]));
        }

        layers.join(", ")
    }

    /// Drops a keyframes block only referenced by removed rules, or renames it.
    pub(super) fn resolve_keyframes(
        &self,
        stylesheet: &mut Stylesheet,
        at_rule: NodeId,
        transformation: &mut Transformation,
    ) {
        let Some(name) = stylesheet
            .at_rule(at_rule)
            .map(|(_, params)| params.trim().to_string())
        else {
            return;
        };

        if transformation.unused_animations.contains(&name)
            && !transformation.referenced_animations.contains(&name)
        {
            debug!(animation = %name, "Removing keyframes of unused animation");

            stylesheet.remove(at_rule);
        } else if let Some(scoped) = transformation.keyframes.get(&name) {
            stylesheet.set_at_rule_params(at_rule, scoped.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        configatron::Configatron,
        stylesheet::Stylesheet,
        synthesizer::{animations::animation_names, Synthesizer},
        utils::generate_hash::generate_hash,
    };

    #[test]
    fn extracts_trailing_animation_names() {
        assert_eq!(
            animation_names("3s linear animation1, 3s ease-out 5s global(animation2)"),
            vec!["animation1", "animation2"]
        );
        assert_eq!(animation_names("fade"), vec!["fade"]);
        assert!(animation_names("none").is_empty());
        assert!(animation_names("1s steps(4)").is_empty());
        assert!(animation_names("1s linear infinite").is_empty());
        assert!(animation_names("1s var(--name)").is_empty());
    }

    #[tokio::test]
    async fn suffixes_animations_and_their_keyframes() {
        let css = ".example { animation: 3s linear animation1, 3s ease-out 5s global(animation2); }\n@keyframes animation1 { to { opacity: 0; } }\n@keyframes animation2 { to { opacity: 1; } }";
        let s = format!("_{}", generate_hash(8, &[&Stylesheet::parse(css).unwrap().to_css()]));
        let mut sheet = Stylesheet::parse(css).unwrap();

        let report = Synthesizer::new(Configatron::default())
            .transform(&mut sheet, None)
            .await
            .unwrap();

        assert_eq!(
            sheet.to_css(),
            format!(
                ".example{s} {{\n  animation: 3s linear animation1{s}, 3s ease-out 5s animation2;\n}}\n@keyframes animation1{s} {{\n  to {{\n    opacity: 0;\n  }}\n}}\n@keyframes animation2 {{\n  to {{\n    opacity: 1;\n  }}\n}}\n",
                s = s
            )
        );
        assert_eq!(report.keyframes.get("animation1"), Some(&format!("animation1{}", s)));
        assert_eq!(report.keyframes.get("animation2"), None);
    }

    #[tokio::test]
    async fn strips_global_escapes_without_class_scoping() {
        let css = ".a { animation-name: global(spin); }";
        let config = Configatron::from_json(r#"{ "scope": { "classNames": false } }"#).unwrap();
        let mut sheet = Stylesheet::parse(css).unwrap();

        let report = Synthesizer::new(config)
            .transform(&mut sheet, None)
            .await
            .unwrap();

        assert_eq!(sheet.to_css(), ".a {\n  animation-name: spin;\n}\n");
        assert!(report.keyframes.is_empty());
    }
}
