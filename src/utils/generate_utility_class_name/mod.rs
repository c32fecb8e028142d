use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::utils::generate_hash::generate_hash;

lazy_static! {
    static ref DOT_PREFIX_RE: Regex = Regex::new(r"(^|[\s,(])\.(\d)").unwrap();
    static ref VALUE_SEPARATOR_RE: Regex = Regex::new(r"[\s,()]+").unwrap();
    static ref PARAMS_SPACING_RE: Regex = Regex::new(r":? +").unwrap();
}

/// How utility class names are encoded.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtilityMode {
    /// `color[_red]`
    #[default]
    Readable,
    /// `color[_b1f5a0c2]`
    Semireadable,
    /// `_6c3e1f0a`
    #[serde(alias = "encoded")]
    Coded,
}

/// A conditional at-rule enclosing the declarations a utility is built from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AtRuleContext {
    pub name: String,
    pub params: String,
}

impl AtRuleContext {
    pub fn new(name: &str, params: &str) -> Self {
        Self {
            name: name.to_string(),
            params: params.to_string(),
        }
    }
}

/// Generates the utility class name of a property/value pair.
///
/// # Arguments
///
/// * `mode` - The encoding to use.
/// * `property` - The canonical property name.
/// * `value` - The value used for naming.
/// * `scope_length` - Length of the hashes embedded in the name.
/// * `at_rules` - Enclosing conditional at-rules, outermost first.
///
/// # Returns
///
/// The unescaped class name. The same inputs always produce the same name.
pub fn generate_utility_class_name(
    mode: UtilityMode,
    property: &str,
    value: &str,
    scope_length: usize,
    at_rules: &[AtRuleContext],
) -> String {
    match mode {
        UtilityMode::Readable => {
            let prefix: String = at_rules.iter().map(readable_at_rule).collect();
            let value = readable_value(value);

            if prefix.is_empty() {
                format!("{}[_{}]", property, value)
            } else {
                format!("{}[{}][_{}]", prefix, property, value)
            }
        }
        UtilityMode::Semireadable => match at_rules.first() {
            None => format!("{}[_{}]", property, generate_hash(scope_length, &[value])),
            Some(outermost) => {
                let mut parts: Vec<&str> = vec![];

                for (index, context) in at_rules.iter().enumerate() {
                    if index > 0 {
                        parts.push(&context.name);
                    }

                    parts.push(&context.params);
                }

                parts.push(property);
                parts.push(value);

                format!(
                    "{}[_{}]",
                    outermost.name,
                    generate_hash(scope_length, &parts)
                )
            }
        },
        UtilityMode::Coded => {
            let mut parts: Vec<&str> = vec![];

            for context in at_rules {
                parts.push(&context.name);
                parts.push(&context.params);
            }

            parts.push(property);
            parts.push(value);

            format!("_{}", generate_hash(scope_length, &parts))
        }
    }
}

fn readable_value(value: &str) -> String {
    let value = DOT_PREFIX_RE.replace_all(value.trim(), "${1}0.${2}");

    VALUE_SEPARATOR_RE
        .replace_all(&value, "_")
        .trim_matches('_')
        .to_string()
}

fn readable_at_rule(context: &AtRuleContext) -> String {
    let params = DOT_PREFIX_RE.replace_all(context.params.trim(), "${1}0.${2}");
    let params = params.replace(',', "_");
    let params = PARAMS_SPACING_RE.replace_all(&params, "-");
    let params = params.replace(['(', ')'], "");

    if params.is_empty() {
        context.name.clone()
    } else {
        format!("{}[_{}]", context.name, params)
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::{
        generate_hash::generate_hash,
        generate_utility_class_name::{generate_utility_class_name, AtRuleContext, UtilityMode},
    };

    #[test]
    fn readable_names() {
        let name = |property: &str, value: &str| {
            generate_utility_class_name(UtilityMode::Readable, property, value, 8, &[])
        };

        assert_eq!(name("color", "red"), "color[_red]");
        assert_eq!(name("transition", "all 4s ease"), "transition[_all_4s_ease]");
        assert_eq!(name("margin", "0 .5em"), "margin[_0_0.5em]");
        assert_eq!(
            name("box-shadow", "0 0 4px rgba(0, 0, 0, .5)"),
            "box-shadow[_0_0_4px_rgba_0_0_0_0.5]"
        );
    }

    #[test]
    fn readable_names_with_at_rules() {
        let media = [AtRuleContext::new("media", "(max-width: 300px)")];
        let container = [AtRuleContext::new("container", "")];

        assert_eq!(
            generate_utility_class_name(UtilityMode::Readable, "background-color", "green", 8, &media),
            "media[_max-width-300px][background-color][_green]"
        );
        assert_eq!(
            generate_utility_class_name(UtilityMode::Readable, "background-color", "green", 8, &container),
            "container[background-color][_green]"
        );
        assert_eq!(
            generate_utility_class_name(
                UtilityMode::Readable,
                "color",
                "red",
                8,
                &[
                    AtRuleContext::new("supports", "(display: grid)"),
                    AtRuleContext::new("media", "screen and (min-width: 30em)")
                ]
            ),
            "supports[_display-grid]media[_screen-and-min-width-30em][color][_red]"
        );
    }

    #[test]
    fn semireadable_names() {
        assert_eq!(
            generate_utility_class_name(UtilityMode::Semireadable, "color", "red", 8, &[]),
            format!("color[_{}]", generate_hash(8, &["red"]))
        );
        assert_eq!(
            generate_utility_class_name(
                UtilityMode::Semireadable,
                "color",
                "red",
                8,
                &[AtRuleContext::new("media", "(max-width: 300px)")]
            ),
            format!(
                "media[_{}]",
                generate_hash(8, &["(max-width: 300px)", "color", "red"])
            )
        );
    }

    #[test]
    fn coded_names() {
        assert_eq!(
            generate_utility_class_name(UtilityMode::Coded, "color", "red", 6, &[]),
            format!("_{}", generate_hash(6, &["color", "red"]))
        );
        assert_eq!(
            generate_utility_class_name(
                UtilityMode::Coded,
                "color",
                "red",
                8,
                &[AtRuleContext::new("media", "print")]
            ),
            format!("_{}", generate_hash(8, &["media", "print", "color", "red"]))
        );
    }

    #[test]
    fn names_are_stable_and_distinct() {
        for mode in [UtilityMode::Readable, UtilityMode::Semireadable, UtilityMode::Coded] {
            let first = generate_utility_class_name(mode, "color", "red", 8, &[]);

            assert_eq!(first, generate_utility_class_name(mode, "color", "red", 8, &[]));
            assert_ne!(first, generate_utility_class_name(mode, "color", "blue", 8, &[]));
        }
    }

    #[test]
    fn mode_deserializes_with_alias() {
        let mode: UtilityMode = serde_json::from_str("\"encoded\"").unwrap();

        assert_eq!(mode, UtilityMode::Coded);
    }
}
