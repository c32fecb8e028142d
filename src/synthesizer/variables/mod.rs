use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::trace;

use crate::stylesheet::Stylesheet;

use super::{Synthesizer, Transformation};

lazy_static! {
    static ref VAR_REFERENCE_RE: Regex = Regex::new(r"(var\(\s*)(--[\w-]+)").unwrap();
}

impl Synthesizer {
    /// Suffixes the custom properties declared in `:root` rules.
    ///
    /// Runs before any other declaration is rewritten so that every `var()`
    /// reference, wherever it appears, sees the complete map.
    pub(super) fn scope_root_variables(
        &self,
        stylesheet: &mut Stylesheet,
        transformation: &mut Transformation,
    ) {
        let (Some(css_variables), Some(variable_suffix)) = (
            self.configatron.get_css_variables(),
            self.scopist.variable_suffix(),
        ) else {
            return;
        };

        for rule in stylesheet.rules() {
            if stylesheet.selector(rule).map(str::trim) != Some(":root") {
                continue;
            }

            for declaration in stylesheet.declarations(rule) {
                let Some((property, value)) = stylesheet.declaration(declaration) else {
                    continue;
                };

                if !property.starts_with("--") || !css_variables.allows(property) {
                    continue;
                }

                let property = property.to_string();
                let value = value.to_string();
                let scoped = transformation
                    .css_variables
                    .entry(property.clone())
                    .or_insert_with(|| format!("{}{}", property, variable_suffix))
                    .clone();

                trace!(property = %property, scoped = %scoped, "Scoped custom property");

                stylesheet.set_declaration(declaration, scoped, value);
            }
        }
    }
}

/// Rewrites the `var()` references of a value through the custom property map.
pub(super) fn rewrite_variable_references(value: &str, css_variables: &IndexMap<String, String>) -> String {
    VAR_REFERENCE_RE
        .replace_all(value, |caps: &Captures| match css_variables.get(&caps[2]) {
            Some(scoped) => format!("{}{}", &caps[1], scoped),
            None => caps[0].to_string(),
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use crate::{
        configatron::Configatron,
        stylesheet::Stylesheet,
        synthesizer::{variables::rewrite_variable_references, Synthesizer},
        utils::generate_hash::generate_hash,
    };

    #[test]
    fn rewrites_known_references_only() {
        let mut css_variables = IndexMap::new();
        css_variables.insert("--color".to_string(), "--color_x".to_string());

        assert_eq!(
            rewrite_variable_references(
                "var(--color) var( --color, red) var(--color-dark) var(--other)",
                &css_variables
            ),
            "var(--color_x) var( --color_x, red) var(--color-dark) var(--other)"
        );
    }

    #[tokio::test]
    async fn scopes_root_variables_and_their_references() {
        let css = ":root { --width: 10px; --color: red; }\n.a { color: var(--color); width: var(--width); }";
        let v = format!("_{}", generate_hash(8, &["/"]));
        let config = Configatron::from_json(
            r#"{ "scope": { "classNames": false, "cssVariables": { "exclude": ["/--width/"] } } }"#,
        )
        .unwrap();
        let mut sheet = Stylesheet::parse(css).unwrap();

        let report = Synthesizer::new(config)
            .transform(&mut sheet, None)
            .await
            .unwrap();

        assert_eq!(
            sheet.to_css(),
            format!(
                ":root {{\n  --width: 10px;\n  --color{v}: red;\n}}\n.a {{\n  color: var(--color{v});\n  width: var(--width);\n}}\n",
                v = v
            )
        );
        assert_eq!(report.css_variables.get("--color"), Some(&format!("--color{}", v)));
        assert_eq!(report.css_variables.get("--width"), None);
    }

    #[tokio::test]
    async fn custom_key_changes_the_variable_scope() {
        let css = ":root { --gap: 1px; }";
        let config =
            Configatron::from_json(r#"{ "scope": { "cssVariables": "theme" } }"#).unwrap();
        let mut sheet = Stylesheet::parse(css).unwrap();

        let report = Synthesizer::new(config)
            .transform(&mut sheet, None)
            .await
            .unwrap();

        assert_eq!(
            report.css_variables.get("--gap"),
            Some(&format!("--gap_{}", generate_hash(8, &["theme"])))
        );
    }
}
