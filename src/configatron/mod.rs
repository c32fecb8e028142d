use std::{fmt, future::Future, sync::Arc};

use futures::{future::BoxFuture, FutureExt};
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{ErrorAction, ErrorKind, UtilityModulesError},
    gatekeeper::Gatekeeper,
    scopist::{ClassNameScoping, Scopist},
    utils::generate_utility_class_name::UtilityMode,
    UtilityModulesResult,
};

/// Callback receiving `(file_path, map)` once a document has been transformed.
pub type ModulesCallback = Arc<
    dyn Fn(String, IndexMap<String, String>) -> BoxFuture<'static, UtilityModulesResult<()>>
        + Send
        + Sync,
>;

/// A single pattern or a list of patterns.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum FilterPatternJson {
    Single(String),
    Multiple(Vec<String>),
}

impl FilterPatternJson {
    fn to_vec(&self) -> Vec<String> {
        match self {
            FilterPatternJson::Single(pattern) => vec![pattern.clone()],
            FilterPatternJson::Multiple(patterns) => patterns.clone(),
        }
    }
}

/// Include/exclude pair as written in the configuration.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct FilterJson {
    #[serde(default)]
    pub include: Option<FilterPatternJson>,
    #[serde(default)]
    pub exclude: Option<FilterPatternJson>,
}

impl FilterJson {
    /// `None` when neither list holds a pattern.
    fn compile(&self) -> UtilityModulesResult<Option<Gatekeeper>> {
        let gatekeeper = compile_filter(&self.include, &self.exclude)?;

        Ok((!gatekeeper.is_empty()).then_some(gatekeeper))
    }
}

fn compile_filter(
    include: &Option<FilterPatternJson>,
    exclude: &Option<FilterPatternJson>,
) -> UtilityModulesResult<Gatekeeper> {
    Gatekeeper::new(
        &include.as_ref().map(FilterPatternJson::to_vec).unwrap_or_default(),
        &exclude.as_ref().map(FilterPatternJson::to_vec).unwrap_or_default(),
    )
}

/// `"scope": 8` or `"scope": { ... }`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum ScopeJson {
    Length(usize),
    Options(ScopeOptionsJson),
}

impl Default for ScopeJson {
    fn default() -> Self {
        ScopeJson::Options(ScopeOptionsJson::default())
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ScopeOptionsJson {
    /// Hex length of the scope ids and utility hashes, defaults to 8.
    #[serde(default = "default_scope_length")]
    pub length: usize,

    /// Renamed in JSON as `classNames` and defaults to `true`.
    #[serde(rename = "classNames", default = "enabled_by_default")]
    pub class_names: bool,

    /// Renamed in JSON as `cssVariables`, disabled by default.
    #[serde(rename = "cssVariables", default = "css_variables_disabled_by_default")]
    pub css_variables: CssVariablesJson,
}

impl Default for ScopeOptionsJson {
    fn default() -> Self {
        Self {
            length: default_scope_length(),
            class_names: enabled_by_default(),
            css_variables: css_variables_disabled_by_default(),
        }
    }
}

/// `true`/`false`, a key, or a key with include/exclude filters.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum CssVariablesJson {
    Toggle(bool),
    Key(String),
    Options {
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        include: Option<FilterPatternJson>,
        #[serde(default)]
        exclude: Option<FilterPatternJson>,
    },
}

/// Output shape of the selectors.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SelectorsMode {
    /// Keep nested rules, only merging single-child chains.
    #[default]
    Nested,
    /// Fully flatten every rule.
    Flat,
}

/// `"utility": true` or `"utility": { ... }`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum UtilityJson {
    Toggle(bool),
    Options(UtilityOptionsJson),
}

impl Default for UtilityJson {
    fn default() -> Self {
        UtilityJson::Toggle(false)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct UtilityOptionsJson {
    #[serde(default)]
    pub mode: UtilityMode,
    #[serde(default = "enabled_by_default")]
    pub media: bool,
    #[serde(default = "enabled_by_default")]
    pub container: bool,
    #[serde(default)]
    pub layer: bool,
    #[serde(default)]
    pub scope: bool,
    #[serde(default)]
    pub supports: bool,
    /// Whether utility rules are appended to the document.
    #[serde(default = "enabled_by_default")]
    pub output: bool,
    #[serde(default)]
    pub property: Option<FilterJson>,
    #[serde(default)]
    pub value: Option<FilterJson>,
}

/// Options as written in a JSON configuration document.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct ConfigurationJson {
    /// File path filter deciding whether a document is processed.
    #[serde(default)]
    pub test: Option<FilterJson>,

    #[serde(default)]
    pub scope: ScopeJson,

    #[serde(default)]
    pub selectors: SelectorsMode,

    /// Renamed in JSON as `usedClasses`. When present, unlisted classes are dropped.
    #[serde(rename = "usedClasses", default)]
    pub used_classes: Option<Vec<String>>,

    #[serde(default)]
    pub utility: UtilityJson,
}

/// Returns `true` as the default value, used for fields requiring an enabled default state.
fn enabled_by_default() -> bool {
    info!("Setting default: true");

    true
}

fn default_scope_length() -> usize {
    info!("Setting default scope length to 8");

    8
}

fn css_variables_disabled_by_default() -> CssVariablesJson {
    info!("Setting default: CSS variables are not scoped");

    CssVariablesJson::Toggle(false)
}

/// Which conditional at-rules take part in utility extraction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct UtilityAtRules {
    pub media: bool,
    pub container: bool,
    pub layer: bool,
    pub scope: bool,
    pub supports: bool,
}

impl Default for UtilityAtRules {
    fn default() -> Self {
        Self {
            media: true,
            container: true,
            layer: false,
            scope: false,
            supports: false,
        }
    }
}

/// Resolved utility extraction options.
#[derive(Clone, Debug)]
pub struct UtilityOptions {
    mode: UtilityMode,
    at_rules: UtilityAtRules,
    output: bool,
    property_filter: Option<Gatekeeper>,
    value_filter: Option<Gatekeeper>,
}

impl Default for UtilityOptions {
    fn default() -> Self {
        Self {
            mode: UtilityMode::Readable,
            at_rules: UtilityAtRules::default(),
            output: true,
            property_filter: None,
            value_filter: None,
        }
    }
}

impl UtilityOptions {
    pub fn new(
        mode: UtilityMode,
        at_rules: UtilityAtRules,
        output: bool,
        property_filter: Option<Gatekeeper>,
        value_filter: Option<Gatekeeper>,
    ) -> Self {
        Self {
            mode,
            at_rules,
            output,
            property_filter,
            value_filter,
        }
    }

    pub fn get_mode(&self) -> UtilityMode {
        self.mode
    }

    pub fn get_output(&self) -> bool {
        self.output
    }

    pub fn get_property_filter(&self) -> Option<&Gatekeeper> {
        self.property_filter.as_ref()
    }

    pub fn get_value_filter(&self) -> Option<&Gatekeeper> {
        self.value_filter.as_ref()
    }

    /// Whether rules wrapped by the named at-rule take part in extraction.
    pub fn allows_at_rule(&self, name: &str) -> bool {
        match name {
            "media" => self.at_rules.media,
            "container" => self.at_rules.container,
            "layer" => self.at_rules.layer,
            "scope" => self.at_rules.scope,
            "supports" => self.at_rules.supports,
            _ => false,
        }
    }
}

/// Resolved custom property scoping.
#[derive(Clone, Debug)]
pub struct CssVariablesScope {
    key: String,
    filter: Gatekeeper,
}

impl CssVariablesScope {
    pub fn new(key: String, filter: Gatekeeper) -> Self {
        Self { key, filter }
    }

    pub fn get_key(&self) -> &str {
        &self.key
    }

    /// Whether the custom property is scoped.
    pub fn allows(&self, property: &str) -> bool {
        self.filter.allows(property)
    }
}

/// Resolved and validated options of the transformation pipeline.
#[derive(Clone)]
pub struct Configatron {
    test_filter: Option<Gatekeeper>,
    scope_length: usize,
    class_names: ClassNameScoping,
    css_variables: Option<CssVariablesScope>,
    selectors: SelectorsMode,
    used_classes: Option<Vec<Regex>>,
    utility: Option<UtilityOptions>,
    on_modules: Option<ModulesCallback>,
    on_utility_modules: Option<ModulesCallback>,
}

impl Default for Configatron {
    fn default() -> Self {
        Self {
            test_filter: None,
            scope_length: 8,
            class_names: ClassNameScoping::Enabled,
            css_variables: None,
            selectors: SelectorsMode::Nested,
            used_classes: None,
            utility: None,
            on_modules: None,
            on_utility_modules: None,
        }
    }
}

impl fmt::Debug for Configatron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configatron")
            .field("test_filter", &self.test_filter)
            .field("scope_length", &self.scope_length)
            .field("class_names", &self.class_names)
            .field("css_variables", &self.css_variables)
            .field("selectors", &self.selectors)
            .field("used_classes", &self.used_classes)
            .field("utility", &self.utility)
            .field("on_modules", &self.on_modules.is_some())
            .field("on_utility_modules", &self.on_utility_modules.is_some())
            .finish()
    }
}

impl Configatron {
    /// Parses and resolves a JSON configuration document.
    ///
    /// # Parameters
    ///
    /// * `raw_config` - The JSON text.
    ///
    /// # Returns
    ///
    /// * `UtilityModulesResult<Self>` - The resolved configuration, or a
    ///   `ConfigParsingError` / `InvalidFilterPattern` / `InvalidUsedClassPattern` error.
    pub fn from_json(raw_config: &str) -> UtilityModulesResult<Self> {
        let config_json: ConfigurationJson = serde_json::from_str(raw_config).map_err(|err| {
            UtilityModulesError::raise_critical_configuration_error(
                ErrorKind::ConfigParsingError,
                &format!("Could not parse the configuration: {}", err),
                ErrorAction::Fix,
            )
        })?;

        Self::from_configuration(&config_json)
    }

    /// Resolves deserialized options, compiling every filter pattern once.
    pub fn from_configuration(config_json: &ConfigurationJson) -> UtilityModulesResult<Self> {
        let test_filter = config_json
            .test
            .as_ref()
            .map(FilterJson::compile)
            .transpose()?
            .flatten();

        let (scope_length, class_names, css_variables) = match &config_json.scope {
            ScopeJson::Length(length) => (*length, true, None),
            ScopeJson::Options(options) => (
                options.length,
                options.class_names,
                resolve_css_variables(&options.css_variables)?,
            ),
        };

        // An empty list means the analyzer found no class, not that every class is unused.
        let used_classes = config_json
            .used_classes
            .as_ref()
            .filter(|patterns| !patterns.is_empty())
            .map(|patterns| compile_used_classes(patterns))
            .transpose()?;

        let utility = match &config_json.utility {
            UtilityJson::Toggle(false) => None,
            UtilityJson::Toggle(true) => Some(UtilityOptions::default()),
            UtilityJson::Options(options) => Some(UtilityOptions::new(
                options.mode,
                UtilityAtRules {
                    media: options.media,
                    container: options.container,
                    layer: options.layer,
                    scope: options.scope,
                    supports: options.supports,
                },
                options.output,
                options.property.as_ref().map(FilterJson::compile).transpose()?.flatten(),
                options.value.as_ref().map(FilterJson::compile).transpose()?.flatten(),
            )),
        };

        info!(
            scope_length,
            class_names,
            css_variables = ?css_variables.as_ref().map(CssVariablesScope::get_key),
            selectors = ?config_json.selectors,
            num_used_classes = ?used_classes.as_ref().map(Vec::len),
            utility = utility.is_some(),
            "Initializing configurations"
        );

        Ok(Self {
            test_filter,
            scope_length,
            class_names: if class_names {
                ClassNameScoping::Enabled
            } else {
                ClassNameScoping::Disabled
            },
            css_variables,
            selectors: config_json.selectors,
            used_classes,
            utility,
            on_modules: None,
            on_utility_modules: None,
        })
    }

    /// Replaces the base of scoped class names with the output of `generator`.
    ///
    /// The generator receives the class name, the file path and the document
    /// text; the scope id is still appended to what it returns.
    pub fn with_class_name_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(&str, &str, &str) -> String + Send + Sync + 'static,
    {
        self.class_names = ClassNameScoping::Custom(Arc::new(generator));
        self
    }

    /// Registers the callback receiving the class module map of each document.
    pub fn on_modules<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(String, IndexMap<String, String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = UtilityModulesResult<()>> + Send + 'static,
    {
        self.on_modules = Some(Arc::new(
            move |file_path: String, modules: IndexMap<String, String>| {
                callback(file_path, modules).boxed()
            },
        ));
        self
    }

    /// Registers the callback receiving the utility module map of each document.
    pub fn on_utility_modules<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(String, IndexMap<String, String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = UtilityModulesResult<()>> + Send + 'static,
    {
        self.on_utility_modules = Some(Arc::new(
            move |file_path: String, utility_modules: IndexMap<String, String>| {
                callback(file_path, utility_modules).boxed()
            },
        ));
        self
    }

    pub fn get_test_filter(&self) -> Option<&Gatekeeper> {
        self.test_filter.as_ref()
    }

    pub fn get_scope_length(&self) -> usize {
        self.scope_length
    }

    pub fn get_css_variables(&self) -> Option<&CssVariablesScope> {
        self.css_variables.as_ref()
    }

    pub fn get_selectors(&self) -> SelectorsMode {
        self.selectors
    }

    pub fn get_used_classes(&self) -> Option<&[Regex]> {
        self.used_classes.as_deref()
    }

    pub fn get_utility(&self) -> Option<&UtilityOptions> {
        self.utility.as_ref()
    }

    pub fn get_on_modules(&self) -> Option<&ModulesCallback> {
        self.on_modules.as_ref()
    }

    pub fn get_on_utility_modules(&self) -> Option<&ModulesCallback> {
        self.on_utility_modules.as_ref()
    }

    /// Builds the scope resolver matching these options.
    pub fn generate_scopist(&self) -> Scopist {
        Scopist::new(
            self.scope_length,
            self.class_names.clone(),
            self.css_variables
                .as_ref()
                .map(|variables| variables.get_key().to_string()),
        )
    }
}

fn resolve_css_variables(
    css_variables: &CssVariablesJson,
) -> UtilityModulesResult<Option<CssVariablesScope>> {
    let allow_all = || Gatekeeper::new(&[], &[]);

    Ok(match css_variables {
        CssVariablesJson::Toggle(false) => None,
        CssVariablesJson::Toggle(true) => Some(CssVariablesScope::new("/".to_string(), allow_all()?)),
        CssVariablesJson::Key(key) if key.is_empty() => None,
        CssVariablesJson::Key(key) => Some(CssVariablesScope::new(key.clone(), allow_all()?)),
        CssVariablesJson::Options {
            key,
            include,
            exclude,
        } => Some(CssVariablesScope::new(
            key.clone()
                .filter(|key| !key.is_empty())
                .unwrap_or_else(|| "/".to_string()),
            compile_filter(include, exclude)?,
        )),
    })
}

fn compile_used_classes(patterns: &[String]) -> UtilityModulesResult<Vec<Regex>> {
    let unique: IndexSet<&String> = patterns.iter().collect();

    unique
        .into_iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|err| {
                UtilityModulesError::raise_critical_configuration_error(
                    ErrorKind::InvalidUsedClassPattern,
                    &format!("Invalid used class pattern `{}`: {}", pattern, err),
                    ErrorAction::Fix,
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::{
        configatron::{
            Configatron, ConfigurationJson, CssVariablesJson, ScopeJson, SelectorsMode, UtilityJson,
        },
        error::{ErrorKind, UtilityModulesError},
        utils::generate_utility_class_name::UtilityMode,
    };

    #[test]
    fn test_default_configuration() {
        let config: ConfigurationJson = serde_json::from_str("{}").unwrap();

        assert_eq!(config.test, None);
        assert_eq!(config.selectors, SelectorsMode::Nested);
        assert_eq!(config.used_classes, None);
        assert_eq!(config.utility, UtilityJson::Toggle(false));

        match config.scope {
            ScopeJson::Options(options) => {
                assert_eq!(options.length, 8);
                assert!(options.class_names);
                assert_eq!(options.css_variables, CssVariablesJson::Toggle(false));
            }
            ScopeJson::Length(_) => panic!("expected scope options"),
        }
    }

    #[test]
    fn test_resolved_defaults() {
        let config = Configatron::from_json("{}").unwrap();

        assert_eq!(config.get_scope_length(), 8);
        assert!(config.generate_scopist().is_class_scoping_enabled());
        assert!(config.get_css_variables().is_none());
        assert!(config.get_used_classes().is_none());
        assert!(config.get_utility().is_none());
        assert!(config.get_test_filter().is_none());
    }

    #[test]
    fn test_custom_configuration() {
        let config = Configatron::from_json(
            r#"
            {
                "test": { "include": "*.module.css", "exclude": ["vendor/**"] },
                "scope": { "length": 6, "classNames": false, "cssVariables": "theme" },
                "selectors": "flat",
                "usedClasses": ["class1", "class1", "^btn-"],
                "utility": { "mode": "encoded", "supports": true, "output": false, "property": { "exclude": "/^--/" } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.get_scope_length(), 6);
        assert!(!config.generate_scopist().is_class_scoping_enabled());
        assert_eq!(config.get_css_variables().map(|v| v.get_key()), Some("theme"));
        assert_eq!(config.get_selectors(), SelectorsMode::Flat);
        assert_eq!(config.get_used_classes().map(|classes| classes.len()), Some(2));

        let test_filter = config.get_test_filter().unwrap();
        assert!(test_filter.allows("src/button.module.css"));
        assert!(!test_filter.allows("vendor/button.module.css"));

        let utility = config.get_utility().unwrap();
        assert_eq!(utility.get_mode(), UtilityMode::Coded);
        assert!(!utility.get_output());
        assert!(utility.allows_at_rule("media"));
        assert!(utility.allows_at_rule("supports"));
        assert!(!utility.allows_at_rule("layer"));
        assert!(!utility.get_property_filter().unwrap().allows("--color"));
        assert!(utility.get_value_filter().is_none());
    }

    #[test]
    fn test_scope_as_number_and_variables_forms() {
        let config = Configatron::from_json(r#"{ "scope": 5, "utility": true }"#).unwrap();

        assert_eq!(config.get_scope_length(), 5);
        assert!(config.get_css_variables().is_none());
        assert!(config.get_utility().unwrap().get_output());

        let config = Configatron::from_json(r#"{ "scope": { "cssVariables": true } }"#).unwrap();
        assert_eq!(config.get_css_variables().map(|v| v.get_key()), Some("/"));

        let config = Configatron::from_json(
            r#"{ "scope": { "cssVariables": { "exclude": ["/--width/"] } } }"#,
        )
        .unwrap();
        let variables = config.get_css_variables().unwrap();

        assert_eq!(variables.get_key(), "/");
        assert!(!variables.allows("--width"));
        assert!(variables.allows("--color"));
    }

    #[test]
    fn test_empty_lists_disable_filters() {
        let config = Configatron::from_json(
            r#"{ "test": {}, "usedClasses": [], "utility": { "property": { "include": [] } } }"#,
        )
        .unwrap();

        assert!(config.get_test_filter().is_none());
        assert!(config.get_used_classes().is_none());
        assert!(config.get_utility().unwrap().get_property_filter().is_none());
    }

    #[test]
    fn test_invalid_configurations() {
        let error = Configatron::from_json(r#"{ "selectors": "sideways" }"#).unwrap_err();
        assert_eq!(error.get_kind(), ErrorKind::ConfigParsingError);

        let error = Configatron::from_json(r#"{ "usedClasses": ["("] }"#).unwrap_err();
        assert_eq!(error.get_kind(), ErrorKind::InvalidUsedClassPattern);

        let error = Configatron::from_json(r#"{ "test": { "include": "/(/" } }"#).unwrap_err();
        assert_eq!(error.get_kind(), ErrorKind::InvalidFilterPattern);
    }

    #[test]
    fn test_builder_callbacks() {
        let config = Configatron::default()
            .on_modules(|_, _| async { Ok::<(), UtilityModulesError>(()) })
            .on_utility_modules(|_, _| async { Ok::<(), UtilityModulesError>(()) })
            .with_class_name_generator(|name, _, _| name.to_uppercase());

        assert!(config.get_on_modules().is_some());
        assert!(config.get_on_utility_modules().is_some());
        assert_eq!(
            config.generate_scopist().scoped_class_name("btn", "a.css", "", "_1"),
            "BTN_1"
        );
    }
}
