use ignore::overrides::{Override, OverrideBuilder};
use regex::Regex;

use crate::{
    error::{ErrorAction, ErrorKind, UtilityModulesError},
    UtilityModulesResult,
};

/// A compiled include or exclude pattern.
#[derive(Clone, Debug)]
enum Pattern {
    /// Written between slashes, e.g. `/^--theme-/`.
    Regex(Regex),
    /// Anything else is a glob, matched the way `.gitignore` lines are.
    Glob(Override),
}

impl Pattern {
    fn compile(pattern: &str) -> UtilityModulesResult<Self> {
        if pattern.len() >= 2 && pattern.starts_with('/') && pattern.ends_with('/') {
            return Regex::new(&pattern[1..pattern.len() - 1])
                .map(Pattern::Regex)
                .map_err(|err| raise_invalid_pattern(pattern, &err.to_string()));
        }

        let mut builder = OverrideBuilder::new(".");

        builder
            .add(pattern)
            .map_err(|err| raise_invalid_pattern(pattern, &err.to_string()))?;

        builder
            .build()
            .map(Pattern::Glob)
            .map_err(|err| raise_invalid_pattern(pattern, &err.to_string()))
    }

    fn is_match(&self, candidate: &str) -> bool {
        match self {
            Pattern::Regex(regex) => regex.is_match(candidate),
            Pattern::Glob(matcher) => matcher.matched(candidate, false).is_whitelist(),
        }
    }
}

fn raise_invalid_pattern(pattern: &str, reason: &str) -> UtilityModulesError {
    UtilityModulesError::raise_critical_configuration_error(
        ErrorKind::InvalidFilterPattern,
        &format!("Invalid filter pattern `{}`: {}", pattern, reason),
        ErrorAction::Fix,
    )
}

/// Include/exclude filter used for file paths, custom properties and utility candidates.
///
/// A candidate passes when it matches no exclude pattern and, if any include
/// pattern was given, at least one of them.
#[derive(Clone, Debug)]
pub struct Gatekeeper {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl Gatekeeper {
    /// Compiles the given include and exclude patterns.
    ///
    /// # Arguments
    ///
    /// * `include` - Patterns a candidate must match (any of them). Empty accepts everything.
    /// * `exclude` - Patterns rejecting a candidate.
    ///
    /// # Returns
    ///
    /// The filter, or an `InvalidFilterPattern` error naming the faulty pattern.
    pub fn new(include: &[String], exclude: &[String]) -> UtilityModulesResult<Self> {
        tracing::debug!(?include, ?exclude, "Compiling filter patterns");

        Ok(Self {
            include: include
                .iter()
                .map(|pattern| Pattern::compile(pattern))
                .collect::<UtilityModulesResult<Vec<_>>>()?,
            exclude: exclude
                .iter()
                .map(|pattern| Pattern::compile(pattern))
                .collect::<UtilityModulesResult<Vec<_>>>()?,
        })
    }

    /// Whether the candidate passes the filter.
    pub fn allows(&self, candidate: &str) -> bool {
        if self.exclude.iter().any(|pattern| pattern.is_match(candidate)) {
            return false;
        }

        self.include.is_empty() || self.include.iter().any(|pattern| pattern.is_match(candidate))
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::ErrorKind, gatekeeper::Gatekeeper};

    fn strings(patterns: &[&str]) -> Vec<String> {
        patterns.iter().map(|pattern| pattern.to_string()).collect()
    }

    #[test]
    fn empty_filter_allows_everything() {
        let gatekeeper = Gatekeeper::new(&[], &[]).unwrap();

        assert!(gatekeeper.is_empty());
        assert!(gatekeeper.allows("src/app.css"));
    }

    #[test]
    fn glob_include() {
        let gatekeeper = Gatekeeper::new(&strings(&["*.module.css"]), &[]).unwrap();

        assert!(gatekeeper.allows("src/components/button.module.css"));
        assert!(!gatekeeper.allows("src/app.css"));
    }

    #[test]
    fn exclude_wins_over_include() {
        let gatekeeper =
            Gatekeeper::new(&strings(&["*.css"]), &strings(&["vendor/**"])).unwrap();

        assert!(gatekeeper.allows("src/app.css"));
        assert!(!gatekeeper.allows("vendor/reset.css"));
    }

    #[test]
    fn regex_patterns() {
        let gatekeeper = Gatekeeper::new(&[], &strings(&["/--width/"])).unwrap();

        assert!(!gatekeeper.allows("--width"));
        assert!(!gatekeeper.allows("--max-width"));
        assert!(gatekeeper.allows("--color"));
    }

    #[test]
    fn property_names_as_globs() {
        let gatekeeper = Gatekeeper::new(&strings(&["background-*", "color"]), &[]).unwrap();

        assert!(gatekeeper.allows("background-color"));
        assert!(gatekeeper.allows("color"));
        assert!(!gatekeeper.allows("padding"));
    }

    #[test]
    fn invalid_regex_is_reported() {
        let error = Gatekeeper::new(&strings(&["/[/"]), &[]).unwrap_err();

        assert_eq!(error.get_kind(), ErrorKind::InvalidFilterPattern);
    }
}
