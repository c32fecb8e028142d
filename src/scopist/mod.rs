use std::{fmt, sync::Arc};

use crate::utils::generate_hash::generate_hash;

/// Builds the base of a scoped class name from `(class_name, file_path, source_css)`.
pub type ClassNameGenerator = Arc<dyn Fn(&str, &str, &str) -> String + Send + Sync>;

/// How class names are scoped.
#[derive(Clone, Default)]
pub enum ClassNameScoping {
    Disabled,
    /// `name` + scope id.
    #[default]
    Enabled,
    /// The generator output + scope id.
    Custom(ClassNameGenerator),
}

impl fmt::Debug for ClassNameScoping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassNameScoping::Disabled => write!(f, "Disabled"),
            ClassNameScoping::Enabled => write!(f, "Enabled"),
            ClassNameScoping::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}

/// Computes the per-document scope ids and the names derived from them.
#[derive(Clone, Debug)]
pub struct Scopist {
    length: usize,
    class_names: ClassNameScoping,
    variables_key: Option<String>,
}

impl Scopist {
    /// Creates a new scope resolver.
    ///
    /// # Arguments
    ///
    /// * `length` - Number of hex characters of each scope id.
    /// * `class_names` - Class and animation scoping strategy.
    /// * `variables_key` - Key hashed into the custom property scope id, `None` to leave variables global.
    pub fn new(length: usize, class_names: ClassNameScoping, variables_key: Option<String>) -> Self {
        Self {
            length,
            class_names,
            variables_key,
        }
    }

    pub fn is_class_scoping_enabled(&self) -> bool {
        !matches!(self.class_names, ClassNameScoping::Disabled)
    }

    pub fn is_variable_scoping_enabled(&self) -> bool {
        self.variables_key.is_some()
    }

    /// Scope id of classes and animations: `_` followed by the hash of the document text.
    pub fn class_suffix(&self, source_css: &str) -> String {
        format!("_{}", generate_hash(self.length, &[source_css]))
    }

    /// Scope id of custom properties, derived from the configured key only.
    pub fn variable_suffix(&self) -> Option<String> {
        self.variables_key
            .as_ref()
            .map(|key| format!("_{}", generate_hash(self.length, &[key])))
    }

    /// Final name of a class.
    ///
    /// # Arguments
    ///
    /// * `class_name` - The original class name.
    /// * `file_path` - The path of the document being processed.
    /// * `source_css` - The document text the scope id was computed from.
    /// * `suffix` - The document scope id.
    ///
    /// # Returns
    ///
    /// The scoped name; the unchanged name when class scoping is disabled.
    pub fn scoped_class_name(
        &self,
        class_name: &str,
        file_path: &str,
        source_css: &str,
        suffix: &str,
    ) -> String {
        match &self.class_names {
            ClassNameScoping::Disabled => class_name.to_string(),
            ClassNameScoping::Enabled => format!("{}{}", class_name, suffix),
            ClassNameScoping::Custom(generator) => {
                format!("{}{}", generator(class_name, file_path, source_css), suffix)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        scopist::{ClassNameScoping, Scopist},
        utils::generate_hash::generate_hash,
    };

    #[test]
    fn class_suffix_is_a_content_hash() {
        let scopist = Scopist::new(8, ClassNameScoping::Enabled, None);
        let css = ".a {\n  color: red;\n}\n";

        assert_eq!(scopist.class_suffix(css), format!("_{}", generate_hash(8, &[css])));
        assert_eq!(scopist.class_suffix(css), scopist.class_suffix(css));
        assert_ne!(scopist.class_suffix(css), scopist.class_suffix(".b {}\n"));
    }

    #[test]
    fn variable_suffix_hashes_the_key() {
        let scoped = Scopist::new(6, ClassNameScoping::Enabled, Some("/".to_string()));
        let global = Scopist::new(6, ClassNameScoping::Enabled, None);

        assert_eq!(scoped.variable_suffix(), Some(format!("_{}", generate_hash(6, &["/"]))));
        assert!(scoped.is_variable_scoping_enabled());
        assert_eq!(global.variable_suffix(), None);
    }

    #[test]
    fn scoped_class_names() {
        let enabled = Scopist::new(8, ClassNameScoping::Enabled, None);
        let disabled = Scopist::new(8, ClassNameScoping::Disabled, None);
        let custom = Scopist::new(
            8,
            ClassNameScoping::Custom(Arc::new(|name: &str, path: &str, _css: &str| {
                format!("{}-{}", path.trim_end_matches(".css"), name)
            })),
            None,
        );

        assert_eq!(enabled.scoped_class_name("btn", "x.css", "", "_abc"), "btn_abc");
        assert_eq!(disabled.scoped_class_name("btn", "x.css", "", "_abc"), "btn");
        assert!(!disabled.is_class_scoping_enabled());
        assert_eq!(custom.scoped_class_name("btn", "x.css", "", "_abc"), "x-btn_abc");
    }
}
