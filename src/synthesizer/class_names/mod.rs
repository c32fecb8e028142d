use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::{info, trace};

use crate::stylesheet::Stylesheet;

use super::{is_inside_keyframes, Synthesizer, Transformation};

lazy_static! {
    static ref CLASS_NAME_RE: Regex =
        Regex::new(r":global\(\s*([^)]+?)\s*\)|:global\s+\.([\w\-$]+)|\.([\w\-$]+)").unwrap();
}

/// Whether the byte at `index` sits inside an attribute selector.
fn is_inside_brackets(selector: &str, index: usize) -> bool {
    let prefix = &selector[..index];

    prefix.matches('[').count() > prefix.matches(']').count()
}

impl Synthesizer {
    /// Gives every class of the document its scoped name.
    ///
    /// Module entries created during utility extraction get their leading class
    /// token replaced, then each selector outside keyframes is rewritten.
    /// `:global(x)` and `:global .x` are unwrapped and left unscoped.
    pub(super) fn rewrite_class_names(
        &self,
        stylesheet: &mut Stylesheet,
        transformation: &mut Transformation,
    ) {
        info!(num_modules = transformation.modules.len(), "Scoping class names");

        let file_path = transformation.file_path.as_str();
        let source_css = transformation.source_css.as_str();
        let suffix = transformation.suffix.as_str();
        let modules = &mut transformation.modules;

        for (class_name, entry) in modules.iter_mut() {
            let scoped = self
                .scopist
                .scoped_class_name(class_name, file_path, source_css, suffix);

            let utilities = entry
                .split_once(' ')
                .map(|(_, utilities)| utilities.to_string());

            *entry = match utilities {
                Some(utilities) => format!("{} {}", scoped, utilities),
                None => scoped,
            };
        }

        for rule in stylesheet.rules() {
            if !stylesheet.is_attached(rule) || is_inside_keyframes(stylesheet, rule) {
                continue;
            }

            let Some(selector) = stylesheet.selector(rule).map(str::to_string) else {
                continue;
            };

            let rewritten = CLASS_NAME_RE
                .replace_all(&selector, |caps: &Captures| {
                    let Some(matched) = caps.get(0) else {
                        return String::new();
                    };

                    if selector[..matched.start()].ends_with('\\')
                        || is_inside_brackets(&selector, matched.start())
                    {
                        return matched.as_str().to_string();
                    }

                    if let Some(global_content) = caps.get(1) {
                        return global_content.as_str().to_string();
                    }

                    if let Some(global_class) = caps.get(2) {
                        return format!(".{}", global_class.as_str());
                    }

                    let Some(class_name) = caps.get(3).map(|class_name| class_name.as_str()) else {
                        return matched.as_str().to_string();
                    };

                    let entry = modules.entry(class_name.to_string()).or_insert_with(|| {
                        self.scopist
                            .scoped_class_name(class_name, file_path, source_css, suffix)
                    });
                    let scoped = entry.split(' ').next().unwrap_or(class_name);

                    format!(".{}", scoped)
                })
                .to_string();

            if rewritten != selector {
                trace!(selector = %selector, rewritten = %rewritten, "Scoped selector");

                stylesheet.set_selector(rule, rewritten);
            }
        }
    }
}
