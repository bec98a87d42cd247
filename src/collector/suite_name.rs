use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static NUMERIC_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_-]*\d+$").expect("valid numeric suffix regex"));

static LEADING_TEST_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^test\s*(\d+)").expect("valid test token regex"));

/// Maps the engine's raw parent/group label to the suite name that is reported
pub trait SuiteNameTransform: Send + Sync {
    fn normalize(&self, raw: &str) -> String;
}

impl<F> SuiteNameTransform for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn normalize(&self, raw: &str) -> String {
        (self)(raw)
    }
}

/// Built-in, config-selectable suite-name policies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SuiteNamePolicy {
    /// Trimmed label, unchanged
    #[default]
    Verbatim,
    /// `"Checkout suite2"` -> `"Checkout suite"`
    StripNumericSuffix,
    /// `"test 3 - login"` -> `"Test 3"`; labels without the token pass through
    LeadingTestToken,
    /// Regex replace-all over the trimmed label
    Pattern { regex: String, replacement: String },
}

impl SuiteNamePolicy {
    /// Build the transform the collector applies to every suite label.
    ///
    /// Pattern regexes are compiled here, once; an invalid one degrades to
    /// `Verbatim` with a single warning.
    pub fn compile(&self) -> Box<dyn SuiteNameTransform> {
        let compiled = match self {
            SuiteNamePolicy::Verbatim => CompiledPolicy::Verbatim,
            SuiteNamePolicy::StripNumericSuffix => CompiledPolicy::StripNumericSuffix,
            SuiteNamePolicy::LeadingTestToken => CompiledPolicy::LeadingTestToken,
            SuiteNamePolicy::Pattern { regex, replacement } => match Regex::new(regex) {
                Ok(regex) => CompiledPolicy::Pattern {
                    regex,
                    replacement: replacement.clone(),
                },
                Err(e) => {
                    log::warn!(
                        "Invalid suite name pattern '{}', using labels verbatim: {}",
                        regex,
                        e
                    );
                    CompiledPolicy::Verbatim
                }
            },
        };
        Box::new(compiled)
    }
}

enum CompiledPolicy {
    Verbatim,
    StripNumericSuffix,
    LeadingTestToken,
    Pattern { regex: Regex, replacement: String },
}

impl SuiteNameTransform for CompiledPolicy {
    fn normalize(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        match self {
            CompiledPolicy::Verbatim => trimmed.to_string(),
            CompiledPolicy::StripNumericSuffix => {
                NUMERIC_SUFFIX.replace(trimmed, "").trim().to_string()
            }
            CompiledPolicy::LeadingTestToken => match LEADING_TEST_TOKEN.captures(trimmed) {
                Some(caps) => format!("Test {}", &caps[1]),
                None => trimmed.to_string(),
            },
            CompiledPolicy::Pattern { regex, replacement } => regex
                .replace_all(trimmed, replacement.as_str())
                .trim()
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbatim_trims() {
        assert_eq!(SuiteNamePolicy::Verbatim.compile().normalize("  Login  "), "Login");
    }

    #[test]
    fn test_strip_numeric_suffix() {
        let policy = SuiteNamePolicy::StripNumericSuffix.compile();
        assert_eq!(policy.normalize("Checkout suite2"), "Checkout suite");
        assert_eq!(policy.normalize("Cart - 12"), "Cart");
        assert_eq!(policy.normalize("Search_3"), "Search");
        assert_eq!(policy.normalize("No digits"), "No digits");
    }

    #[test]
    fn test_leading_test_token() {
        let policy = SuiteNamePolicy::LeadingTestToken.compile();
        assert_eq!(policy.normalize("Test 3 - login flow"), "Test 3");
        assert_eq!(policy.normalize("test12 search"), "Test 12");
        assert_eq!(policy.normalize("Smoke suite"), "Smoke suite");
    }

    #[test]
    fn test_pattern_policy() {
        let policy = SuiteNamePolicy::Pattern {
            regex: r"^\[(\w+)\].*$".to_string(),
            replacement: "$1".to_string(),
        };
        assert_eq!(policy.compile().normalize("[checkout] guest user"), "checkout");
    }

    #[test]
    fn test_invalid_pattern_falls_back_to_verbatim() {
        let policy = SuiteNamePolicy::Pattern {
            regex: "(".to_string(),
            replacement: String::new(),
        };
        assert_eq!(policy.compile().normalize(" Suite A "), "Suite A");
    }

    #[test]
    fn test_compiled_pattern_reused_across_labels() {
        let transform = SuiteNamePolicy::Pattern {
            regex: r"\s*#\d+$".to_string(),
            replacement: String::new(),
        }
        .compile();
        let labels = ["Cart #1", " Cart #22 ", "Search #3", "Plain"];
        let names: Vec<String> = labels.iter().map(|l| transform.normalize(l)).collect();
        assert_eq!(names, vec!["Cart", "Cart", "Search", "Plain"]);
    }

    #[test]
    fn test_closure_transform() {
        let upper = |raw: &str| raw.to_uppercase();
        assert_eq!(upper.normalize("cart"), "CART");
    }
}
