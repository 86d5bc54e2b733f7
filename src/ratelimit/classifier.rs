//! Request cost classification.

use std::collections::HashMap;

use super::event::RequestClass;

/// Request parameters as supplied by the dispatcher.
pub type Params = HashMap<String, String>;

/// Decides which cost class a request belongs to.
///
/// Any `Fn(&Params) -> RequestClass` closure is a classifier.
pub trait RequestClassifier: Send + Sync {
    /// Classify a request by its parameters.
    fn classify(&self, params: &Params) -> RequestClass;
}

impl<F> RequestClassifier for F
where
    F: Fn(&Params) -> RequestClass + Send + Sync,
{
    fn classify(&self, params: &Params) -> RequestClass {
        self(params)
    }
}

/// Classifies every request as [`RequestClass::Standard`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardClassifier;

impl RequestClassifier for StandardClassifier {
    fn classify(&self, _params: &Params) -> RequestClass {
        RequestClass::Standard
    }
}

/// Parameter key consulted by [`ModeParamClassifier::default`].
pub const DEFAULT_MODE_KEY: &str = "mode";
/// Parameter value marking a discounted request by default.
pub const DEFAULT_DISCOUNTED_MODE: &str = "textLevelOnly";

/// Classifies a request as discounted when one parameter has a given value.
#[derive(Debug, Clone)]
pub struct ModeParamClassifier {
    key: String,
    discounted_value: String,
}

impl ModeParamClassifier {
    pub fn new(key: impl Into<String>, discounted_value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            discounted_value: discounted_value.into(),
        }
    }
}

impl Default for ModeParamClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MODE_KEY, DEFAULT_DISCOUNTED_MODE)
    }
}

impl RequestClassifier for ModeParamClassifier {
    fn classify(&self, params: &Params) -> RequestClass {
        match params.get(&self.key) {
            Some(value) if value == &self.discounted_value => RequestClass::Discounted,
            _ => RequestClass::Standard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(entries: &[(&str, &str)]) -> Params {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_standard_classifier() {
        let classifier = StandardClassifier;
        assert_eq!(
            classifier.classify(&params(&[("mode", "textLevelOnly")])),
            RequestClass::Standard
        );
    }

    #[test]
    fn test_mode_param_classifier_default() {
        let classifier = ModeParamClassifier::default();

        assert_eq!(
            classifier.classify(&params(&[("mode", "textLevelOnly")])),
            RequestClass::Discounted
        );
        assert_eq!(
            classifier.classify(&params(&[("mode", "all")])),
            RequestClass::Standard
        );
        assert_eq!(classifier.classify(&params(&[])), RequestClass::Standard);
    }

    #[test]
    fn test_mode_param_classifier_custom_key() {
        let classifier = ModeParamClassifier::new("tier", "cheap");
        assert_eq!(
            classifier.classify(&params(&[("tier", "cheap")])),
            RequestClass::Discounted
        );
        assert_eq!(
            classifier.classify(&params(&[("mode", "cheap")])),
            RequestClass::Standard
        );
    }

    #[test]
    fn test_closure_classifier() {
        let classifier = |p: &Params| {
            if p.contains_key("cheap") {
                RequestClass::Discounted
            } else {
                RequestClass::Standard
            }
        };
        assert_eq!(
            classifier.classify(&params(&[("cheap", "1")])),
            RequestClass::Discounted
        );
    }
}
