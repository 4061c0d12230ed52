// Copyright 2025 Cowboy AI, LLC.

//! Composer configuration

use serde::{Deserialize, Serialize};

use crate::descriptor::MethodSignature;
use crate::errors::CompositionResult;
use crate::shape::Shape;

/// Settings that shape every composition a [`crate::Composer`] performs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Signatures declared directly on the universal base type; role methods
    /// matching one of them are never composed
    pub universal_methods: Vec<MethodSignature>,
    /// Behaviours without precedence declarations run before those with some
    pub bias_unordered_first: bool,
    /// Message-style behaviours run after plain ones
    pub bias_message_last: bool,
    /// Fail composition when an implementation matches no collated method
    pub strict_shapes: bool,
    /// Number of descriptors kept by [`crate::CompositeCache`]
    pub cache_capacity: usize,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            universal_methods: vec![
                MethodSignature::new("equals", Shape::Bool).param("other", Shape::object("Object")),
                MethodSignature::new("hash_code", Shape::Int),
                MethodSignature::new("to_string", Shape::Text),
            ],
            bias_unordered_first: true,
            bias_message_last: true,
            strict_shapes: false,
            cache_capacity: 64,
        }
    }
}

impl ComposerConfig {
    /// Load from JSON; absent fields keep their defaults
    pub fn from_json(json: &str) -> CompositionResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether a signature is declared on the universal base type
    pub fn is_universal(&self, signature: &MethodSignature) -> bool {
        self.universal_methods
            .iter()
            .any(|u| u.same_call_shape(signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ComposerConfig::from_json(r#"{"strict_shapes": true}"#).unwrap();
        assert!(config.strict_shapes);
        assert!(config.bias_message_last);
        assert_eq!(config.cache_capacity, 64);
        assert_eq!(config.universal_methods.len(), 3);
    }

    #[test]
    fn test_universal_methods_match_by_call_shape() {
        let config = ComposerConfig::default();
        assert!(config.is_universal(&MethodSignature::new("to_string", Shape::Text)));
        assert!(!config.is_universal(
            &MethodSignature::new("to_string", Shape::Text).param("fmt", Shape::Text)
        ));
    }

    #[test]
    fn test_invalid_json_is_configuration_error() {
        let err = ComposerConfig::from_json("{").unwrap_err();
        assert!(matches!(err, crate::CompositionError::Configuration(_)));
    }
}
