//! Backend model profiles.
//!
//! Every agent-kind node carries a [`ModelConfig`] describing the language
//! model its backend should use. The profile defaults per provider live in
//! [`ModelConfig::profile`].

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Available backend model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelType {
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "llama2")]
    Llama2,
}

impl ModelType {
    /// All model types, in display order.
    pub const ALL: [Self; 4] = [Self::OpenAi, Self::Gemini, Self::Anthropic, Self::Llama2];

    /// Returns the wire tag for this model type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Anthropic => "anthropic",
            Self::Llama2 => "llama2",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigurationError::UnknownModelType { tag: s.to_string() })
    }
}

/// Provider-specific model options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ProviderOptions {
    #[serde(rename = "openai")]
    OpenAi {
        #[serde(default)]
        api_key: String,
        frequency_penalty: f32,
        presence_penalty: f32,
    },
    #[serde(rename = "gemini")]
    Gemini {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_output_tokens: Option<u32>,
    },
    #[serde(rename = "anthropic")]
    Anthropic {
        #[serde(default)]
        api_key: String,
    },
    #[serde(rename = "llama2")]
    Llama2 { repetition_penalty: f32 },
}

impl ProviderOptions {
    /// Returns the model type these options belong to.
    #[must_use]
    pub fn model_type(&self) -> ModelType {
        match self {
            Self::OpenAi { .. } => ModelType::OpenAi,
            Self::Gemini { .. } => ModelType::Gemini,
            Self::Anthropic { .. } => ModelType::Anthropic,
            Self::Llama2 { .. } => ModelType::Llama2,
        }
    }
}

/// Backend model parameters shared by all agent-kind configs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    /// Model identifier understood by the provider.
    pub model: String,
    /// Sampling temperature, 0.0 - 1.0.
    pub temperature: f32,
    /// Token budget for the call.
    pub max_tokens: u32,
    /// Nucleus sampling cutoff, 0.0 - 1.0.
    pub top_p: f32,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(flatten)]
    pub provider: ProviderOptions,
}

impl ModelConfig {
    /// Returns the default profile for a model type.
    #[must_use]
    pub fn profile(model_type: ModelType) -> Self {
        match model_type {
            ModelType::OpenAi => Self {
                model: "gpt-4".to_string(),
                temperature: 0.7,
                max_tokens: 4096,
                top_p: 1.0,
                system_prompt: String::new(),
                provider: ProviderOptions::OpenAi {
                    api_key: String::new(),
                    frequency_penalty: 0.0,
                    presence_penalty: 0.0,
                },
            },
            ModelType::Gemini => Self {
                model: "gemini-pro".to_string(),
                temperature: 0.7,
                max_tokens: 32768,
                top_p: 0.95,
                system_prompt: String::new(),
                provider: ProviderOptions::Gemini {
                    api_key: None,
                    max_output_tokens: Some(2048),
                },
            },
            ModelType::Anthropic => Self {
                model: "claude-3-opus".to_string(),
                temperature: 0.7,
                max_tokens: 100_000,
                top_p: 1.0,
                system_prompt: String::new(),
                provider: ProviderOptions::Anthropic {
                    api_key: String::new(),
                },
            },
            ModelType::Llama2 => Self {
                model: "llama-2-70b-chat".to_string(),
                temperature: 0.7,
                max_tokens: 4096,
                top_p: 1.0,
                system_prompt: String::new(),
                provider: ProviderOptions::Llama2 {
                    repetition_penalty: 1.1,
                },
            },
        }
    }

    /// Returns the provider this profile targets.
    #[must_use]
    pub fn model_type(&self) -> ModelType {
        self.provider.model_type()
    }

    /// Checks numeric parameters against their allowed ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Invalid` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.model.trim().is_empty() {
            return Err(ConfigurationError::Invalid {
                field: "model",
                reason: "must not be empty".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ConfigurationError::Invalid {
                field: "temperature",
                reason: format!("{} is outside 0.0..=1.0", self.temperature),
            });
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ConfigurationError::Invalid {
                field: "topP",
                reason: format!("{} is outside 0.0..=1.0", self.top_p),
            });
        }
        if self.max_tokens == 0 {
            return Err(ConfigurationError::Invalid {
                field: "maxTokens",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_type_parses_case_insensitively() {
        assert_eq!("OpenAI".parse::<ModelType>(), Ok(ModelType::OpenAi));
        assert_eq!("llama2".parse::<ModelType>(), Ok(ModelType::Llama2));
        assert!(matches!(
            "gpt-5".parse::<ModelType>(),
            Err(ConfigurationError::UnknownModelType { .. })
        ));
    }

    #[test]
    fn every_profile_validates_and_matches_its_type() {
        for model_type in ModelType::ALL {
            let profile = ModelConfig::profile(model_type);
            assert_eq!(profile.model_type(), model_type);
            profile.validate().expect("default profile is valid");
        }
    }

    #[test]
    fn gemini_profile_defaults() {
        let profile = ModelConfig::profile(ModelType::Gemini);
        assert_eq!(profile.model, "gemini-pro");
        assert_eq!(profile.max_tokens, 32768);
        assert_eq!(
            profile.provider,
            ProviderOptions::Gemini {
                api_key: None,
                max_output_tokens: Some(2048)
            }
        );
    }

    #[test]
    fn validate_rejects_hot_temperature() {
        let mut profile = ModelConfig::profile(ModelType::OpenAi);
        profile.temperature = 1.5;
        let err = profile.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::Invalid {
                field: "temperature",
                ..
            }
        ));
    }

    #[test]
    fn provider_tag_is_flattened_into_profile() {
        let profile = ModelConfig::profile(ModelType::Llama2);
        let json = serde_json::to_value(&profile).expect("serialize");
        assert_eq!(json["type"], "llama2");
        assert_eq!(json["model"], "llama-2-70b-chat");

        let parsed: ModelConfig = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, profile);
    }
}
