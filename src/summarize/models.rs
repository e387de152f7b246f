/// Backend model used for unknown keys and as the last-resort fallback
pub const DEFAULT_MODEL: &str = "google/gemma-3-27b-it:free";

/// User-facing model keys and the backend models they select
pub const MODEL_TABLE: &[(&str, &str)] = &[
    ("deepseek", "tngtech/deepseek-r1t2-chimera:free"),
    ("gpt", "openai/gpt-oss-120b:free"),
    ("mistral", "mistralai/devstral-2512:free"),
    ("gemini", "google/gemini-2.0-flash-exp:free"),
    ("gemma", DEFAULT_MODEL),
];

/// A requested model key resolved to concrete backend identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    /// Model tried first
    pub target: &'static str,

    /// Model switched to on "model not found" and on the final attempt
    pub fallback: &'static str,
}

impl ModelSelection {
    /// Resolve a key through the fixed table; unknown keys select the default model
    pub fn resolve(key: &str) -> Self {
        let key = key.trim().to_ascii_lowercase();
        let target = MODEL_TABLE
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, model)| *model)
            .unwrap_or(DEFAULT_MODEL);

        Self {
            target,
            fallback: DEFAULT_MODEL,
        }
    }
}
