pub mod chat;

/// Provider connection and sampling settings, resolved from CLI/env once at
/// startup and handed to the adapter constructor.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            base_url: None,
            temperature: 1.0,
            top_p: 1.0,
            max_tokens: 1024,
        }
    }
}
