use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Host address and port for the relay server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    // --- Chat LLM Provider Args ---
    /// API key for the chat-completion provider.
    #[arg(long, env = "CHAT_API_KEY")]
    pub chat_api_key: Option<String>,

    /// Model name for chat completion (e.g., llama-3.1-70b-versatile).
    #[arg(long, env = "CHAT_MODEL")]
    pub chat_model: Option<String>,

    /// Base URL for the provider API. Defaults to the Groq endpoint.
    #[arg(long, env = "CHAT_BASE_URL")]
    pub chat_base_url: Option<String>,

    /// Sampling temperature for the provider call.
    #[arg(long, env = "CHAT_TEMPERATURE", default_value = "1.0")]
    pub chat_temperature: f32,

    /// Nucleus sampling parameter for the provider call.
    #[arg(long, env = "CHAT_TOP_P", default_value = "1.0")]
    pub chat_top_p: f32,

    /// Maximum generated-token budget per reply.
    #[arg(long, env = "CHAT_MAX_TOKENS", default_value = "1024")]
    pub chat_max_tokens: u32,

    // --- System Preamble Args ---
    /// Optional path to a plain-text file overriding the built-in system
    /// preamble. Reloadable at runtime via GET /api/reload-preamble.
    #[arg(long, env = "PREAMBLE_PATH")]
    pub preamble_path: Option<String>,
}

impl Args {
    pub fn llm_config(&self) -> crate::llm::LlmConfig {
        crate::llm::LlmConfig {
            api_key: self.chat_api_key.clone(),
            model: self.chat_model.clone(),
            base_url: self.chat_base_url.clone(),
            temperature: self.chat_temperature,
            top_p: self.chat_top_p,
            max_tokens: self.chat_max_tokens,
        }
    }
}
