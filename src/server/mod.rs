pub mod api;

use crate::config::SystemPreamble;
use crate::llm::chat::{BoxError, ChatClient};
use std::sync::Arc;

pub struct Server {
    addr: String,
    client: Arc<dyn ChatClient>,
    preamble: SystemPreamble,
}

impl Server {
    pub fn new(addr: String, client: Arc<dyn ChatClient>, preamble: SystemPreamble) -> Self {
        Self { addr, client, preamble }
    }

    pub async fn run(self) -> Result<(), BoxError> {
        let state = api::AppState::new(self.client, self.preamble);
        api::start_http_server(&self.addr, state).await
    }
}
