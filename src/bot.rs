use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::convert::system::SystemConverter;
use crate::convert::{Converter, Router};
use crate::error::BotError;
use crate::llm::GeminiClient;
use crate::platform::{sanitize_file_name, FileStore, InboundEvent, ReplyPayload};
use crate::search::SearchClient;

pub const WELCOME_TEXT: &str = "👋 Welcome to LearnauraBot!\n\
     💬 Ask questions\n\
     📄 Send files to auto-convert (PDF, DOCX, TXT, PPTX)\n\
     🔍 Use /search <query> to find info online";

/// Shared application state, read-only after startup
pub struct AppState {
    pub config: Config,
    llm: GeminiClient,
    search: SearchClient,
    router: Router,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let converter = Arc::new(SystemConverter::new(&config.converter));
        Self::with_converter(config, converter)
    }

    pub fn with_converter(config: Config, converter: Arc<dyn Converter>) -> Self {
        Self {
            llm: GeminiClient::new(config.gemini.clone()),
            search: SearchClient::new(config.search.clone()),
            router: Router::new(converter),
            config,
        }
    }

    /// Route one inbound event to exactly one handler.
    ///
    /// Returns `None` for events the bot ignores (unknown commands).
    pub async fn handle_event(
        &self,
        event: InboundEvent,
        files: &dyn FileStore,
    ) -> Option<ReplyPayload> {
        match event {
            InboundEvent::Command { name, args } => match name.as_str() {
                "start" => Some(ReplyPayload::Text(WELCOME_TEXT.to_string())),
                "search" => Some(ReplyPayload::Text(self.search.search_reply(&args).await)),
                _ => {
                    debug!("Ignoring unknown command /{}", name);
                    None
                }
            },
            InboundEvent::Text { body } => {
                Some(ReplyPayload::Text(self.llm.generate_reply(&body).await))
            }
            InboundEvent::FileUpload { file_name, file_id } => {
                Some(self.handle_upload(&file_name, &file_id, files).await)
            }
        }
    }

    async fn handle_upload(
        &self,
        file_name: &str,
        file_id: &str,
        files: &dyn FileStore,
    ) -> ReplyPayload {
        let file_name = sanitize_file_name(file_name);

        let source = match files.stage(file_id, &file_name).await {
            Ok(path) => path,
            Err(e) => {
                warn!("Failed to stage {}: {:#}", file_name, e);
                return ReplyPayload::Text(BotError::conversion(e).to_string());
            }
        };

        info!("Staged {} at {}", file_name, source.display());
        self.router.convert(&file_name, &source).await
    }
}
