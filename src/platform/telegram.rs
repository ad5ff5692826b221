use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, FileId, InputFile};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::bot::AppState;
use crate::platform::{FileStore, InboundEvent, ReplyPayload};

/// Telegram rejects messages longer than 4096 characters.
const MAX_MESSAGE_LEN: usize = 4000;

/// Split long messages for Telegram's 4096 char limit
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

/// This bot's `@username`, used to ignore commands addressed to other bots.
#[derive(Clone)]
struct BotUsername(String);

/// Stages uploads under `<work_dir>/<uuid>/<file_name>`.
pub struct TelegramFileStore {
    bot: Bot,
    work_dir: PathBuf,
}

impl TelegramFileStore {
    pub fn new(bot: Bot, work_dir: PathBuf) -> Self {
        Self { bot, work_dir }
    }
}

#[async_trait]
impl FileStore for TelegramFileStore {
    async fn stage(&self, file_id: &str, file_name: &str) -> Result<PathBuf> {
        let job_dir = self.work_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&job_dir)
            .await
            .with_context(|| format!("Failed to create {}", job_dir.display()))?;

        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .context("Failed to get file info")?;

        let path = job_dir.join(file_name);
        let mut dst = tokio::fs::File::create(&path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;
        self.bot
            .download_file(&file.path, &mut dst)
            .await
            .context("Failed to download file")?;
        dst.flush().await.context("Failed to flush download")?;

        Ok(path)
    }
}

/// Run the Telegram bot platform
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let bot = Bot::new(&state.config.telegram.bot_token);
    let files = Arc::new(TelegramFileStore::new(
        bot.clone(),
        state.config.converter.work_dir.clone(),
    ));
    let allowed_user_ids = state.config.telegram.allowed_user_ids.clone();

    let me = bot.get_me().await.context("Failed to fetch bot identity")?;
    let username = BotUsername(me.user.username.clone().unwrap_or_default());

    info!("Starting Telegram platform as @{}...", username.0);

    let handler = Update::filter_message()
        .filter_map(move |msg: Message| {
            if allowed_user_ids.is_empty() {
                return Some(msg);
            }
            let user = msg.from.as_ref()?;
            if allowed_user_ids.contains(&user.id.0) {
                Some(msg)
            } else {
                None
            }
        })
        .endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state, files, username])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn classify(msg: &Message, username: &BotUsername) -> Option<InboundEvent> {
    if let Some(doc) = msg.document() {
        return Some(InboundEvent::FileUpload {
            file_name: doc.file_name.clone().unwrap_or_default(),
            file_id: doc.file.id.0.clone(),
        });
    }
    msg.text()
        .and_then(|text| InboundEvent::from_text(text, &username.0))
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    files: Arc<TelegramFileStore>,
    username: BotUsername,
) -> ResponseResult<()> {
    let Some(event) = classify(&msg, &username) else {
        return Ok(());
    };

    let (user_name, user_id) = msg
        .from
        .as_ref()
        .map(|u| (u.first_name.clone(), u.id.0))
        .unwrap_or_default();
    info!("Telegram {:?} from {} ({})", event, user_name, user_id);

    let action = match event {
        InboundEvent::FileUpload { .. } => ChatAction::UploadDocument,
        _ => ChatAction::Typing,
    };
    bot.send_chat_action(msg.chat.id, action).await.ok();

    if let Some(reply) = state.handle_event(event, files.as_ref()).await {
        send_reply(&bot, msg.chat.id, reply).await?;
    }

    Ok(())
}

async fn send_reply(bot: &Bot, chat_id: ChatId, reply: ReplyPayload) -> ResponseResult<()> {
    match reply {
        ReplyPayload::Text(text) => {
            for chunk in split_message(&text, MAX_MESSAGE_LEN) {
                bot.send_message(chat_id, chunk).await?;
            }
        }
        ReplyPayload::File { path, caption } => {
            info!("Sending {}", path.display());
            bot.send_document(chat_id, InputFile::file(path))
                .caption(caption)
                .await?;
        }
    }
    Ok(())
}
