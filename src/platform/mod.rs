pub mod telegram;

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

/// An event received from the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `/name args...`; `name` is lowercased without any `@botname` suffix
    Command { name: String, args: String },
    Text { body: String },
    /// A document upload; `file_id` is the platform handle for its bytes
    FileUpload { file_name: String, file_id: String },
}

impl InboundEvent {
    /// Classify a text message as a command or plain text.
    ///
    /// Returns `None` for `/cmd@OtherBot`, which in group chats is meant for
    /// another bot. An empty `bot_username` accepts any suffix.
    pub fn from_text(text: &str, bot_username: &str) -> Option<Self> {
        let Some(rest) = text.strip_prefix('/') else {
            return Some(Self::text(text));
        };

        let (head, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let (name, target) = match head.split_once('@') {
            Some((name, target)) => (name, Some(target)),
            None => (head, None),
        };
        if name.is_empty() {
            return Some(Self::text(text));
        }
        if let Some(target) = target {
            if !bot_username.is_empty() && !target.eq_ignore_ascii_case(bot_username) {
                return None;
            }
        }

        Some(InboundEvent::Command {
            name: name.to_lowercase(),
            args: tail.split_whitespace().collect::<Vec<_>>().join(" "),
        })
    }

    fn text(body: &str) -> Self {
        InboundEvent::Text {
            body: body.to_string(),
        }
    }
}

/// A reply to send back through the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPayload {
    Text(String),
    File { path: PathBuf, caption: String },
}

/// Downloads uploaded files to local disk for conversion.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stage the upload and return where it landed. Each call gets its own
    /// directory so same-named uploads never collide.
    async fn stage(&self, file_id: &str, file_name: &str) -> Result<PathBuf>;
}

/// Strip directory components from a user-supplied file name.
pub fn sanitize_file_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "upload".to_string())
}
