/// Failures a handler can hand back to the dispatcher.
///
/// The `Display` form of every variant is the text shown to the user, so the
/// dispatcher can turn any error into a reply with `to_string()`.
#[derive(thiserror::Error, Debug)]
pub enum BotError {
    #[error("⚠️ {provider} Error: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },
    #[error("Conversion failed: {0}")]
    Conversion(String),
    #[error("{0}")]
    Usage(&'static str),
}

impl BotError {
    pub fn provider(provider: &'static str, err: anyhow::Error) -> Self {
        Self::Provider {
            provider,
            message: format!("{:#}", err),
        }
    }

    pub fn conversion(err: anyhow::Error) -> Self {
        Self::Conversion(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_carries_warning_marker() {
        let err = BotError::provider("Gemini", anyhow::anyhow!("quota exceeded"));
        assert_eq!(err.to_string(), "⚠️ Gemini Error: quota exceeded");
    }

    #[test]
    fn test_conversion_error_includes_context_chain() {
        let err = BotError::conversion(
            anyhow::anyhow!("file is truncated").context("Failed to read PDF"),
        );
        assert_eq!(
            err.to_string(),
            "Conversion failed: Failed to read PDF: file is truncated"
        );
    }

    #[test]
    fn test_usage_error_is_plain_hint() {
        let err = BotError::Usage("Usage: /search your-query");
        assert_eq!(err.to_string(), "Usage: /search your-query");
    }
}
