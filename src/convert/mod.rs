pub mod system;
mod text;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::BotError;
use crate::platform::ReplyPayload;

pub const UNSUPPORTED: &str = "Unsupported file type for conversion.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterKind {
    PdfToWord,
    DocumentToPdf,
    PresentationToPdf,
    TextToPdf,
}

/// One row of the conversion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub source_ext: &'static str,
    pub target_ext: &'static str,
    pub converter: ConverterKind,
    pub caption: &'static str,
}

pub const ROUTES: &[Route] = &[
    Route {
        source_ext: "pdf",
        target_ext: "docx",
        converter: ConverterKind::PdfToWord,
        caption: "Converted PDF to Word.",
    },
    Route {
        source_ext: "docx",
        target_ext: "pdf",
        converter: ConverterKind::DocumentToPdf,
        caption: "Converted Word to PDF.",
    },
    Route {
        source_ext: "pptx",
        target_ext: "pdf",
        converter: ConverterKind::PresentationToPdf,
        caption: "Converted PPT to PDF.",
    },
    Route {
        source_ext: "txt",
        target_ext: "pdf",
        converter: ConverterKind::TextToPdf,
        caption: "Converted Text to PDF.",
    },
];

/// Look up the route for a file name by its (case-insensitive) extension.
pub fn route_for(file_name: &str) -> Option<&'static Route> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();
    ROUTES.iter().find(|r| r.source_ext == ext)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub route: &'static Route,
    pub source: PathBuf,
    pub target: PathBuf,
}

impl ConversionJob {
    /// The output sits next to the source as `<base>_converted.<target ext>`.
    pub fn new(route: &'static Route, file_name: &str, source: &Path) -> Self {
        let base = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = source.parent().unwrap_or_else(|| Path::new("."));
        let target = dir.join(format!("{}_converted.{}", base, route.target_ext));

        debug_assert_ne!(target, source);

        Self {
            route,
            source: source.to_path_buf(),
            target,
        }
    }
}

/// Something that can turn `source` into `target` for a given route.
///
/// Returning `Ok` without writing `target` is allowed; the router treats it
/// as a soft failure.
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(&self, kind: ConverterKind, source: &Path, target: &Path) -> Result<()>;
}

pub struct Router {
    converter: Arc<dyn Converter>,
}

impl Router {
    pub fn new(converter: Arc<dyn Converter>) -> Self {
        Self { converter }
    }

    /// Convert a staged upload. Never fails: errors become a text reply.
    pub async fn convert(&self, file_name: &str, source: &Path) -> ReplyPayload {
        match self.try_convert(file_name, source).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Conversion of {} failed: {}", file_name, e);
                ReplyPayload::Text(e.to_string())
            }
        }
    }

    pub async fn try_convert(
        &self,
        file_name: &str,
        source: &Path,
    ) -> Result<ReplyPayload, BotError> {
        let Some(route) = route_for(file_name) else {
            info!("No conversion route for {}", file_name);
            return Ok(ReplyPayload::Text(UNSUPPORTED.to_string()));
        };

        let job = ConversionJob::new(route, file_name, source);
        info!(
            "Converting {} -> {} ({:?})",
            job.source.display(),
            job.target.display(),
            job.route.converter
        );

        self.converter
            .convert(job.route.converter, &job.source, &job.target)
            .await
            .map_err(BotError::conversion)?;

        if tokio::fs::try_exists(&job.target).await.unwrap_or(false) {
            Ok(ReplyPayload::File {
                path: job.target,
                caption: job.route.caption.to_string(),
            })
        } else {
            warn!(
                "Converter reported success but {} was not produced",
                job.target.display()
            );
            Ok(ReplyPayload::Text(job.route.caption.to_string()))
        }
    }
}
