use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::ConverterConfig;
use crate::convert::text::write_text_pdf;
use crate::convert::{Converter, ConverterKind};

/// Production converters: LibreOffice for office formats, printpdf for text.
pub struct SystemConverter {
    soffice: PathBuf,
}

impl SystemConverter {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            soffice: config.soffice_path.clone(),
        }
    }

    /// Run a headless LibreOffice conversion and move its output to `target`.
    ///
    /// LibreOffice names the output after the input, so it writes into a
    /// private scratch directory that also holds its user profile; this keeps
    /// concurrent conversions from fighting over the profile lock.
    async fn office(
        &self,
        source: &Path,
        target: &Path,
        convert_to: &str,
        infilter: Option<&str>,
    ) -> Result<()> {
        let parent = target.parent().unwrap_or_else(|| Path::new("."));
        let scratch = tempfile::Builder::new()
            .prefix(".soffice-")
            .tempdir_in(parent)
            .with_context(|| format!("Failed to create scratch directory in {}", parent.display()))?;
        let scratch_dir = scratch
            .path()
            .canonicalize()
            .context("Failed to resolve scratch directory")?;
        let mut command = tokio::process::Command::new(&self.soffice);
        command.arg(profile_arg(&scratch_dir)?).arg("--headless");
        if let Some(filter) = infilter {
            command.arg(format!("--infilter={}", filter));
        }
        command
            .arg("--convert-to")
            .arg(convert_to)
            .arg("--outdir")
            .arg(&scratch_dir)
            .arg(source);

        info!("Running {} on {}", self.soffice.display(), source.display());

        let output = command
            .output()
            .await
            .with_context(|| format!("Failed to launch {}", self.soffice.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} exited with {}: {}",
                self.soffice.display(),
                output.status,
                stderr.trim()
            );
        }

        let stem = source
            .file_stem()
            .context("Source file has no name")?
            .to_string_lossy();
        let ext = target
            .extension()
            .context("Target file has no extension")?
            .to_string_lossy();
        let produced = scratch_dir.join(format!("{}.{}", stem, ext));

        if tokio::fs::try_exists(&produced).await.unwrap_or(false) {
            tokio::fs::rename(&produced, target)
                .await
                .with_context(|| format!("Failed to move output to {}", target.display()))?;
        } else {
            debug!(
                "LibreOffice produced no output: {}",
                String::from_utf8_lossy(&output.stdout).trim()
            );
        }

        Ok(())
    }
}

/// `-env:UserInstallation` pointing at `<dir>/profile`, as a file URL.
fn profile_arg(dir: &Path) -> Result<String> {
    let url = reqwest::Url::from_directory_path(dir.join("profile"))
        .map_err(|_| anyhow::anyhow!("Cannot express {} as a file URL", dir.display()))?;
    Ok(format!("-env:UserInstallation={}", url))
}

#[async_trait]
impl Converter for SystemConverter {
    async fn convert(&self, kind: ConverterKind, source: &Path, target: &Path) -> Result<()> {
        match kind {
            ConverterKind::PdfToWord => {
                self.office(
                    source,
                    target,
                    "docx:MS Word 2007 XML",
                    Some("writer_pdf_import"),
                )
                .await
            }
            ConverterKind::DocumentToPdf => {
                self.office(source, target, "pdf:writer_pdf_Export", None)
                    .await
            }
            ConverterKind::PresentationToPdf => {
                self.office(source, target, "pdf:impress_pdf_Export", None)
                    .await
            }
            ConverterKind::TextToPdf => {
                let source = source.to_path_buf();
                let target = target.to_path_buf();
                tokio::task::spawn_blocking(move || write_text_pdf(&source, &target))
                    .await
                    .context("PDF writer task failed")?
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::Router;
    use crate::platform::ReplyPayload;
    use std::sync::Arc;

    fn converter(soffice: &str) -> SystemConverter {
        SystemConverter::new(&ConverterConfig {
            soffice_path: PathBuf::from(soffice),
            work_dir: PathBuf::from("unused"),
        })
    }

    #[tokio::test]
    async fn test_text_route_writes_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("sample.txt");
        std::fs::write(&source, "hello\nworld\n").unwrap();
        let router = Router::new(Arc::new(converter("soffice")));

        let reply = router.convert("sample.txt", &source).await;

        let expected = dir.path().join("sample_converted.pdf");
        assert_eq!(
            reply,
            ReplyPayload::File {
                path: expected.clone(),
                caption: "Converted Text to PDF.".to_string(),
            }
        );
        assert!(std::fs::read(&expected).unwrap().starts_with(b"%PDF"));
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_text_outside_font_is_conversion_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        std::fs::write(&source, "Привет").unwrap();
        let router = Router::new(Arc::new(converter("soffice")));

        let reply = router.convert("notes.txt", &source).await;

        match reply {
            ReplyPayload::Text(text) => {
                assert!(text.starts_with("Conversion failed: "), "{}", text);
                assert!(text.contains("cannot display"), "{}", text);
            }
            other => panic!("expected text reply, got {:?}", other),
        }
        assert!(!dir.path().join("notes_converted.pdf").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_profile_path_is_percent_encoded() {
        let arg = profile_arg(Path::new("/srv/bot uploads/café")).unwrap();
        assert_eq!(
            arg,
            "-env:UserInstallation=file:///srv/bot%20uploads/caf%C3%A9/profile/"
        );
    }

    #[test]
    fn test_relative_profile_path_is_rejected() {
        assert!(profile_arg(Path::new("relative/dir")).is_err());
    }

    #[tokio::test]
    async fn test_missing_office_binary_is_conversion_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("report.docx");
        std::fs::write(&source, b"not really a docx").unwrap();
        let router = Router::new(Arc::new(converter("/nonexistent/soffice")));

        let reply = router.convert("report.docx", &source).await;

        match reply {
            ReplyPayload::Text(text) => {
                assert!(text.starts_with("Conversion failed: "), "{}", text);
                assert!(text.contains("/nonexistent/soffice"), "{}", text);
            }
            other => panic!("expected text reply, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_office_without_output_is_soft_failure() {
        // `true` exits 0 and writes nothing.
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("deck.pptx");
        std::fs::write(&source, b"pptx").unwrap();
        let router = Router::new(Arc::new(converter("true")));

        let reply = router.convert("deck.pptx", &source).await;

        assert_eq!(reply, ReplyPayload::Text("Converted PPT to PDF.".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_office_nonzero_exit_is_conversion_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("scan.pdf");
        std::fs::write(&source, b"%PDF-broken").unwrap();
        let router = Router::new(Arc::new(converter("false")));

        let reply = router.convert("scan.pdf", &source).await;

        match reply {
            ReplyPayload::Text(text) => assert!(text.starts_with("Conversion failed: "), "{}", text),
            other => panic!("expected text reply, got {:?}", other),
        }
    }
}
