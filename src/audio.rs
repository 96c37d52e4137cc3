use crate::{
    config::{Config, Format},
    download,
    error::{ApplicationError, Result},
    fileops::audio_file_name,
    site::{is_freesound, ExtractedAsset, LinkExtractor},
    utils::{HttpClient, PageSource},
};
use std::fmt;
use url::Url;

/// where in the pipeline a unit of work failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Fetch,
    Extract,
    Download,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fetch => "fetch page",
            Self::Extract => "extract audio link",
            Self::Download => "download",
        };
        f.write_str(s)
    }
}

/// Counts of finished and failed downloads over a whole run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Summary {
    pub(crate) downloaded: usize,
    pub(crate) failed: usize,
}

impl Summary {
    /// a run succeeds when at least one requested file was saved
    pub(crate) fn is_success(&self) -> bool {
        self.downloaded > 0
    }
}

/// Runs every URL through fetch, extract and download, one after another.
pub(crate) struct AudioDownloader<P, E> {
    config: Config,
    client: HttpClient,
    pages: P,
    extractor: E,
}

impl<E: LinkExtractor> AudioDownloader<HttpClient, E> {
    pub(crate) fn new(config: Config, extractor: E) -> Result<Self> {
        let client = HttpClient::new(&config)?;
        Ok(Self {
            config,
            pages: client.clone(),
            client,
            extractor,
        })
    }
}

impl<P: PageSource, E: LinkExtractor> AudioDownloader<P, E> {
    /// handle every URL given on the command line
    ///
    /// Failures are reported and counted, they never stop the remaining URLs.
    pub(crate) async fn operate(&self, urls: &[Url]) -> Summary {
        let mut summary = Summary::default();
        for url in urls {
            println!("\nProcessing: {}", url);
            let asset = match self.asset(url).await {
                Ok(asset) => asset,
                Err((stage, e)) => {
                    report(url, stage, &e);
                    summary.failed += 1;
                    continue;
                }
            };
            println!("  Title: {}", asset.title);
            if let Some(d) = asset.duration_display() {
                println!("  Duration: {}", d);
            }
            for &format in &self.config.formats {
                match self.save(&asset, format).await {
                    Ok(()) => summary.downloaded += 1,
                    Err((stage, e)) => {
                        report(url, stage, &e);
                        summary.failed += 1;
                    }
                }
            }
        }
        println!("\n{}", "=".repeat(50));
        println!(
            "Complete! {} downloaded, {} failed",
            summary.downloaded, summary.failed
        );
        summary
    }

    async fn asset(&self, url: &Url) -> std::result::Result<ExtractedAsset, (Stage, ApplicationError)> {
        if !is_freesound(url) {
            tracing::warn!(%url, "not a freesound.org URL, trying anyway");
        }
        let html = self
            .pages
            .request_text(url)
            .await
            .map_err(|e| (Stage::Fetch, e))?;
        self.extractor
            .extract(&html, url)
            .map_err(|e| (Stage::Extract, e))
    }

    async fn save(
        &self,
        asset: &ExtractedAsset,
        format: Format,
    ) -> std::result::Result<(), (Stage, ApplicationError)> {
        let (link, quality) = asset
            .resolve(format, self.config.quality)
            .map_err(|e| (Stage::Extract, e))?;
        let fname = audio_file_name(&asset.title, &asset.sound_id, quality, format)
            .map_err(|e| (Stage::Extract, e))?;
        let path = self.config.output.join(&fname);
        println!("  Downloading {} ({})...", format, quality);
        tracing::debug!(%link, path = %path.display(), "starting download");
        let task = download::Config::new(&link, &path, self.config.idle_timeout);
        let written = download::down(&self.client, &task)
            .await
            .map_err(|e| (Stage::Download, e))?;
        println!(
            "  Saved: {} ({:.2} MB)",
            fname,
            written as f64 / (1024.0 * 1024.0)
        );
        Ok(())
    }
}

fn report(url: &Url, stage: Stage, e: &ApplicationError) {
    tracing::debug!(%url, %stage, kind = %e.kind(), "unit failed");
    eprintln!("  Error: failed to {} for {}: {}", stage, url, e);
}
