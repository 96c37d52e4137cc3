use crate::config::{Format, Quality};
use crate::error::{ApplicationError, Result};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use url::Url;

const FREESOUND_HOST: &str = "freesound.org";
const LQ_MARKER: &str = "-lq.";
const HQ_MARKER: &str = "-hq.";

/// true for freesound.org and its subdomains
pub(crate) fn is_freesound(url: &Url) -> bool {
    match url.host_str() {
        Some(host) => {
            let host = host.trim_end_matches('.').to_ascii_lowercase();
            host == FREESOUND_HOST || host.ends_with(&format!(".{}", FREESOUND_HOST))
        }
        None => false,
    }
}

/// What a sound page says about its audio previews.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExtractedAsset {
    pub(crate) title: String,
    pub(crate) sound_id: String,
    /// seconds
    pub(crate) duration: Option<f64>,
    /// standard-quality preview per format
    pub(crate) sources: BTreeMap<Format, Url>,
}

impl ExtractedAsset {
    /// Pick the link for `format` at the requested quality.
    ///
    /// High quality is derived from the standard link; when the link has no
    /// quality marker the standard link is returned together with
    /// [`Quality::Standard`] so callers name the file after what they really get.
    pub(crate) fn resolve(&self, format: Format, quality: Quality) -> Result<(Url, Quality)> {
        let standard = self.sources.get(&format).ok_or_else(|| {
            ApplicationError::ParseHtml(format!("no {} preview offered on this page", format))
        })?;
        match quality {
            Quality::Standard => Ok((standard.clone(), Quality::Standard)),
            Quality::High => match hq_variant(standard) {
                Some(hq) => Ok((hq, Quality::High)),
                None => {
                    tracing::warn!(%standard, "no high-quality variant, using standard");
                    Ok((standard.clone(), Quality::Standard))
                }
            },
        }
    }

    /// `m:ss`, or None when the page gave no usable duration
    pub(crate) fn duration_display(&self) -> Option<String> {
        let secs = self.duration.filter(|d| d.is_finite() && *d >= 0.0)?;
        let secs = secs as u64;
        Some(format!("{}:{:02}", secs / 60, secs % 60))
    }
}

fn hq_variant(url: &Url) -> Option<Url> {
    let path = url.path();
    let idx = path.rfind(LQ_MARKER)?;
    let mut hq = url.clone();
    hq.set_path(&format!(
        "{}{}{}",
        &path[..idx],
        HQ_MARKER,
        &path[idx + LQ_MARKER.len()..]
    ));
    Some(hq)
}

/// Turns a page body into an [`ExtractedAsset`].
///
/// Page layouts change; every layout-specific rule lives behind this trait.
pub(crate) trait LinkExtractor {
    fn extract(&self, html: &str, page_url: &Url) -> Result<ExtractedAsset>;
}

/// Reads the `data-*` attributes of the freesound audio player element.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct PlayerExtractor;

impl PlayerExtractor {
    fn selector(css: &str) -> Result<Selector> {
        match Selector::parse(css) {
            Ok(s) => Ok(s),
            Err(_) => Err(ApplicationError::ParseHtml(format!(
                "parse {} selector error",
                css
            ))),
        }
    }

    fn find_player<'a>(&self, document: &'a Html) -> Result<Option<ElementRef<'a>>> {
        let player = document.select(&Self::selector(".bw-player")?).next();
        if player.is_some() {
            return Ok(player);
        }
        Ok(document.select(&Self::selector("[data-mp3]")?).next())
    }
}

impl LinkExtractor for PlayerExtractor {
    fn extract(&self, html: &str, page_url: &Url) -> Result<ExtractedAsset> {
        let document = Html::parse_document(html);
        let player = self.find_player(&document)?.ok_or_else(|| {
            ApplicationError::ParseHtml(format!("audio player not found on page {}", page_url))
        })?;
        let el = player.value();
        let mut sources = BTreeMap::new();
        for format in [Format::Mp3, Format::Ogg] {
            if let Some(link) = el.attr(format.attribute()).map(str::trim).filter(|l| !l.is_empty()) {
                sources.insert(format, page_url.join(link)?);
            }
        }
        if sources.is_empty() {
            return Err(ApplicationError::ParseHtml(format!(
                "no audio URLs found on page {}",
                page_url
            )));
        }
        let title = el
            .attr("data-title")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("unknown");
        Ok(ExtractedAsset {
            title: title.to_string(),
            sound_id: el.attr("data-sound-id").unwrap_or_default().trim().to_string(),
            duration: el.attr("data-duration").and_then(|d| d.trim().parse().ok()),
            sources,
        })
    }
}
