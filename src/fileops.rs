use crate::config::{Format, Quality};
use crate::error::Result;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// replace a leading `~` with the home directory, leave anything else untouched
pub(crate) fn expand_home(path: &Path) -> PathBuf {
    let home = match std::env::var_os("HOME") {
        Some(h) if !h.is_empty() => PathBuf::from(h),
        _ => return path.to_owned(),
    };
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_owned(),
    }
}

static INVALID_CHARS: OnceLock<Regex> = OnceLock::new();

fn invalid_chars() -> Result<&'static Regex> {
    if let Some(re) = INVALID_CHARS.get() {
        return Ok(re);
    }
    let re = Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#)?;
    Ok(INVALID_CHARS.get_or_init(|| re))
}

/// replace characters that are invalid in file names on common filesystems
pub(crate) fn sanitize_filename(name: &str) -> Result<String> {
    let name = invalid_chars()?.replace_all(name, "_");
    let name = name.trim_matches(|c| c == ' ' || c == '.');
    Ok(if name.is_empty() {
        "download".into()
    } else {
        name.to_string()
    })
}

/// `<title>_<sound id>_<lq|hq>.<ext>`, the id is left out when unknown
pub(crate) fn audio_file_name(
    title: &str,
    sound_id: &str,
    quality: Quality,
    format: Format,
) -> Result<String> {
    let title = sanitize_filename(title)?;
    let id = sound_id.trim();
    Ok(if id.is_empty() {
        format!("{}_{}.{}", title, quality.tag(), format.extension())
    } else {
        format!(
            "{}_{}_{}.{}",
            title,
            sanitize_filename(id)?,
            quality.tag(),
            format.extension()
        )
    })
}

pub(crate) async fn create_output_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

/// sibling path a download is streamed into before it replaces `path`
pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// remove a truncated download, a file that is already gone is fine
pub(crate) async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove partial file"),
    }
}
