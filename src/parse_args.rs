use std::path::PathBuf;

use clap::Parser;
use url::Url;

/// download audio files from freesound.org without logging in
#[derive(Parser, Debug)]
#[clap(
    name = "freesound",
    version,
    long_about = None,
    after_help = "Example: freesound https://freesound.org/people/Yahujiki/sounds/843779/ --mp3 --hq"
)]
pub struct ArgConfig {
    /// freesound sound page URLs, e.g. https://freesound.org/people/user/sounds/12345/
    #[clap(value_name("URL"), required = true, value_parser = parse_url)]
    pub urls: Vec<Url>,
    /// download MP3 format (default)
    #[clap(long, action)]
    pub mp3: bool,
    /// download OGG format
    #[clap(long, action)]
    pub ogg: bool,
    /// download the high-quality version (default is standard quality)
    #[clap(long, action)]
    pub hq: bool,
    /// output directory
    #[clap(short, long, value_name("dir"), default_value("."))]
    pub output: PathBuf,
    /// print debug diagnostics to stderr
    #[clap(short, long, action)]
    pub verbose: bool,
}

fn parse_url(s: &str) -> Result<Url, String> {
    let url = Url::parse(s).map_err(|e| format!("malformed URL {}: {}", s, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme {} in {}", other, s)),
    }
}
