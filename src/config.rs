use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::fileops::expand_home;
use crate::parse_args::ArgConfig;

pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/41.0.2228.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Format {
    Mp3,
    Ogg,
}

impl Format {
    pub(crate) fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
        }
    }
    /// player attribute holding the preview link for this format
    pub(crate) fn attribute(self) -> &'static str {
        match self {
            Self::Mp3 => "data-mp3",
            Self::Ogg => "data-ogg",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_uppercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quality {
    Standard,
    High,
}

impl Quality {
    /// short tag used in file names
    pub(crate) fn tag(self) -> &'static str {
        match self {
            Self::Standard => "lq",
            Self::High => "hq",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::High => f.write_str("high-quality"),
        }
    }
}

/// Immutable settings for one run, built once from the command line.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) formats: BTreeSet<Format>,
    pub(crate) quality: Quality,
    pub(crate) output: PathBuf,
    pub(crate) user_agent: String,
    /// whole-request limit for fetching a sound page
    pub(crate) page_timeout: Duration,
    pub(crate) connect_timeout: Duration,
    /// longest gap allowed between two chunks of a download
    pub(crate) idle_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            formats: BTreeSet::from([Format::Mp3]),
            quality: Quality::Standard,
            output: PathBuf::from("."),
            user_agent: USER_AGENT.into(),
            page_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub(crate) fn from_args(args: &ArgConfig) -> Self {
        let mut formats = BTreeSet::new();
        if args.mp3 {
            formats.insert(Format::Mp3);
        }
        if args.ogg {
            formats.insert(Format::Ogg);
        }
        if formats.is_empty() {
            formats.insert(Format::Mp3);
        }
        Config {
            formats,
            quality: if args.hq { Quality::High } else { Quality::Standard },
            output: expand_home(&args.output),
            ..Default::default()
        }
    }
}
