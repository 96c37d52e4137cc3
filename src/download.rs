use crate::error::{ApplicationError, Result};
use crate::fileops::{create_output_dir, partial_path, remove_partial};
use crate::utils::HttpClient;
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use url::Url;

/// write buffer size, the file is flushed to disk in pieces of this size
const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug)]
pub(crate) struct Config {
    pub(crate) uri: Url,
    pub(crate) file_path: PathBuf,
    /// bounds the wait for the response head and every gap between chunks
    pub(crate) idle_timeout: Duration,
}

impl Config {
    pub(crate) fn new(uri: &Url, file_path: &Path, idle_timeout: Duration) -> Self {
        Self {
            uri: uri.clone(),
            file_path: file_path.to_owned(),
            idle_timeout,
        }
    }
}

fn progress_bar(length: Option<u64>) -> ProgressBar {
    match length {
        Some(len) => {
            let style = ProgressStyle::with_template(
                "  {spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key("eta", |state: &ProgressState, w: &mut dyn Write| {
                let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
            })
            .progress_chars("#>-");
            ProgressBar::new(len).with_style(style)
        }
        None => {
            let style = ProgressStyle::with_template("  {spinner:.green} {bytes} ({bytes_per_sec})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            ProgressBar::new_spinner().with_style(style)
        }
    }
}

/// Stream `config.uri` into `config.file_path`, returning the number of bytes written.
///
/// Nothing is created when the server does not answer 200 in time, and a
/// partly written file is removed on any later failure.
pub(crate) async fn down(client: &HttpClient, config: &Config) -> Result<u64> {
    let resp = client.get_ok(&config.uri, config.idle_timeout).await?;
    let length = resp.content_length();
    if let Some(dir) = config.file_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_output_dir(dir).await?;
    }
    let bar = progress_bar(length);
    let stream = resp.bytes_stream().map_err(ApplicationError::from);
    let ret = save_stream(stream, &config.file_path, length, &bar, config.idle_timeout).await;
    match ret {
        Ok(written) => {
            bar.finish_and_clear();
            Ok(written)
        }
        Err(e) => {
            bar.abandon();
            Err(e)
        }
    }
}

/// Write every chunk of `stream` to `path`.
///
/// Bytes go to a `.part` sibling that replaces `path` only once the stream
/// ended with `expected` bytes. On failure only the `.part` file is deleted,
/// so an earlier copy at `path` stays intact.
pub(crate) async fn save_stream<S>(
    stream: S,
    path: &Path,
    expected: Option<u64>,
    bar: &ProgressBar,
    idle: Duration,
) -> Result<u64>
where
    S: Stream<Item = Result<Bytes>>,
{
    let part = partial_path(path);
    let file = File::create(&part).await?;
    let ret = match write_chunks(stream, file, expected, bar, idle).await {
        Ok(written) => tokio::fs::rename(&part, path)
            .await
            .map(|()| written)
            .map_err(ApplicationError::from),
        Err(e) => Err(e),
    };
    if ret.is_err() {
        remove_partial(&part).await;
    }
    ret
}

async fn write_chunks<S>(
    stream: S,
    file: File,
    expected: Option<u64>,
    bar: &ProgressBar,
    idle: Duration,
) -> Result<u64>
where
    S: Stream<Item = Result<Bytes>>,
{
    tokio::pin!(stream);
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut pos = 0u64;
    loop {
        let next = tokio::time::timeout(idle, stream.next())
            .await
            .map_err(|_| ApplicationError::Stalled(idle))?;
        let chunk = match next {
            Some(chunk) => chunk?,
            None => break,
        };
        writer.write_all(&chunk).await?;
        pos += chunk.len() as u64;
        bar.set_position(pos);
    }
    writer.flush().await?;
    writer.into_inner().sync_all().await?;
    if let Some(expected) = expected {
        if pos != expected {
            return Err(ApplicationError::Incomplete {
                received: pos,
                expected,
            });
        }
    }
    Ok(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config as RunConfig;
    use crate::error::ErrorKind;
    use futures::stream;
    use reqwest::StatusCode;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> HttpClient {
        HttpClient::new(&RunConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn streams_body_into_new_directory() {
        let server = MockServer::start().await;
        let body = vec![7u8; 3 * CHUNK_SIZE + 11];
        Mock::given(method("GET"))
            .and(path("/previews/1-lq.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("nested").join("a_1_lq.mp3");
        let uri = Url::parse(&format!("{}/previews/1-lq.mp3", server.uri())).unwrap();
        let written = down(&client(), &Config::new(&uri, &target, Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(written, body.len() as u64);
        assert_eq!(std::fs::read(&target).unwrap(), body);
        assert!(!partial_path(&target).exists());
    }

    #[tokio::test]
    async fn silent_server_times_out_before_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("slow.mp3");
        let uri = Url::parse(&format!("{}/previews/slow-lq.mp3", server.uri())).unwrap();
        let started = std::time::Instant::now();
        let err = down(&client(), &Config::new(&uri, &target, Duration::from_millis(200)))
            .await
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(matches!(err, ApplicationError::Stalled(_)));
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn dropped_connection_is_a_network_error() {
        // announces 1000 bytes, sends 10, then hangs up
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await;
            sock.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n0123456789")
                .await
                .unwrap();
            sock.flush().await.unwrap();
        });
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("cut.mp3");
        let uri = Url::parse(&format!("http://{}/previews/cut-lq.mp3", addr)).unwrap();
        let err = down(&client(), &Config::new(&uri, &target, Duration::from_secs(5)))
            .await
            .unwrap_err();
        server.await.unwrap();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(!target.exists());
        assert!(!partial_path(&target).exists());
    }

    #[tokio::test]
    async fn failed_download_keeps_earlier_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("Rain_1_lq.mp3");
        std::fs::write(&target, b"previously complete download").unwrap();
        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"new")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset").into()),
        ];
        save_stream(
            stream::iter(chunks),
            &target,
            None,
            &ProgressBar::hidden(),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert_eq!(std::fs::read(&target).unwrap(), b"previously complete download");
        assert!(!partial_path(&target).exists());
    }

    #[tokio::test]
    async fn finished_download_replaces_earlier_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("Rain_1_lq.mp3");
        std::fs::write(&target, b"old").unwrap();
        let chunks: Vec<Result<Bytes>> = vec![Ok(Bytes::from_static(b"fresh"))];
        let written = save_stream(
            stream::iter(chunks),
            &target,
            Some(5),
            &ProgressBar::hidden(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(written, 5);
        assert_eq!(std::fs::read(&target).unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn http_error_creates_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("missing.mp3");
        let uri = Url::parse(&format!("{}/previews/missing-lq.mp3", server.uri())).unwrap();
        let err = down(&client(), &Config::new(&uri, &target, Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Http { status, .. } if status == StatusCode::NOT_FOUND));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn interrupted_stream_leaves_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("cut.ogg");
        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from(vec![1u8; CHUNK_SIZE * 2])),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset").into()),
        ];
        let err = save_stream(
            stream::iter(chunks),
            &target,
            Some(CHUNK_SIZE as u64 * 4),
            &ProgressBar::hidden(),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IO);
        assert!(!target.exists());
        assert!(!partial_path(&target).exists());
    }

    #[tokio::test]
    async fn short_body_is_incomplete_and_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("short.mp3");
        let chunks: Vec<Result<Bytes>> = vec![Ok(Bytes::from_static(b"abc"))];
        let err = save_stream(
            stream::iter(chunks),
            &target,
            Some(10),
            &ProgressBar::hidden(),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApplicationError::Incomplete { received: 3, expected: 10 }));
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn stalled_stream_times_out() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("stalled.mp3");
        let first = stream::iter(vec![Ok(Bytes::from_static(b"abc"))]);
        let stalled = first.chain(stream::pending());
        let err = save_stream(
            stalled,
            &target,
            None,
            &ProgressBar::hidden(),
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApplicationError::Stalled(_)));
        assert!(!target.exists());
        assert!(!partial_path(&target).exists());
    }
}
