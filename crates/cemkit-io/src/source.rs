//! Where input tables come from: a remote URL or a local file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Location of a CSV table.
///
/// Strings starting with `http://` or `https://` are URLs, anything else is a
/// filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataSource {
    Url(String),
    Path(PathBuf),
}

impl DataSource {
    pub fn url(url: impl Into<String>) -> Self {
        DataSource::Url(url.into())
    }

    pub fn path(path: impl AsRef<Path>) -> Self {
        DataSource::Path(path.as_ref().to_path_buf())
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, DataSource::Url(_))
    }

    /// Fetch the whole body as text.
    pub fn read_to_string(&self) -> Result<String> {
        match self {
            DataSource::Url(url) => fetch_url(url),
            DataSource::Path(path) => {
                debug!("Reading {}", path.display());
                std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))
            }
        }
    }
}

#[cfg(feature = "native-io")]
fn fetch_url(url: &str) -> Result<String> {
    info!("Downloading {}", url);
    let response = match ureq::get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(code, _)) => {
            anyhow::bail!("failed to download {}: HTTP {}", url, code)
        }
        Err(err) => return Err(err).with_context(|| format!("requesting {}", url)),
    };
    response
        .into_string()
        .with_context(|| format!("reading response body from {}", url))
}

#[cfg(not(feature = "native-io"))]
fn fetch_url(url: &str) -> Result<String> {
    info!("Refusing to download {}", url);
    anyhow::bail!("cannot fetch {}: built without the `native-io` feature", url)
}

impl FromStr for DataSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            anyhow::bail!("empty data source");
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(DataSource::Url(s.to_string()))
        } else {
            Ok(DataSource::Path(PathBuf::from(s)))
        }
    }
}

impl TryFrom<String> for DataSource {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<DataSource> for String {
    fn from(source: DataSource) -> Self {
        source.to_string()
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Url(url) => f.write_str(url),
            DataSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_url_and_path() {
        let url: DataSource = "https://example.org/costs.csv".parse().unwrap();
        assert!(url.is_remote());
        let path: DataSource = "data/costs.csv".parse().unwrap();
        assert_eq!(path, DataSource::path("data/costs.csv"));
        assert!("   ".parse::<DataSource>().is_err());
    }

    #[test]
    fn test_read_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();
        let source = DataSource::path(file.path());
        assert_eq!(source.read_to_string().unwrap(), "a,b\n");
    }

    /// Serve one canned HTTP response on a local port.
    #[cfg(feature = "native-io")]
    fn serve_once(response: &'static str) -> String {
        use std::io::{BufRead, BufReader};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 2 {
                line.clear();
            }
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{}/costs.csv", addr)
    }

    #[cfg(feature = "native-io")]
    #[test]
    fn test_http_error_status_names_url_and_code() {
        let url = serve_once("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        let err = DataSource::url(&url).read_to_string().unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("HTTP 404"), "{}", msg);
        assert!(msg.contains(&url), "{}", msg);
    }

    #[cfg(feature = "native-io")]
    #[test]
    fn test_http_body_is_returned() {
        let url = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\na,b\n");
        assert_eq!(DataSource::url(url).read_to_string().unwrap(), "a,b\n");
    }

    #[test]
    fn test_missing_file_names_path() {
        let source = DataSource::path("/definitely/not/here.csv");
        let err = source.read_to_string().unwrap_err();
        assert!(format!("{:#}", err).contains("/definitely/not/here.csv"));
    }
}
