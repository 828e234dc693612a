use std::{io::Read, time::Duration};

use tracing::{debug, error, instrument};
use url::Url;

use crate::{
    constants::{DEFAULT_TIMEOUT, MAX_MANIFEST_SIZE},
    errors::{AttestError, Result},
    types::AttestOptions,
    utils::get_allow_file_locators,
};

/// Retrieves the reference manifest a locator points to.
pub trait ManifestFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

/// Fetches `http://` and `https://` locators.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    max_size: u64,
}

impl HttpFetcher {
    /// Creates a fetcher whose requests time out after `timeout` and whose
    /// responses may hold at most [`MAX_MANIFEST_SIZE`] bytes.
    ///
    /// # Errors
    ///
    /// Returns `AttestError::FetchError` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            max_size: MAX_MANIFEST_SIZE,
        })
    }

    /// Limits the size of response bodies.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }
}

impl ManifestFetcher for HttpFetcher {
    #[instrument(level = "debug", name = "fetch_http_locator", skip(self), fields(url = %url))]
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.client.get(url.as_str()).send().map_err(|e| {
            error!(url = %url, "Failed to fetch locator: {e}");
            AttestError::FetchError(e)
        })?;
        if !response.status().is_success() {
            error!(
                url = %url,
                status = %response.status(),
                "Locator request failed with status code {}",
                response.status()
            );
            return Err(AttestError::LocatorFetchFailed {
                message: format!("status code {}", response.status()),
                url: url.to_string(),
            });
        }
        if let Some(len) = response.content_length() {
            check_size(len, self.max_size, url)?;
        }
        let body = read_limited(response, self.max_size, url)?;
        debug!(url = %url, len = body.len(), "Fetched locator");
        Ok(body)
    }
}

/// Reads `file://` locators from the local filesystem.
pub struct FileFetcher {
    max_size: u64,
}

impl Default for FileFetcher {
    fn default() -> Self {
        Self {
            max_size: MAX_MANIFEST_SIZE,
        }
    }
}

impl FileFetcher {
    /// Limits the size of the files read.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }
}

impl ManifestFetcher for FileFetcher {
    #[instrument(level = "debug", name = "fetch_file_locator", skip(self), fields(url = %url))]
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let path = url
            .to_file_path()
            .map_err(|()| AttestError::LocatorFetchFailed {
                message: "not a local file path".to_string(),
                url: url.to_string(),
            })?;
        let file = std::fs::File::open(path)?;
        check_size(file.metadata()?.len(), self.max_size, url)?;
        read_limited(file, self.max_size, url)
    }
}

fn check_size(len: u64, max_size: u64, url: &Url) -> Result<()> {
    if len > max_size {
        error!(url = %url, len, max_size, "Locator body is too large");
        return Err(AttestError::LocatorFetchFailed {
            message: format!("body of {len} bytes exceeds the limit of {max_size} bytes"),
            url: url.to_string(),
        });
    }
    Ok(())
}

/// Reads at most `max_size` bytes, failing if `reader` holds more.
fn read_limited(reader: impl Read, max_size: u64, url: &Url) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    reader.take(max_size.saturating_add(1)).read_to_end(&mut body)?;
    check_size(body.len() as u64, max_size, url)?;
    Ok(body)
}

/// Dispatches locators to the fetcher of their scheme.
///
/// `file://` locators are refused unless file locators are allowed, either
/// through [`AttestOptions::allow_file_locators`] or the process-wide
/// setting.
pub struct LocatorFetcher {
    http: HttpFetcher,
    file: FileFetcher,
    allow_file_locators: bool,
}

impl LocatorFetcher {
    /// # Errors
    ///
    /// Returns `AttestError::FetchError` if the HTTP client cannot be built.
    pub fn new(options: &AttestOptions) -> Result<Self> {
        let max_size = options.max_manifest_size.unwrap_or(MAX_MANIFEST_SIZE);
        Ok(Self {
            http: HttpFetcher::new(options.fetch_timeout.unwrap_or(DEFAULT_TIMEOUT))?
                .with_max_size(max_size),
            file: FileFetcher::default().with_max_size(max_size),
            allow_file_locators: options
                .allow_file_locators
                .unwrap_or_else(get_allow_file_locators),
        })
    }
}

impl ManifestFetcher for LocatorFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        match url.scheme() {
            "http" | "https" => self.http.fetch(url),
            "file" if self.allow_file_locators => self.file.fetch(url),
            "file" => {
                error!(url = %url, "File locators are not allowed");
                Err(AttestError::LocatorFetchFailed {
                    message: "file locators are not allowed".to_string(),
                    url: url.to_string(),
                })
            }
            scheme => {
                error!(url = %url, scheme, "Unsupported locator scheme");
                Err(AttestError::LocatorFetchFailed {
                    message: format!("unsupported scheme {scheme}"),
                    url: url.to_string(),
                })
            }
        }
    }
}
