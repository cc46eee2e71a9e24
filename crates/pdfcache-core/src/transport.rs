//! HTTP GET transport.
//!
//! `Transport` is the seam between the fetcher and the network; the fetcher
//! only needs "stream this URL's body into a writer". `CurlTransport` is the
//! libcurl implementation used outside of tests.

use std::io::Write;
use std::time::Duration;

use url::Url;

use crate::config::FetcherConfig;
use crate::control::CancelToken;
use crate::error::TransferError;

/// Streams the body of a GET request into a sink.
pub trait Transport: Send + Sync {
    /// Fetch `url` and write the response body to `sink` as it arrives.
    /// Returns the number of body bytes written.
    ///
    /// Implementations must fail with `TransferError::Http` on a non-2xx final
    /// status, with `TransferError::Sink` when `sink` rejects a write, and
    /// should poll `cancel` while waiting on the network.
    fn get(
        &self,
        url: &Url,
        sink: &mut dyn Write,
        cancel: &CancelToken,
    ) -> Result<u64, TransferError>;
}

/// libcurl handle settings applied to every GET.
#[derive(Debug, Clone, Copy)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Abort when below `low_speed_limit` bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// Hard wall-clock limit for the whole transfer.
    pub timeout: Option<Duration>,
    pub buffer_size: usize,
    pub max_redirects: u32,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self::from_config(&FetcherConfig::default())
    }
}

impl CurlOptions {
    pub fn from_config(cfg: &FetcherConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            low_speed_limit: cfg.low_speed_limit_bytes,
            low_speed_time: cfg.low_speed_time(),
            timeout: cfg.timeout(),
            buffer_size: cfg.buffer_size,
            max_redirects: cfg.max_redirects,
        }
    }
}

/// Blocking libcurl transport. A fresh `Easy` handle is created per request,
/// so one instance can be shared across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurlTransport {
    opts: CurlOptions,
}

impl CurlTransport {
    pub fn new(opts: CurlOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &CurlOptions {
        &self.opts
    }

    fn configure(&self, easy: &mut curl::easy::Easy, url: &Url) -> Result<(), curl::Error> {
        easy.url(url.as_str())?;
        easy.get(true)?;
        easy.follow_location(true)?;
        easy.max_redirections(self.opts.max_redirects)?;
        easy.connect_timeout(self.opts.connect_timeout)?;
        easy.low_speed_limit(self.opts.low_speed_limit)?;
        easy.low_speed_time(self.opts.low_speed_time)?;
        if let Some(t) = self.opts.timeout {
            easy.timeout(t)?;
        }
        easy.buffer_size(self.opts.buffer_size)?;
        // Error statuses end the transfer before their body reaches the sink.
        easy.fail_on_error(true)?;
        // Needed for the progress callback that polls the cancel token.
        easy.progress(true)?;
        Ok(())
    }
}

impl Transport for CurlTransport {
    fn get(
        &self,
        url: &Url,
        sink: &mut dyn Write,
        cancel: &CancelToken,
    ) -> Result<u64, TransferError> {
        cancel.check()?;

        let mut easy = curl::easy::Easy::new();
        self.configure(&mut easy, url).map_err(TransferError::Curl)?;

        let mut received = 0u64;
        let mut sink_error: Option<std::io::Error> = None;
        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| match sink.write_all(data) {
                    Ok(()) => {
                        received += data.len() as u64;
                        Ok(data.len())
                    }
                    Err(e) => {
                        sink_error = Some(e);
                        Ok(0) // abort transfer
                    }
                })
                .map_err(TransferError::Curl)?;
            transfer
                .progress_function(|_, _, _, _| cancel.check().is_ok())
                .map_err(TransferError::Curl)?;
            transfer.perform()
        };

        if let Err(e) = performed {
            if let Some(io_err) = sink_error {
                return Err(TransferError::Sink(io_err));
            }
            if e.is_aborted_by_callback() {
                return Err(match cancel.check() {
                    Err(reason) => reason,
                    Ok(()) => TransferError::Curl(e),
                });
            }
            if e.is_http_returned_error() {
                let code = easy.response_code().map_err(TransferError::Curl)?;
                return Err(TransferError::Http(code));
            }
            return Err(TransferError::Curl(e));
        }

        let code = easy.response_code().map_err(TransferError::Curl)?;
        if !(200..300).contains(&code) {
            return Err(TransferError::Http(code));
        }
        Ok(received)
    }
}
