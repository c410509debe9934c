//! Firmware pull helpers
//!
//! The update server publishes `<base>/version.txt` and `<base>/firmware.bin`.
//! The node compares the trimmed version text with its own build version and
//! downloads the image only when they differ. Only plain `http://` URLs are
//! supported.

use core::fmt::Write as _;

use embedded_storage::nor_flash::NorFlash;
use heapless::{String, Vec};

pub const VERSION_FILE: &str = "version.txt";
pub const FIRMWARE_FILE: &str = "firmware.bin";

pub const MAX_URL_LEN: usize = 160;
pub const MAX_REQUEST_LEN: usize = 256;

/// Flash write granularity
const ALIGN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaError {
    /// Only `http://` is supported
    UnsupportedScheme,
    InvalidUrl,
    UrlTooLong,
    /// The server returned an empty or non UTF-8 version
    InvalidVersion,
    MalformedResponse,
    HttpStatus(u16),
    Flash,
}

/// Result of comparing the served version with the running one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateCheck {
    UpToDate,
    Available,
}

/// Decides whether the image behind `served` should be installed.
pub fn check_version(current: &str, served: &[u8]) -> Result<UpdateCheck, OtaError> {
    let served = core::str::from_utf8(served)
        .map_err(|_| OtaError::InvalidVersion)?
        .trim();
    if served.is_empty() {
        return Err(OtaError::InvalidVersion);
    }
    if served == current.trim() {
        Ok(UpdateCheck::UpToDate)
    } else {
        Ok(UpdateCheck::Available)
    }
}

/// Version and image URLs derived from one base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtaUrls {
    pub version: String<MAX_URL_LEN>,
    pub firmware: String<MAX_URL_LEN>,
}

impl OtaUrls {
    pub fn from_base(base: &str) -> Result<Self, OtaError> {
        let base = base.trim_end_matches('/');
        parse_http_url(base)?;
        Ok(Self {
            version: join(base, VERSION_FILE)?,
            firmware: join(base, FIRMWARE_FILE)?,
        })
    }
}

fn join(base: &str, file: &str) -> Result<String<MAX_URL_LEN>, OtaError> {
    let mut url = String::new();
    write!(url, "{}/{}", base, file).map_err(|_| OtaError::UrlTooLong)?;
    Ok(url)
}

/// Parts of an `http://host[:port]/path` URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpUrl<'a> {
    pub host: &'a str,
    pub port: u16,
    pub path: &'a str,
}

pub fn parse_http_url(url: &str) -> Result<HttpUrl<'_>, OtaError> {
    let rest = match url.split_once("://") {
        Some(("http", rest)) => rest,
        Some(_) => return Err(OtaError::UnsupportedScheme),
        None => return Err(OtaError::InvalidUrl),
    };

    let (authority, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, "/"),
    };
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (host, port.parse().map_err(|_| OtaError::InvalidUrl)?),
        None => (authority, 80),
    };
    if host.is_empty() {
        return Err(OtaError::InvalidUrl);
    }

    Ok(HttpUrl { host, port, path })
}

impl HttpUrl<'_> {
    /// Builds an HTTP/1.0 GET request for this URL.
    pub fn get_request(&self) -> Result<Vec<u8, MAX_REQUEST_LEN>, OtaError> {
        let mut request = Vec::new();
        for part in [
            "GET ",
            self.path,
            " HTTP/1.0\r\nHost: ",
            self.host,
            "\r\nConnection: close\r\n\r\n",
        ] {
            request
                .extend_from_slice(part.as_bytes())
                .map_err(|()| OtaError::UrlTooLong)?;
        }
        Ok(request)
    }
}

/// Status line and framing of an HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub content_length: Option<u32>,
    /// Offset of the first body byte in the parsed buffer
    pub body_offset: usize,
}

impl ResponseHead {
    /// Parses the head at the start of `buffer`.
    ///
    /// Returns `Ok(None)` while the blank line ending the head has not been received.
    pub fn parse(buffer: &[u8]) -> Result<Option<Self>, OtaError> {
        let Some(end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") else {
            return Ok(None);
        };
        let head = core::str::from_utf8(&buffer[..end]).map_err(|_| OtaError::MalformedResponse)?;
        let mut lines = head.split("\r\n");

        let status_line = lines.next().ok_or(OtaError::MalformedResponse)?;
        let mut parts = status_line.split_whitespace();
        let version = parts.next().ok_or(OtaError::MalformedResponse)?;
        if !version.starts_with("HTTP/1.") {
            return Err(OtaError::MalformedResponse);
        }
        let status = parts
            .next()
            .and_then(|code| code.parse().ok())
            .ok_or(OtaError::MalformedResponse)?;

        let content_length = lines.find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse().ok()
            } else {
                None
            }
        });

        Ok(Some(Self {
            status,
            content_length,
            body_offset: end + 4,
        }))
    }

    pub fn ensure_ok(&self) -> Result<(), OtaError> {
        if self.status == 200 {
            Ok(())
        } else {
            Err(OtaError::HttpStatus(self.status))
        }
    }
}

/// Streams an image into flash in word-aligned writes.
///
/// The target region must be erased beforehand. Bytes that do not fill a
/// whole word are held back until the next chunk or [`finish`](Self::finish).
pub struct AlignedWriter<'a, F: NorFlash> {
    flash: &'a mut F,
    written: u32,
    tail: [u8; ALIGN],
    tail_len: usize,
}

impl<'a, F: NorFlash> AlignedWriter<'a, F> {
    pub fn new(flash: &'a mut F) -> Self {
        Self {
            flash,
            written: 0,
            tail: [0xFF; ALIGN],
            tail_len: 0,
        }
    }

    /// Bytes received so far, including the held back tail.
    pub fn received(&self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        {
            self.written + self.tail_len as u32
        }
    }

    pub fn write(&mut self, data: &[u8]) -> Result<(), OtaError> {
        let mut idx = 0;

        // Complete partial word
        if self.tail_len > 0 {
            let take = (ALIGN - self.tail_len).min(data.len());
            self.tail[self.tail_len..self.tail_len + take].copy_from_slice(&data[..take]);
            self.tail_len += take;
            idx += take;

            if self.tail_len == ALIGN {
                self.flash
                    .write(self.written, &self.tail)
                    .map_err(|_| OtaError::Flash)?;
                self.written += 4;
                self.tail_len = 0;
                self.tail.fill(0xFF);
            }
        }

        // Write aligned bulk
        let rem = &data[idx..];
        let aligned_len = rem.len() & !(ALIGN - 1);
        if aligned_len > 0 {
            self.flash
                .write(self.written, &rem[..aligned_len])
                .map_err(|_| OtaError::Flash)?;
            #[allow(clippy::cast_possible_truncation)]
            {
                self.written += aligned_len as u32;
            }
        }

        // Keep trailing bytes
        let tail_bytes = &rem[aligned_len..];
        if !tail_bytes.is_empty() {
            self.tail[..tail_bytes.len()].copy_from_slice(tail_bytes);
            self.tail_len = tail_bytes.len();
        }
        Ok(())
    }

    /// Flushes the held back tail padded with `0xFF`. Returns the image length.
    pub fn finish(self) -> Result<u32, OtaError> {
        if self.tail_len > 0 {
            self.flash
                .write(self.written, &self.tail)
                .map_err(|_| OtaError::Flash)?;
        }
        Ok(self.received())
    }
}
