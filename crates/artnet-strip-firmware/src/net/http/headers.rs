use core::fmt::Write;

use embassy_net::tcp::{Error as TcpError, TcpSocket};

pub(crate) type StatusCode = u16;

fn reason_phrase(code: StatusCode) -> &'static str {
    match code {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        413 => "Request Entity Too Large",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// HTTP Content Type.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ContentType {
    Json,
}

impl ContentType {
    fn as_str(self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
        }
    }
}

pub(super) trait TargetWriter {
    fn write_to(&self, writer: &mut impl Write) -> Result<(), core::fmt::Error>;
}

/// HTTP Content Headers.
pub(crate) struct ContentHeaders {
    content_type: ContentType,
    content_length: Option<usize>,
}

impl ContentHeaders {
    pub(crate) const fn new(content_type: ContentType) -> Self {
        Self {
            content_type,
            content_length: None,
        }
    }

    #[must_use]
    pub(crate) const fn with_length(mut self, length: usize) -> Self {
        self.content_length = Some(length);
        self
    }
}

impl TargetWriter for ContentHeaders {
    fn write_to(&self, writer: &mut impl Write) -> Result<(), core::fmt::Error> {
        write!(writer, "Content-Type: {}\r\n", self.content_type.as_str())?;
        if let Some(content_length) = self.content_length {
            write!(writer, "Content-Length: {}\r\n", content_length)?;
        }
        Ok(())
    }
}

/// Response Headers.
pub(crate) struct ResponseHeaders {
    status: StatusCode,
    content: Option<ContentHeaders>,
}

impl ResponseHeaders {
    pub(crate) const fn from_code(status: StatusCode) -> Self {
        Self {
            status,
            content: None,
        }
    }

    #[must_use]
    pub(crate) const fn with_content(mut self, content: ContentHeaders) -> Self {
        self.content = Some(content);
        self
    }
}

impl TargetWriter for ResponseHeaders {
    fn write_to(&self, writer: &mut impl Write) -> Result<(), core::fmt::Error> {
        write!(
            writer,
            "HTTP/1.1 {} {}\r\n",
            self.status,
            reason_phrase(self.status)
        )?;
        if let Some(content) = &self.content {
            content.write_to(writer)?;
        }
        write!(writer, "Connection: close\r\n\r\n")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            "PATCH" => HttpMethod::Patch,
            "OPTIONS" => HttpMethod::Options,
            "HEAD" => HttpMethod::Head,
            _ => return None,
        })
    }
}

/// Parse the request line from the header string.
///
/// Returns the method, the path without its query and the remaining headers.
pub(super) fn parse_request_line(header_str: &str) -> Option<(HttpMethod, &str, &str)> {
    let line_end = header_str.find("\r\n").unwrap_or(header_str.len());
    let mut parts = header_str[..line_end].split_whitespace();
    let method = parts.next().and_then(HttpMethod::parse)?;
    let target = parts.next()?;
    let path = target.split('?').next().unwrap_or(target);
    let rest = header_str.get(line_end + 2..).unwrap_or("");

    Some((method, path, rest))
}

/// Read the start line and headers from the socket.
///
/// Returns the position of the end of the headers and the number of bytes
/// read. Bytes past the headers already belong to the body.
pub(super) async fn read_heading(
    buf: &mut [u8],
    socket: &mut TcpSocket<'_>,
) -> Result<Option<(usize, usize)>, TcpError> {
    let mut header_len = 0;
    while header_len < buf.len() {
        let n = socket.read(&mut buf[header_len..]).await?;
        if n == 0 {
            return Ok(None);
        }
        header_len += n;
        if let Some(pos) = buf[..header_len].windows(4).position(|w| w == b"\r\n\r\n") {
            return Ok(Some((pos + 4, header_len)));
        }
    }
    Ok(None)
}

/// Find the content length in the header string.
pub(super) fn find_content_length(headers: &str) -> Option<usize> {
    const TARGET: &str = "content-length:";
    headers.lines().find_map(|line| {
        let name = line.get(..TARGET.len())?;
        if name.eq_ignore_ascii_case(TARGET) {
            line[TARGET.len()..].trim().parse().ok()
        } else {
            None
        }
    })
}
