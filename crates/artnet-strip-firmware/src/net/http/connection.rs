use embassy_net::tcp::TcpSocket;
use embedded_io_async::Write as _;
use heapless::{String, Vec};
use log::debug;
use serde::{Serialize, de::DeserializeOwned};

use super::{
    Error, HttpResult,
    headers::{
        ContentHeaders, ContentType, HttpMethod, ResponseHeaders, StatusCode, TargetWriter as _,
        find_content_length, parse_request_line, read_heading,
    },
};

const HEADER_BUFFER_SIZE: usize = 512;
const BODY_BUFFER_SIZE: usize = 1024;
const MAX_PATH_LEN: usize = 64;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// HTTP connection context
pub(crate) struct HttpConnection<'a> {
    method: HttpMethod,
    path: String<MAX_PATH_LEN>,

    socket: TcpSocket<'a>,
    content_length: usize,
    header_end: usize,
    header_buf: Vec<u8, HEADER_BUFFER_SIZE>,
    body_buf: Vec<u8, BODY_BUFFER_SIZE>,
}

impl<'a> HttpConnection<'a> {
    /// Reads the request head from a freshly accepted socket.
    pub(crate) async fn from_socket(mut socket: TcpSocket<'a>) -> Result<Self, Error> {
        let mut header_buf = Vec::<u8, HEADER_BUFFER_SIZE>::new();
        header_buf
            .resize(HEADER_BUFFER_SIZE, 0)
            .map_err(|()| Error::Parse)?;
        let (header_end, header_len) = read_heading(header_buf.as_mut_slice(), &mut socket)
            .await?
            .ok_or(Error::NoData)?;
        header_buf.truncate(header_len);

        // Only the head is text, body bytes may follow it in the buffer
        let header_str =
            core::str::from_utf8(&header_buf[..header_end]).map_err(|_| Error::Parse)?;
        let (method, raw_path, rest_headers) =
            parse_request_line(header_str).ok_or(Error::Parse)?;
        let content_length = find_content_length(rest_headers).unwrap_or(0);
        let path = String::try_from(raw_path).map_err(|()| Error::Parse)?;

        Ok(Self {
            method,
            path,
            socket,
            content_length,
            header_end,
            header_buf,
            body_buf: Vec::new(),
        })
    }

    /// Get request method and path
    pub(crate) fn route(&self) -> (HttpMethod, &'_ str) {
        (self.method, self.path.as_str())
    }

    /// Serializes `data` and sends it with `status`.
    pub(crate) async fn respond_json<T: Serialize>(
        &mut self,
        status: StatusCode,
        data: &T,
    ) -> HttpResult {
        self.body_buf.clear();
        self.body_buf
            .resize(BODY_BUFFER_SIZE, 0)
            .map_err(|()| Error::Serialize)?;
        let n = serde_json_core::to_slice(data, self.body_buf.as_mut_slice())
            .map_err(|_| Error::Serialize)?;
        self.body_buf.truncate(n);

        let headers = ResponseHeaders::from_code(status)
            .with_content(ContentHeaders::new(ContentType::Json).with_length(n));
        self.header_buf.clear();
        headers.write_to(&mut self.header_buf)?;

        self.socket.write_all(&self.header_buf).await?;
        self.socket.write_all(&self.body_buf).await?;
        self.socket.flush().await?;
        Ok(())
    }

    /// Sends `{"error": message}` with `status`.
    pub(crate) async fn respond_error(&mut self, status: StatusCode, message: &str) -> HttpResult {
        self.respond_json(status, &ErrorBody { error: message })
            .await
    }

    /// Read JSON from the request body
    pub(crate) async fn read_json<T: DeserializeOwned>(&mut self) -> Result<T, Error> {
        let body = self.read_body().await?;
        let (data, _) = serde_json_core::from_slice(body).map_err(|e| {
            debug!("http: json parse error: {:?}", e);
            Error::Parse
        })?;
        Ok(data)
    }

    /// Read the request body
    async fn read_body(&mut self) -> Result<&[u8], Error> {
        if self.content_length == 0 {
            return Err(Error::NoData);
        }
        if self.content_length > BODY_BUFFER_SIZE {
            return Err(Error::TooLarge);
        }

        self.body_buf.clear();
        self.body_buf
            .extend_from_slice(&self.header_buf[self.header_end..])
            .map_err(|()| Error::TooLarge)?;

        let mut chunk = [0u8; 256];
        while self.body_buf.len() < self.content_length {
            let n = self.socket.read(&mut chunk).await?;
            if n == 0 {
                return Err(Error::Closed);
            }
            self.body_buf
                .extend_from_slice(&chunk[..n])
                .map_err(|()| Error::TooLarge)?;
        }

        Ok(&self.body_buf[..self.content_length])
    }
}
