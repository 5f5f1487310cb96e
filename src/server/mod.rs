//! HTTP/1.1 transport adapter over Tokio.
//!
//! Accepts TCP connections, frames requests with `httparse`, hands each one to a
//! [`Service`], and writes back what it returns. Persistent connections are supported;
//! requests on one connection are served in order.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::config::CoreConfig;
use crate::error::DispatchError;
use crate::http::StatusCode;
use crate::http::request::{RequestError, RequestHead};
use crate::service::Service;

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// A listening socket bound to a [`Service`] once [`Server::serve`] is called.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use restcore::{CoreConfig, Server, Service};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = CoreConfig::default();
///     let service = Service::builder().config(&config).build();
///     let server = Server::bind_config(&config).await?;
///     server.serve(Arc::new(service)).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    max_request_bytes: usize,
}

impl Server {
    /// Binds to `addr` with the default request size limit.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            max_request_bytes: CoreConfig::default().max_request_bytes,
        })
    }

    /// Binds to `config.bind_address` and adopts its request size limit.
    pub async fn bind_config(config: &CoreConfig) -> Result<Self, ServerError> {
        Ok(Self::bind(&config.bind_address)
            .await?
            .max_request_bytes(config.max_request_bytes))
    }

    /// Largest request (head plus body) buffered before answering 413.
    #[must_use]
    pub fn max_request_bytes(mut self, limit: usize) -> Self {
        self.max_request_bytes = limit;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until the listener fails.
    ///
    /// # Errors
    ///
    /// Never returns under normal operation; accept errors are logged and skipped.
    pub async fn serve(self, service: Arc<Service>) -> Result<(), ServerError> {
        info!(address = %self.local_addr, "listening");

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let service = Arc::clone(&service);
            let limit = self.max_request_bytes;

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, service, limit).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

/// Serves requests on one connection until the peer closes it or opts out of keep-alive.
///
/// Every complete request already buffered is answered before reading again, so
/// pipelined requests arriving in one segment are all served.
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    service: Arc<Service>,
    max_request_bytes: usize,
) -> Result<(), std::io::Error> {
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        while !buf.is_empty() {
            let head = match RequestHead::parse(&buf) {
                Ok(head) => head,
                Err(RequestError::Incomplete) => break,
                Err(e) => {
                    warn!(peer = %peer_addr, error = %e, "unparseable request, sending 400");
                    return reject(&mut stream, &service, DispatchError::malformed(e.to_string())).await;
                }
            };

            let content_length = match head.content_length() {
                Ok(len) => len,
                Err(e) => {
                    warn!(peer = %peer_addr, error = %e, "bad content-length, sending 400");
                    return reject(&mut stream, &service, DispatchError::malformed(e.to_string())).await;
                }
            };

            let Some(total_needed) = head
                .body_offset()
                .checked_add(content_length)
                .filter(|total| *total <= max_request_bytes)
            else {
                warn!(peer = %peer_addr, content_length, "declared body too large, sending 413");
                return reject(&mut stream, &service, too_large(max_request_bytes)).await;
            };
            if buf.len() < total_needed {
                break;
            }

            let keep_alive = head.is_keep_alive();
            let mut consumed = buf.split_to(total_needed);
            let body = consumed.split_off(head.body_offset()).freeze();
            let request = head.into_request(body);

            let response = service.handle(request).await;
            stream.write_all(&response.into_bytes(keep_alive)).await?;
            stream.flush().await?;

            if !keep_alive {
                debug!(peer = %peer_addr, "connection: close");
                return Ok(());
            }
        }

        if buf.len() > max_request_bytes {
            warn!(peer = %peer_addr, limit = max_request_bytes, "request too large, sending 413");
            return reject(&mut stream, &service, too_large(max_request_bytes)).await;
        }

        if stream.read_buf(&mut buf).await? == 0 {
            debug!(peer = %peer_addr, "connection closed by peer");
            return Ok(());
        }
    }
}

fn too_large(limit: usize) -> DispatchError {
    DispatchError::Client {
        status: StatusCode::PayloadTooLarge,
        message: format!("request exceeds {limit} bytes"),
    }
}

/// Writes the composed error and gives up on the connection.
async fn reject(
    stream: &mut TcpStream,
    service: &Service,
    err: DispatchError,
) -> Result<(), std::io::Error> {
    stream.write_all(&service.reject(err).into_bytes(false)).await?;
    stream.flush().await
}
