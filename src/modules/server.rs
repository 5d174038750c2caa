//! Portal HTTP server
//!
//! One tokio task per accepted connection. Each connection reads a request,
//! runs the portal handler on the blocking pool, writes the response, and
//! repeats while keep-alive allows.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;

use super::config::PortalConfig;
use super::connection_policy::ConnectionPolicy;
use super::enhanced_error::{network_operation_error, network_ops, operation_error, EnhancedError};
use super::http_request::{RequestError, RequestReader};
use super::http_response::HttpResponse;
use super::http_version::HttpVersion;
use super::portal::Portal;
use super::upload_store::UploadStore;

pub struct PortalServer {
    portal: Arc<Portal>,
    policy: ConnectionPolicy,
}

impl PortalServer {
    pub fn new(portal: Portal, policy: ConnectionPolicy) -> Self {
        Self {
            portal: Arc::new(portal),
            policy,
        }
    }

    /// Build the portal from configuration and create the staging directory
    pub fn from_config(config: &PortalConfig) -> Result<Self, EnhancedError> {
        let store = UploadStore::new(&config.uploads_root);
        store.prepare()?;
        Ok(Self::new(Portal::new(store), config.connection.clone()))
    }

    /// Bind to the configured address and serve forever
    pub async fn bind_and_run(self, config: &PortalConfig) -> Result<(), EnhancedError> {
        let address = config.listen_address();
        let listener = network_ops::bind_tcp_listener(&address).await?;
        log::info!("Server running at http://{}", address);
        self.run(listener).await
    }

    /// Accept connections on an already bound listener
    pub async fn run(self, listener: TcpListener) -> Result<(), EnhancedError> {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    // Per-connection failures (e.g. EMFILE) must not stop the server.
                    log::warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let portal = Arc::clone(&self.portal);
            let policy = self.policy.clone();
            tokio::spawn(async move {
                let (read_half, write_half) = stream.into_split();
                if let Err(e) = serve_connection(read_half, write_half, peer, portal, policy).await {
                    log::debug!("Connection from {} ended with error: {}", peer, e);
                }
            });
        }
    }
}

/// Serve requests from one connection until it closes or must be closed
pub async fn serve_connection<R, W>(
    reader: R,
    mut writer: W,
    peer: SocketAddr,
    portal: Arc<Portal>,
    policy: ConnectionPolicy,
) -> Result<(), EnhancedError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = RequestReader::new(reader);
    let mut request_count = 0;

    loop {
        let head = match timeout(policy.idle_timeout, reader.read_head(policy.max_head_bytes)).await {
            Err(_elapsed) => {
                log::debug!("Closing idle connection from {}", peer);
                return Ok(());
            }
            Ok(Ok(None)) => return Ok(()),
            Ok(Ok(Some(head))) => head,
            Ok(Err(e)) => return reject(&mut writer, peer, e).await,
        };
        request_count += 1;

        if head.expects_continue() && head.content_length <= policy.max_body_bytes {
            write_bytes(&mut writer, peer, b"HTTP/1.1 100 Continue\r\n\r\n").await?;
        }

        let body = match reader.read_body(&head, policy.max_body_bytes).await {
            Ok(body) => body,
            Err(e) => return reject(&mut writer, peer, e).await,
        };

        let version = head.version;
        let keep_alive = policy.should_keep_alive(&version, head.header("connection"), request_count);
        let request = head.into_request(body);
        let is_head = request.method == "HEAD";
        let method = request.method.clone();
        let path = request.path.clone();

        let handler = Arc::clone(&portal);
        let mut response = tokio::task::spawn_blocking(move || handler.handle(&request))
            .await
            .unwrap_or_else(|e| {
                log::error!("{}", operation_error("handle_request", Box::new(e)));
                HttpResponse::message(500, "Internal server error.")
            });

        log::info!("{} {} {} {}", peer, method, path, response.status_code);

        if is_head {
            response.set_content_length();
            response.body.clear();
        }
        write_bytes(&mut writer, peer, &response.encode(&version, keep_alive)).await?;

        if !keep_alive {
            return Ok(());
        }
    }
}

/// Answer a request that could not be read, then close the connection
async fn reject<W: AsyncWrite + Unpin>(
    writer: &mut W,
    peer: SocketAddr,
    error: RequestError,
) -> Result<(), EnhancedError> {
    match error.to_response() {
        Some(mut response) => {
            log::warn!("Rejected request from {}: {}", peer, error);
            response.add_security_headers();
            write_bytes(writer, peer, &response.encode(&HttpVersion::Http11, false)).await
        }
        None => {
            log::debug!("Dropped connection from {}: {}", peer, error);
            Ok(())
        }
    }
}

async fn write_bytes<W: AsyncWrite + Unpin>(
    writer: &mut W,
    peer: SocketAddr,
    bytes: &[u8],
) -> Result<(), EnhancedError> {
    writer
        .write_all(bytes)
        .await
        .map_err(|e| network_operation_error("write", &peer.to_string(), Box::new(e)))?;
    writer
        .flush()
        .await
        .map_err(|e| network_operation_error("flush", &peer.to_string(), Box::new(e)))
}
