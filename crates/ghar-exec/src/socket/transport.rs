use std::path::{Path, PathBuf};

use ghar_core::backend::BackendError;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Uri, body::Bytes};
use hyper_util::client::legacy::Client;
use hyperlocal::{UnixClientExt, UnixConnector, Uri as UnixUri};
use tokio::net::UnixStream;
use tokio_tungstenite::{WebSocketStream, client_async};
use tracing::trace;

use crate::lxd::Envelope;

/// HTTP and websocket access to the LXD unix socket.
#[derive(Clone)]
pub(crate) struct Transport {
    socket: PathBuf,
    client: Client<UnixConnector, Full<Bytes>>,
}

impl Transport {
    pub(crate) fn new(socket: PathBuf) -> Self {
        Self {
            socket,
            client: Client::unix(),
        }
    }

    pub(crate) fn socket(&self) -> &Path {
        &self.socket
    }

    /// Sends one request and decodes the response envelope, whatever its status.
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Envelope, BackendError> {
        trace!(%method, path, "lxd request");
        let uri: Uri = UnixUri::new(&self.socket, path).into();
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(data) => {
                builder = builder.header("content-type", "application/json");
                Full::new(Bytes::from(data))
            }
            None => Full::new(Bytes::new()),
        };
        let request = builder
            .body(body)
            .map_err(|e| BackendError::Protocol(format!("build request {path}: {e}")))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| self.unavailable(e))?;
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| self.unavailable(e))?
            .to_bytes();

        serde_json::from_slice(&bytes).map_err(|e| {
            BackendError::Protocol(format!(
                "HTTP {status} from {path}: {e}: {}",
                String::from_utf8_lossy(&bytes)
            ))
        })
    }

    /// Opens a websocket on `path` over a fresh socket connection.
    pub(crate) async fn websocket(
        &self,
        path: &str,
    ) -> Result<WebSocketStream<UnixStream>, BackendError> {
        let stream = UnixStream::connect(&self.socket)
            .await
            .map_err(|e| self.unavailable(e))?;
        let (ws, _response) = client_async(format!("ws://localhost{path}"), stream)
            .await
            .map_err(|e| BackendError::Protocol(format!("websocket {path}: {e}")))?;
        Ok(ws)
    }

    fn unavailable(&self, e: impl std::fmt::Display) -> BackendError {
        BackendError::Unavailable(format!("{}: {e}", self.socket.display()))
    }
}
