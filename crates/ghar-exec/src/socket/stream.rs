//! Stdio websockets of a non-interactive exec operation.
use futures::{SinkExt, StreamExt};
use ghar_core::backend::BackendError;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::{
    WebSocketStream,
    tungstenite::{Error as WsError, Message, error::ProtocolError},
};
use tracing::debug;

fn ws_error(stream: &'static str, e: WsError) -> BackendError {
    BackendError::Protocol(format!("exec {stream}: {e}"))
}

/// Writes `data` to the stdin websocket, then signals end of input.
///
/// LXD treats an empty text frame as EOF on the command's stdin. A command
/// that exits early may close the socket first; the operation's return code
/// decides the outcome, so send failures are only logged.
pub(crate) async fn feed<S>(mut ws: WebSocketStream<S>, data: Option<&str>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Some(data) = data.filter(|d| !d.is_empty()) {
        if let Err(e) = ws.send(Message::binary(data.as_bytes().to_vec())).await {
            debug!(error = %e, "stdin closed before input was written");
            return;
        }
    }
    if let Err(e) = ws.send(Message::text("")).await {
        debug!(error = %e, "stdin closed before end of input");
        return;
    }
    let _ = ws.close(None).await;
}

/// Collects everything written to an output websocket until it closes.
pub(crate) async fn drain<S>(
    mut ws: WebSocketStream<S>,
    stream: &'static str,
) -> Result<String, BackendError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    while let Some(msg) = ws.next().await {
        match msg {
            Ok(Message::Binary(data)) => buf.extend_from_slice(&data),
            Ok(Message::Text(text)) if text.is_empty() => break,
            Ok(Message::Text(text)) => buf.extend_from_slice(text.as_bytes()),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed)
            | Err(WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)) => break,
            Err(e) => return Err(ws_error(stream, e)),
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use tokio::io::duplex;
    use tokio_tungstenite::tungstenite::protocol::Role;

    use super::*;

    async fn pair() -> (
        WebSocketStream<tokio::io::DuplexStream>,
        WebSocketStream<tokio::io::DuplexStream>,
    ) {
        let (a, b) = duplex(64 * 1024);
        let client = WebSocketStream::from_raw_socket(a, Role::Client, None).await;
        let server = WebSocketStream::from_raw_socket(b, Role::Server, None).await;
        (client, server)
    }

    #[tokio::test]
    async fn stdin_ends_with_empty_text_frame() {
        let (client, mut server) = pair().await;
        let writer = tokio::spawn(feed(client, Some("echo hi\n")));

        assert_eq!(
            server.next().await.unwrap().unwrap(),
            Message::binary(b"echo hi\n".to_vec())
        );
        assert_eq!(server.next().await.unwrap().unwrap(), Message::text(""));
        assert!(matches!(server.next().await.unwrap().unwrap(), Message::Close(_)));
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn feeding_a_closed_stdin_is_not_an_error() {
        let (client, server) = pair().await;
        drop(server);

        // Completes instead of failing the whole exec.
        feed(client, Some("configure\n")).await;
    }

    #[tokio::test]
    async fn drain_concatenates_until_close() {
        let (mut client, server) = pair().await;
        let reader = tokio::spawn(async move { drain(server, "stdout").await });

        client.send(Message::binary(b"runn".to_vec())).await.unwrap();
        client.send(Message::binary(b"ing\n".to_vec())).await.unwrap();
        client.close(None).await.unwrap();

        assert_eq!(reader.await.unwrap().unwrap(), "running\n");
    }
}
