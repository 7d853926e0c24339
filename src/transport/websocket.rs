//! Adapts a `tokio-tungstenite` WebSocket into [`AsyncRead`]/[`AsyncWrite`]
//! so the MQTT connection handler can drive it exactly like a raw TCP
//! socket.
//!
//! MQTT-over-WebSocket (MQTT-SN aside) carries packets as binary frames,
//! one or more MQTT packets per frame, with no framing of its own beyond
//! what the WebSocket layer already provides. This wrapper flattens that
//! into a byte stream: reads drain a leftover-bytes buffer before pulling
//! the next binary frame, writes accumulate until the sink reports it can
//! accept another frame.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::BytesMut;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{Sink, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::WebSocketStream;

const MQTT_SUBPROTOCOLS: [&str; 3] = ["mqtt", "mqttv3.1", "mqttv5"];

pub struct WsStream {
    sink: SplitSink<WebSocketStream<TcpStream>, Message>,
    stream: SplitStream<WebSocketStream<TcpStream>>,
    /// Bytes from a binary frame that didn't fit the caller's read buffer.
    leftover: BytesMut,
    /// A frame already pulled from `stream` but not yet handed to the
    /// reader, kept separately from `leftover` so a pending `Ping`/`Text`
    /// frame doesn't have to be spliced into it.
    unread_frames: VecDeque<Vec<u8>>,
    half_closed: bool,
}

impl WsStream {
    pub fn new(ws: WebSocketStream<TcpStream>) -> Self {
        let (sink, stream) = ws.split();
        Self {
            sink,
            stream,
            leftover: BytesMut::with_capacity(2048),
            unread_frames: VecDeque::new(),
            half_closed: false,
        }
    }

    pub async fn accept(stream: TcpStream) -> Result<Self, io::Error> {
        Self::accept_with_path(stream, "/mqtt").await
    }

    /// Completes the WebSocket upgrade handshake, rejecting requests to an
    /// unexpected path and negotiating the `mqtt`/`mqttv3.1`/`mqttv5`
    /// subprotocol when the client offers one.
    pub async fn accept_with_path(
        stream: TcpStream,
        expected_path: &str,
    ) -> Result<Self, io::Error> {
        let expected_path = expected_path.to_owned();

        let ws = tokio_tungstenite::accept_hdr_async(stream, move |req: &Request, mut resp: Response| {
            negotiate_handshake(req, &mut resp, &expected_path)?;
            Ok(resp)
        })
        .await
        .map_err(io::Error::other)?;

        Ok(Self::new(ws))
    }
}

fn negotiate_handshake(
    req: &Request,
    resp: &mut Response,
    expected_path: &str,
) -> Result<(), ErrorResponse> {
    let actual_path = req.uri().path();
    if actual_path != expected_path {
        return Err(ErrorResponse::new(Some(format!(
            "unexpected path: wanted '{}', got '{}'",
            expected_path, actual_path
        ))));
    }

    let Some(header) = req.headers().get("sec-websocket-protocol") else {
        return Ok(());
    };
    let Ok(offered) = header.to_str() else {
        return Ok(());
    };

    let chosen = offered
        .split(',')
        .map(str::trim)
        .find(|p| MQTT_SUBPROTOCOLS.contains(p));

    if let Some(protocol) = chosen {
        resp.headers_mut()
            .insert("sec-websocket-protocol", protocol.parse().unwrap());
    }

    Ok(())
}

/// Copies up to `buf.remaining()` bytes from `data` into `buf`, stashing
/// whatever doesn't fit into `overflow` for the next read.
fn deliver(data: &[u8], buf: &mut ReadBuf<'_>, overflow: &mut BytesMut) {
    let n = data.len().min(buf.remaining());
    buf.put_slice(&data[..n]);
    if n < data.len() {
        overflow.extend_from_slice(&data[n..]);
    }
}

impl AsyncRead for WsStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if !self.leftover.is_empty() {
            let n = buf.remaining().min(self.leftover.len());
            buf.put_slice(&self.leftover[..n]);
            let _ = self.leftover.split_to(n);
            return Poll::Ready(Ok(()));
        }

        if let Some(frame) = self.unread_frames.pop_front() {
            deliver(&frame, buf, &mut self.leftover);
            return Poll::Ready(Ok(()));
        }

        if self.half_closed {
            return Poll::Ready(Ok(()));
        }

        match Pin::new(&mut self.stream).poll_next(cx) {
            Poll::Ready(Some(Ok(Message::Binary(data)))) => {
                deliver(&data, buf, &mut self.leftover);
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Some(Ok(Message::Close(_)))) => {
                self.half_closed = true;
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Text(_) | Message::Frame(_)))) => {
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            Poll::Ready(Some(Err(err))) => Poll::Ready(Err(io::Error::other(err))),
            Poll::Ready(None) => {
                self.half_closed = true;
                Poll::Ready(Ok(()))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl AsyncWrite for WsStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        // Confirm the sink can accept a frame before committing to sending
        // `buf` — checking the other way round would require buffering
        // `buf` somewhere for a `Pending` result to retry later; leaving it
        // unconsumed and returning `Pending` lets the caller retry instead.
        match Pin::new(&mut self.sink).poll_ready(cx) {
            Poll::Ready(Ok(())) => {
                match Pin::new(&mut self.sink).start_send(Message::Binary(buf.to_vec())) {
                    Ok(()) => Poll::Ready(Ok(buf.len())),
                    Err(err) => Poll::Ready(Err(io::Error::other(err))),
                }
            }
            Poll::Ready(Err(err)) => Poll::Ready(Err(io::Error::other(err))),
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.sink)
            .poll_flush(cx)
            .map_err(io::Error::other)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match Pin::new(&mut self.sink).poll_ready(cx) {
            Poll::Ready(Ok(())) => {
                let _ = Pin::new(&mut self.sink).start_send(Message::Close(None));
                Pin::new(&mut self.sink)
                    .poll_flush(cx)
                    .map_err(io::Error::other)
            }
            Poll::Ready(Err(err)) => Poll::Ready(Err(io::Error::other(err))),
            Poll::Pending => Poll::Pending,
        }
    }
}
