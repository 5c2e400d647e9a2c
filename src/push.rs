//! Server-push channel shared by the dashboard and the widget.
//!
//! A [`PushChannel`] owns at most one socket task. The task decodes each text frame
//! into a [`PushEvent`] and forwards it to the surface's sink. When the socket closes
//! abnormally it sleeps for the policy delay and dials again, forever. A clean close
//! or a local [`PushChannel::disconnect`] ends it for good.

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use std::borrow::Cow;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use url::Url;

use crate::api::PushEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// The peer completed a close handshake with a normal code.
    Clean,
    /// Transport error, EOF without a close frame, failed dial or abnormal code.
    Abnormal,
}

/// Fixed-delay reconnect with unbounded retries. No backoff growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    /// Delay before the next attempt, or `None` when the close was intentional.
    pub fn after_close(&self, kind: CloseKind) -> Option<Duration> {
        match kind {
            CloseKind::Clean => None,
            CloseKind::Abnormal => Some(self.delay),
        }
    }
}

pub fn classify_close(frame: Option<&CloseFrame<'_>>) -> CloseKind {
    match frame {
        Some(f) if f.code == CloseCode::Normal => CloseKind::Clean,
        _ => CloseKind::Abnormal,
    }
}

/// How long a local close waits for a handshake that is already in flight.
const HANDSHAKE_GRACE: Duration = Duration::from_secs(2);

fn client_close() -> CloseFrame<'static> {
    CloseFrame { code: CloseCode::Normal, reason: Cow::Borrowed("client closing") }
}

enum SessionEnd {
    Closed(CloseKind),
    Shutdown,
}

pub type EventSink = mpsc::UnboundedSender<PushEvent>;

/// Single live connection per surface.
pub struct PushChannel {
    label: &'static str,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PushChannel {
    pub fn new(label: &'static str) -> Self {
        Self { label, shutdown: None, task: None }
    }

    /// Starts the socket task, closing any connection this channel already holds.
    /// Must be called from within a tokio runtime context.
    pub fn connect(&mut self, url: Url, policy: ReconnectPolicy, sink: EventSink) {
        if self.is_running() {
            info!("[push:{}] closing existing connection", self.label);
        }
        self.disconnect();

        let (tx, rx) = oneshot::channel();
        self.shutdown = Some(tx);
        self.task = Some(tokio::spawn(run(self.label, url, policy, sink, rx)));
    }

    /// Deliberate local close. Sends a normal close frame and never reconnects.
    pub fn disconnect(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.task = None;
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn run(
    label: &'static str,
    url: Url,
    policy: ReconnectPolicy,
    sink: EventSink,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        let kind = match session(label, &url, &sink, &mut shutdown).await {
            SessionEnd::Shutdown => {
                debug!("[push:{}] stopped", label);
                return;
            }
            SessionEnd::Closed(kind) => kind,
        };

        let Some(delay) = policy.after_close(kind) else {
            info!("[push:{}] closed cleanly, not reconnecting", label);
            return;
        };

        info!("[push:{}] connection lost, reconnecting in {:?}", label, delay);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = &mut shutdown => return,
        }
    }
}

async fn session(
    label: &'static str,
    url: &Url,
    sink: &EventSink,
    shutdown: &mut oneshot::Receiver<()>,
) -> SessionEnd {
    info!("[push:{}] connecting to {}", label, url);
    let connecting = connect_async(url.as_str());
    tokio::pin!(connecting);
    let ws_stream = tokio::select! {
        res = &mut connecting => match res {
            Ok((ws, _)) => ws,
            Err(e) => {
                warn!("[push:{}] connect failed: {}", label, e);
                return SessionEnd::Closed(CloseKind::Abnormal);
            }
        },
        _ = &mut *shutdown => {
            // Finish an in-flight handshake so the server still sees a normal close.
            if let Ok(Ok((mut ws, _))) = tokio::time::timeout(HANDSHAKE_GRACE, &mut connecting).await {
                let _ = ws.send(WsMessage::Close(Some(client_close()))).await;
            }
            return SessionEnd::Shutdown;
        }
    };
    info!("[push:{}] connected", label);
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    loop {
        let msg = tokio::select! {
            msg = ws_rx.next() => msg,
            _ = &mut *shutdown => {
                let _ = ws_tx.send(WsMessage::Close(Some(client_close()))).await;
                return SessionEnd::Shutdown;
            }
        };

        match msg {
            Some(Ok(WsMessage::Text(text))) => {
                debug!("[push:{}] event: {}", label, text);
                match PushEvent::decode(&text) {
                    Ok(event) => {
                        if sink.send(event).is_err() {
                            debug!("[push:{}] receiver dropped", label);
                            return SessionEnd::Shutdown;
                        }
                    }
                    Err(e) => warn!("[push:{}] dropping malformed event: {}", label, e),
                }
            }
            Some(Ok(WsMessage::Close(frame))) => {
                let kind = classify_close(frame.as_ref());
                info!("[push:{}] closed by server: {:?} ({:?})", label, frame, kind);
                return SessionEnd::Closed(kind);
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                warn!("[push:{}] socket error: {}", label, e);
                return SessionEnd::Closed(CloseKind::Abnormal);
            }
            None => return SessionEnd::Closed(CloseKind::Abnormal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::Instant;
    use tokio::time::timeout;
    use tokio_tungstenite::accept_async;

    const EVENT: &str = r#"{"type":"conversation_updated","conversation_id":5}"#;

    async fn listener() -> (TcpListener, Url) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = Url::parse(&format!("ws://{}/ws/agent/1", addr)).unwrap();
        (listener, url)
    }

    fn quick() -> ReconnectPolicy {
        ReconnectPolicy::fixed(Duration::from_millis(50))
    }

    async fn close_normally(listener: &TcpListener, before: Option<&str>) {
        let (stream, _) = listener.accept().await.unwrap();
        close_stream_normally(stream, before).await;
    }

    async fn close_stream_normally(stream: TcpStream, before: Option<&str>) {
        let mut ws = accept_async(stream).await.unwrap();
        if let Some(text) = before {
            ws.send(WsMessage::Text(text.to_string())).await.unwrap();
        }
        let frame = CloseFrame { code: CloseCode::Normal, reason: Cow::Borrowed("bye") };
        let _ = ws.close(Some(frame)).await;
        // Drive the handshake until the client answers.
        while let Some(Ok(_)) = ws.next().await {}
    }

    #[test]
    fn policy_schedules_only_after_abnormal_close() {
        let policy = ReconnectPolicy::fixed(Duration::from_secs(3));
        assert_eq!(policy.after_close(CloseKind::Abnormal), Some(Duration::from_secs(3)));
        assert_eq!(policy.after_close(CloseKind::Clean), None);
    }

    #[test]
    fn only_normal_close_code_is_clean() {
        let normal = CloseFrame { code: CloseCode::Normal, reason: Cow::Borrowed("") };
        let away = CloseFrame { code: CloseCode::Error, reason: Cow::Borrowed("") };
        assert_eq!(classify_close(Some(&normal)), CloseKind::Clean);
        assert_eq!(classify_close(Some(&away)), CloseKind::Abnormal);
        assert_eq!(classify_close(None), CloseKind::Abnormal);
    }

    #[tokio::test]
    async fn clean_close_is_not_followed_by_reconnect() {
        let (listener, url) = listener().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut channel = PushChannel::new("test");
        channel.connect(url, quick(), tx);

        close_normally(&listener, Some(EVENT)).await;
        assert!(rx.recv().await.is_some());

        let again = timeout(Duration::from_millis(400), listener.accept()).await;
        assert!(again.is_err(), "client dialled again after a clean close");
    }

    #[tokio::test]
    async fn abnormal_close_reconnects_once_after_delay() {
        let (listener, url) = listener().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let policy = ReconnectPolicy::fixed(Duration::from_millis(200));
        let mut channel = PushChannel::new("test");
        channel.connect(url, policy, tx);

        // First connection: drop the TCP stream without a close handshake.
        let dropped_at = {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = accept_async(stream).await.unwrap();
            drop(ws);
            Instant::now()
        };

        let second = timeout(Duration::from_secs(2), listener.accept()).await;
        let (stream, _) = second.expect("no reconnect after abnormal close").unwrap();
        assert!(
            dropped_at.elapsed() >= policy.delay,
            "reconnected after {:?}, before the {:?} delay",
            dropped_at.elapsed(),
            policy.delay
        );
        close_stream_normally(stream, Some(EVENT)).await;
        let event = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(event.and_then(|e| e.conversation_id()), Some(5));

        let third = timeout(Duration::from_millis(400), listener.accept()).await;
        assert!(third.is_err(), "more than one reconnect was scheduled");
    }

    #[tokio::test]
    async fn malformed_payload_does_not_drop_connection() {
        let (listener, url) = listener().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut channel = PushChannel::new("test");
        channel.connect(url, quick(), tx);

        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(WsMessage::Text("{not json".into())).await.unwrap();
        ws.send(WsMessage::Text(r#"{"type":"mystery"}"#.into())).await.unwrap();
        ws.send(WsMessage::Text(EVENT.into())).await.unwrap();

        let event = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(event, PushEvent::ConversationUpdated { conversation_id: 5 });
        assert!(channel.is_running());
    }

    #[tokio::test]
    async fn reconnecting_during_handshake_closes_the_previous_socket() {
        let (listener, url) = listener().await;
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut channel = PushChannel::new("test");
        channel.connect(url.clone(), quick(), tx.clone());

        let (stream, _) = listener.accept().await.unwrap();
        let mut first = accept_async(stream).await.unwrap();

        // The client may still be reading the handshake response here.
        channel.connect(url, quick(), tx);
        let msg = timeout(Duration::from_secs(1), first.next()).await.unwrap();
        assert!(matches!(msg, Some(Ok(WsMessage::Close(Some(ref f)))) if f.code == CloseCode::Normal));

        let second = timeout(Duration::from_secs(1), listener.accept()).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn disconnect_stops_reconnecting() {
        let (listener, url) = listener().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut channel = PushChannel::new("test");
        channel.connect(url, quick(), tx);

        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(WsMessage::Text(EVENT.into())).await.unwrap();
        timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        channel.disconnect();
        let msg = timeout(Duration::from_secs(1), ws.next()).await.unwrap();
        assert!(matches!(msg, Some(Ok(WsMessage::Close(Some(ref f)))) if f.code == CloseCode::Normal));
        drop(ws);

        let again = timeout(Duration::from_millis(400), listener.accept()).await;
        assert!(again.is_err());
    }
}
