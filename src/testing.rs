//! Scripted collaborators shared by the unit tests

use crate::audio::{AudioFormat, AudioInputDevice, ChannelStream, DeviceArbiter, InputStream};
use crate::auth::{AuthResponse, AuthService, LoginPayload, RegistrationPayload};
use crate::command::recognizer::SpeechRecognizer;
use crate::command::{Navigator, Target};
use crate::error::{Error, Result};
use crate::session::SessionStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Input device that replays fixed chunks on every open
pub struct ScriptedInput {
    chunks: Vec<Vec<u8>>,
    available: bool,
    numbered: bool,
    panic_on_close: bool,
    opens: AtomicUsize,
    closes: Arc<AtomicUsize>,
    watched: Option<DeviceArbiter>,
    held_at_drop: Arc<Mutex<Vec<bool>>>,
}

impl ScriptedInput {
    pub fn with_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            available: true,
            numbered: false,
            panic_on_close: false,
            opens: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            watched: None,
            held_at_drop: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Record whether `arbiter` is still held each time a stream is dropped
    pub fn watching(mut self, arbiter: DeviceArbiter) -> Self {
        self.watched = Some(arbiter);
        self
    }

    /// Streams panic when closed, as a crashed platform worker would
    pub fn panicking_on_close(mut self) -> Self {
        self.panic_on_close = true;
        self
    }

    pub fn held_at_drop(&self) -> Vec<bool> {
        self.held_at_drop.lock().clone()
    }

    /// Every open yields a single chunk `[n, n]` where n is the open count
    pub fn numbered() -> Self {
        Self {
            numbered: true,
            ..Self::with_chunks(Vec::new())
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::with_chunks(Vec::new())
        }
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl AudioInputDevice for ScriptedInput {
    fn name(&self) -> String {
        "scripted".to_string()
    }

    fn open(&self) -> Result<Box<dyn InputStream>> {
        if !self.available {
            return Err(Error::DeviceUnavailable("permission denied".to_string()));
        }
        let n = self.opens.fetch_add(1, Ordering::SeqCst) + 1;

        let (tx, rx) = crossbeam_channel::unbounded();
        if self.numbered {
            let _ = tx.send(vec![n as u8, n as u8]);
        } else {
            for chunk in &self.chunks {
                let _ = tx.send(chunk.clone());
            }
        }

        let format = AudioFormat::Pcm16 {
            sample_rate: 16000,
            channels: 1,
        };
        Ok(Box::new(ScriptedStream {
            inner: ChannelStream::new(format, rx),
            closes: Arc::clone(&self.closes),
            panic_on_close: self.panic_on_close,
            watched: self.watched.clone(),
            held_at_drop: Arc::clone(&self.held_at_drop),
        }))
    }
}

struct ScriptedStream {
    inner: ChannelStream,
    closes: Arc<AtomicUsize>,
    panic_on_close: bool,
    watched: Option<DeviceArbiter>,
    held_at_drop: Arc<Mutex<Vec<bool>>>,
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        if let Some(arbiter) = &self.watched {
            self.held_at_drop.lock().push(arbiter.is_held());
        }
    }
}

impl InputStream for ScriptedStream {
    fn format(&self) -> AudioFormat {
        self.inner.format()
    }

    fn try_next_chunk(&mut self) -> Option<Vec<u8>> {
        self.inner.try_next_chunk()
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_close {
            panic!("capture worker crashed");
        }
        self.inner.close();
    }
}

/// Auth service answering from a queue; an empty queue is a transport error
#[derive(Default)]
pub struct ScriptedAuth {
    responses: Mutex<VecDeque<Result<AuthResponse>>>,
    registrations: Mutex<Vec<RegistrationPayload>>,
    logins: Mutex<Vec<LoginPayload>>,
}

impl ScriptedAuth {
    pub fn with_responses(responses: Vec<Result<AuthResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn register_calls(&self) -> usize {
        self.registrations.lock().len()
    }

    pub fn login_calls(&self) -> usize {
        self.logins.lock().len()
    }

    pub fn last_registration(&self) -> Option<RegistrationPayload> {
        self.registrations.lock().last().cloned()
    }

    pub fn last_login(&self) -> Option<LoginPayload> {
        self.logins.lock().last().cloned()
    }

    fn next(&self) -> Result<AuthResponse> {
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::TransportError("no scripted response".to_string())))
    }
}

#[async_trait]
impl AuthService for ScriptedAuth {
    async fn register(&self, payload: &RegistrationPayload) -> Result<AuthResponse> {
        self.registrations.lock().push(payload.clone());
        self.next()
    }

    async fn authenticate(&self, payload: &LoginPayload) -> Result<AuthResponse> {
        self.logins.lock().push(payload.clone());
        self.next()
    }
}

/// Recognizer answering from a queue, optionally parked until released
pub struct ScriptedRecognizer {
    supported: bool,
    transcripts: Mutex<VecDeque<Result<String>>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedRecognizer {
    pub fn with_transcripts(transcripts: Vec<&str>) -> Self {
        Self {
            supported: true,
            transcripts: Mutex::new(transcripts.into_iter().map(|t| Ok(t.to_string())).collect()),
            gate: None,
        }
    }

    pub fn failing(error: Error) -> Self {
        Self {
            transcripts: Mutex::new(VecDeque::from(vec![Err(error)])),
            ..Self::with_transcripts(Vec::new())
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::with_transcripts(Vec::new())
        }
    }

    /// Each recognition waits for `gate.notify_one()` before answering
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn recognize(&self) -> Result<String> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.transcripts
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::TransportError("no scripted transcript".to_string())))
    }
}

/// Navigator that records every target, and the persisted identifier seen
/// at the moment of navigation when built with [`RecordingNavigator::observing`]
#[derive(Default)]
pub struct RecordingNavigator {
    session: Option<SessionStore>,
    visits: Mutex<Vec<(Target, Option<String>)>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observing(session: SessionStore) -> Self {
        Self {
            session: Some(session),
            visits: Mutex::new(Vec::new()),
        }
    }

    pub fn targets(&self) -> Vec<Target> {
        self.visits.lock().iter().map(|(t, _)| *t).collect()
    }

    pub fn visits(&self) -> Vec<(Target, Option<String>)> {
        self.visits.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: Target) {
        let identifier = self.session.as_ref().and_then(|s| s.identifier());
        self.visits.lock().push((target, identifier));
    }
}

/// One-shot HTTP server on localhost
///
/// Answers the first request with `status` and `body` (as JSON) and resolves
/// the handle to the raw request text.
pub async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request_complete(&request) {
                break;
            }
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).to_string()
    });

    (format!("http://{}", addr), handle)
}

fn request_complete(request: &[u8]) -> bool {
    let Some(header_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
    let body_len = request.len() - (header_end + 4);

    for line in headers.lines() {
        if let Some(value) = line.strip_prefix("content-length:") {
            return value
                .trim()
                .parse::<usize>()
                .map(|expected| body_len >= expected)
                .unwrap_or(true);
        }
    }
    if headers.contains("transfer-encoding: chunked") {
        return request.ends_with(b"0\r\n\r\n");
    }
    true
}
