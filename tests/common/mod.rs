//! Channel-driven fakes for the interview machine's collaborators
#![allow(dead_code)]

use mock_interview::session::MachineConfig;
use mock_interview::{
    AnswerSubmission, AudioChunk, CaptureError, ClientError, DeviceHandle, InterviewBackend, InterviewMachine,
    Question, Recorder, Session, SessionStatus, SpeechSegment, SubmitResponse, TranscriptEvent, Transcriber,
    TranscriptionError,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub fn session() -> Session {
    Session {
        session_id: "session_test".to_string(),
        display_name: "Ada".to_string(),
    }
}

pub fn question(id: i64, text: &str) -> Question {
    Question {
        id,
        text: text.to_string(),
    }
}

pub fn two_questions() -> Vec<Question> {
    vec![
        question(1, "Tell me about yourself"),
        question(2, "What are your greatest strengths?"),
    ]
}

// ============================================================================
// Recorder
// ============================================================================

pub struct FakeRecorder {
    arm_result: Result<(), CaptureError>,
    arm_delay: Option<Duration>,
    fragments: Vec<Vec<u8>>,
    flush: Option<Vec<u8>>,
    finish_error: Option<CaptureError>,
    sender: Mutex<Option<(mpsc::Sender<AudioChunk>, u64)>>,
    arm_calls: AtomicUsize,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
}

impl FakeRecorder {
    pub fn new() -> Self {
        Self {
            arm_result: Ok(()),
            arm_delay: None,
            fragments: Vec::new(),
            flush: None,
            finish_error: None,
            sender: Mutex::new(None),
            arm_calls: AtomicUsize::new(0),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
        }
    }

    pub fn denying(error: CaptureError) -> Self {
        Self {
            arm_result: Err(error),
            ..Self::new()
        }
    }

    /// Fragments emitted as soon as capture starts
    pub fn with_fragments(mut self, fragments: &[&[u8]]) -> Self {
        self.fragments = fragments.iter().map(|f| f.to_vec()).collect();
        self
    }

    /// Fragment emitted while stopping, before `stop` resolves
    pub fn with_flush(mut self, data: &[u8]) -> Self {
        self.flush = Some(data.to_vec());
        self
    }

    /// Recordings cannot be assembled into a file
    pub fn failing_finish(mut self, error: CaptureError) -> Self {
        self.finish_error = Some(error);
        self
    }

    pub fn with_arm_delay(mut self, delay: Duration) -> Self {
        self.arm_delay = Some(delay);
        self
    }

    pub fn arm_calls(&self) -> usize {
        self.arm_calls.load(Ordering::SeqCst)
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// Emit a fragment while capturing; a no-op once stopped
    pub async fn emit(&self, data: &[u8]) {
        let next = {
            let mut sender = self.sender.lock().unwrap();
            sender.as_mut().map(|(tx, sequence)| {
                let chunk = AudioChunk {
                    sequence: *sequence,
                    data: data.to_vec(),
                    timestamp_ms: *sequence * 200,
                };
                *sequence += 1;
                (tx.clone(), chunk)
            })
        };
        if let Some((tx, chunk)) = next {
            let _ = tx.send(chunk).await;
        }
    }

    /// Drop the fragment channel as if the device vanished
    pub fn disconnect(&self) {
        self.sender.lock().unwrap().take();
    }
}

#[async_trait::async_trait]
impl Recorder for FakeRecorder {
    async fn arm(&self) -> Result<DeviceHandle, CaptureError> {
        self.arm_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.arm_delay {
            tokio::time::sleep(delay).await;
        }
        self.arm_result.clone().map(|()| DeviceHandle {
            label: "fake microphone".to_string(),
        })
    }

    async fn start(&self, _device: &DeviceHandle) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(64);
        let mut sequence = 0;
        for data in &self.fragments {
            tx.try_send(AudioChunk {
                sequence,
                data: data.clone(),
                timestamp_ms: sequence * 200,
            })
            .unwrap();
            sequence += 1;
        }

        *self.sender.lock().unwrap() = Some((tx, sequence));
        Ok(rx)
    }

    async fn stop(&self, _device: &DeviceHandle) -> Result<(), CaptureError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);

        let sender = self.sender.lock().unwrap().take();
        if let (Some((tx, sequence)), Some(data)) = (sender, &self.flush) {
            let _ = tx
                .send(AudioChunk {
                    sequence,
                    data: data.clone(),
                    timestamp_ms: sequence * 200,
                })
                .await;
        }
        Ok(())
    }

    async fn finish(&self, data: Vec<u8>) -> Result<Vec<u8>, CaptureError> {
        match &self.finish_error {
            Some(error) => Err(error.clone()),
            None => Ok(data),
        }
    }

    fn mime_type(&self) -> &str {
        "audio/webm"
    }

    fn file_extension(&self) -> &str {
        "webm"
    }

    fn name(&self) -> &str {
        "fake recorder"
    }
}

// ============================================================================
// Transcriber
// ============================================================================

pub struct FakeTranscriber {
    unsupported: bool,
    flush: Vec<SpeechSegment>,
    sender: Mutex<Option<mpsc::Sender<TranscriptEvent>>>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
}

impl FakeTranscriber {
    pub fn new() -> Self {
        Self {
            unsupported: false,
            flush: Vec::new(),
            sender: Mutex::new(None),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            unsupported: true,
            ..Self::new()
        }
    }

    /// Segments finalized while stopping, before `stop` resolves
    pub fn with_flush(mut self, segments: Vec<SpeechSegment>) -> Self {
        self.flush = segments;
        self
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// Emit an event while running; a no-op once stopped
    pub async fn emit(&self, event: TranscriptEvent) {
        let tx = self.sender.lock().unwrap().clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }
}

#[async_trait::async_trait]
impl Transcriber for FakeTranscriber {
    async fn start(&self) -> Result<mpsc::Receiver<TranscriptEvent>, TranscriptionError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.unsupported {
            return Err(TranscriptionError::Unsupported);
        }

        let (tx, rx) = mpsc::channel(64);
        *self.sender.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn stop(&self) -> Result<(), TranscriptionError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);

        let sender = self.sender.lock().unwrap().take();
        if let Some(tx) = sender {
            if !self.flush.is_empty() {
                let _ = tx.send(TranscriptEvent::Results(self.flush.clone())).await;
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "fake transcriber"
    }
}

// ============================================================================
// Backend
// ============================================================================

pub struct FakeBackend {
    questions: Vec<Question>,
    cursor: Mutex<usize>,
    fetch_errors: Mutex<VecDeque<ClientError>>,
    submit_replies: Mutex<VecDeque<Result<SubmitResponse, ClientError>>>,
    skip_errors: Mutex<VecDeque<ClientError>>,
    submissions: Mutex<Vec<AnswerSubmission>>,
    fetch_calls: AtomicUsize,
    skip_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            cursor: Mutex::new(0),
            fetch_errors: Mutex::new(VecDeque::new()),
            submit_replies: Mutex::new(VecDeque::new()),
            skip_errors: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
            fetch_calls: AtomicUsize::new(0),
            skip_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_next_fetch(&self, error: ClientError) {
        self.fetch_errors.lock().unwrap().push_back(error);
    }

    pub fn fail_next_skip(&self, error: ClientError) {
        self.skip_errors.lock().unwrap().push_back(error);
    }

    pub fn reply_to_next_submit(&self, reply: Result<SubmitResponse, ClientError>) {
        self.submit_replies.lock().unwrap().push_back(reply);
    }

    pub fn submissions(&self) -> Vec<AnswerSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn skip_calls(&self) -> usize {
        self.skip_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl InterviewBackend for FakeBackend {
    async fn login(&self, name: &str) -> Result<Session, ClientError> {
        Ok(Session {
            session_id: "session_test".to_string(),
            display_name: name.to_string(),
        })
    }

    async fn fetch_next_question(&self, _session: &Session) -> Result<Option<Question>, ClientError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.fetch_errors.lock().unwrap().pop_front() {
            return Err(error);
        }
        let cursor = *self.cursor.lock().unwrap();
        Ok(self.questions.get(cursor).cloned())
    }

    async fn submit_answer(
        &self,
        _session: &Session,
        answer: AnswerSubmission,
    ) -> Result<SubmitResponse, ClientError> {
        self.submissions.lock().unwrap().push(answer);

        let reply = self.submit_replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(SubmitResponse {
                status: "ok".to_string(),
                message: Some("Answer recorded successfully".to_string()),
                scores: Default::default(),
            })
        });

        if matches!(&reply, Ok(response) if response.is_ok()) {
            *self.cursor.lock().unwrap() += 1;
        }
        reply
    }

    async fn skip_question(&self, _session: &Session) -> Result<(), ClientError> {
        self.skip_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.skip_errors.lock().unwrap().pop_front() {
            return Err(error);
        }
        *self.cursor.lock().unwrap() += 1;
        Ok(())
    }
}

// ============================================================================
// Driving the machine
// ============================================================================

pub fn machine(
    backend: &Arc<FakeBackend>,
    recorder: &Arc<FakeRecorder>,
    transcriber: &Arc<FakeTranscriber>,
) -> InterviewMachine {
    InterviewMachine::new(
        session(),
        MachineConfig::default(),
        backend.clone(),
        recorder.clone(),
        transcriber.clone(),
    )
}

/// Apply internal events until the machine reaches `status`
pub async fn step_until(machine: &mut InterviewMachine, status: SessionStatus) {
    for _ in 0..32 {
        if machine.status() == status {
            return;
        }
        tokio::time::timeout(Duration::from_secs(5), machine.step())
            .await
            .unwrap_or_else(|_| panic!("stalled in {:?} waiting for {:?}", machine.status(), status));
    }
    panic!("never reached {:?}, stuck in {:?}", status, machine.status());
}

/// Apply internal events until none is ready
pub async fn settle(machine: &mut InterviewMachine) {
    while tokio::time::timeout(Duration::from_millis(10), machine.step())
        .await
        .is_ok()
    {}
}

/// Serve `router` on an ephemeral local port, returning its base URL
pub async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
