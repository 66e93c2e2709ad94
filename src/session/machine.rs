use futures::future::BoxFuture;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, Interval};
use tracing::{debug, error, info, warn};

use super::config::MachineConfig;
use super::model::{Feedback, Question, Session};
use super::view::{
    format_elapsed, Actions, DisplayState, RecordingStatus, RecordingView, SessionStatus, ViewModel,
};
use crate::audio::{AudioChunk, CaptureError, ChunkCollector, DeviceHandle, Recorder};
use crate::client::{AnswerSubmission, ClientError, InterviewBackend, SubmitResponse};
use crate::error::InterviewError;
use crate::transcription::{TranscriptAccumulator, TranscriptEvent, Transcriber};

/// Something the participant asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Start,
    Stop,
    Skip,
    Next,
    Retry,
    CancelPermission,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Skip => "skip",
            Self::Next => "next",
            Self::Retry => "retry",
            Self::CancelPermission => "cancel",
        }
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "skip" => Ok(Self::Skip),
            "next" => Ok(Self::Next),
            "retry" => Ok(Self::Retry),
            "cancel" => Ok(Self::CancelPermission),
            other => Err(format!("unknown intent: {}", other)),
        }
    }
}

/// What a `Loading` state is waiting on
#[derive(Debug)]
enum Loading {
    Fetching,
    /// Skip request in flight; the question is restored if it fails
    Skipping(Question),
}

/// Audio and transcript of the answer being recorded
#[derive(Debug, Default)]
struct Capture {
    chunks: ChunkCollector,
    transcript: TranscriptAccumulator,
    elapsed_seconds: u64,
}

/// A stopped recording on its way to the backend
#[derive(Debug)]
struct FrozenAnswer {
    chunk_count: usize,
    transcript: String,
}

#[derive(Debug)]
enum Phase {
    Loading(Loading),
    AwaitingAnswer(Question),
    AwaitingPermission(Question),
    Recording(Question, Capture),
    Stopping(Question),
    Submitting(Question, FrozenAnswer),
    ShowingFeedback(Question, Feedback),
    Completed,
}

impl Phase {
    fn status(&self) -> SessionStatus {
        match self {
            Self::Loading(_) => SessionStatus::Loading,
            Self::AwaitingAnswer(_) => SessionStatus::AwaitingAnswer,
            Self::AwaitingPermission(_) => SessionStatus::AwaitingPermission,
            Self::Recording(..) => SessionStatus::Recording,
            Self::Stopping(_) => SessionStatus::Stopping,
            Self::Submitting(..) => SessionStatus::Submitting,
            Self::ShowingFeedback(..) => SessionStatus::ShowingFeedback,
            Self::Completed => SessionStatus::Completed,
        }
    }
}

/// Live event sources owned by the `Recording` state
struct CaptureStreams {
    audio: Option<mpsc::Receiver<AudioChunk>>,
    transcript: Option<mpsc::Receiver<TranscriptEvent>>,
    ticker: Interval,
}

/// Result of an asynchronous operation started by a transition
enum Outcome {
    Fetched(Result<Option<Question>, ClientError>),
    Armed(Result<DeviceHandle, CaptureError>),
    Submitted {
        result: Result<SubmitResponse, ClientError>,
        transcript: String,
    },
    Skipped(Result<(), ClientError>),
}

struct InFlight {
    epoch: u64,
    op: BoxFuture<'static, Outcome>,
}

enum Event {
    Completed { epoch: u64, outcome: Outcome },
    Audio(Option<AudioChunk>),
    Transcript(Option<TranscriptEvent>),
    Tick,
}

/// Drives one participant through the interview.
///
/// All transitions happen on the task that owns the machine, one at a time.
/// Every transition bumps an epoch; the in-flight operation, capture streams
/// and timer belong to the state that created them and are dropped when it
/// is left, so a late completion can never touch a newer state.
pub struct InterviewMachine {
    session: Session,
    config: MachineConfig,
    backend: Arc<dyn InterviewBackend>,
    recorder: Arc<dyn Recorder>,
    transcriber: Arc<dyn Transcriber>,

    phase: Phase,
    error: Option<InterviewError>,
    epoch: u64,

    /// Granted microphone access, reused for every recording
    device: Option<DeviceHandle>,
    in_flight: Option<InFlight>,
    streams: Option<CaptureStreams>,

    view_tx: watch::Sender<ViewModel>,
}

impl InterviewMachine {
    /// Create a machine for `session`. It starts in `Loading` with the first
    /// question fetch already issued.
    pub fn new(
        session: Session,
        config: MachineConfig,
        backend: Arc<dyn InterviewBackend>,
        recorder: Arc<dyn Recorder>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        info!(
            "Starting interview for {} ({}) with {} and {}",
            session.display_name,
            session.session_id,
            recorder.name(),
            transcriber.name()
        );

        let (view_tx, _) = watch::channel(ViewModel {
            status: SessionStatus::Loading,
            participant: session.display_name.clone(),
            display: DisplayState::Loading,
            recording: RecordingView::idle(),
            error: None,
            actions: Actions::default(),
        });

        let mut machine = Self {
            session,
            config,
            backend,
            recorder,
            transcriber,
            phase: Phase::Loading(Loading::Fetching),
            error: None,
            epoch: 0,
            device: None,
            in_flight: None,
            streams: None,
            view_tx,
        };
        machine.begin_fetch();
        machine
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.phase.status()
    }

    pub fn error(&self) -> Option<&InterviewError> {
        self.error.as_ref()
    }

    /// Question currently on screen or being answered
    pub fn question(&self) -> Option<&Question> {
        match &self.phase {
            Phase::AwaitingAnswer(q)
            | Phase::AwaitingPermission(q)
            | Phase::Recording(q, _)
            | Phase::Stopping(q)
            | Phase::Submitting(q, _) => Some(q),
            _ => None,
        }
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        match &self.phase {
            Phase::ShowingFeedback(_, feedback) => Some(feedback),
            _ => None,
        }
    }

    /// Whether microphone access has been granted
    pub fn is_armed(&self) -> bool {
        self.device.is_some()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        match &self.phase {
            Phase::Recording(_, capture) => capture.elapsed_seconds,
            _ => 0,
        }
    }

    pub fn audio_chunks(&self) -> &[AudioChunk] {
        match &self.phase {
            Phase::Recording(_, capture) => capture.chunks.chunks(),
            _ => &[],
        }
    }

    pub fn live_transcript(&self) -> String {
        match &self.phase {
            Phase::Recording(_, capture) => capture.transcript.live_transcript(),
            Phase::Submitting(_, answer) => answer.transcript.clone(),
            _ => String::new(),
        }
    }

    /// Watch the view-model; a new value is published after every change
    pub fn subscribe(&self) -> watch::Receiver<ViewModel> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> ViewModel {
        let recording = match &self.phase {
            Phase::AwaitingPermission(_) => RecordingView {
                status: RecordingStatus::AwaitingPermission,
                ..RecordingView::idle()
            },
            Phase::Recording(_, capture) => RecordingView {
                status: RecordingStatus::Recording,
                elapsed_seconds: capture.elapsed_seconds,
                elapsed_label: format_elapsed(capture.elapsed_seconds),
                chunk_count: capture.chunks.len(),
                live_transcript: capture.transcript.live_transcript(),
                interim_transcript: capture.transcript.interim().to_string(),
            },
            Phase::Stopping(_) => RecordingView {
                status: RecordingStatus::Stopping,
                ..RecordingView::idle()
            },
            Phase::Submitting(_, answer) => RecordingView {
                chunk_count: answer.chunk_count,
                live_transcript: answer.transcript.clone(),
                ..RecordingView::idle()
            },
            _ => RecordingView::idle(),
        };

        let display = match &self.phase {
            Phase::Loading(_) => DisplayState::Loading,
            Phase::ShowingFeedback(question, feedback) => DisplayState::Feedback {
                question_id: question.id,
                feedback: feedback.clone(),
            },
            Phase::Completed => DisplayState::Completed,
            _ => match self.question() {
                Some(question) => DisplayState::Question { question: question.clone() },
                None => DisplayState::Loading,
            },
        };

        let actions = Actions {
            start: matches!(self.phase, Phase::AwaitingAnswer(_)),
            stop: matches!(self.phase, Phase::Recording(..)),
            skip: matches!(self.phase, Phase::AwaitingAnswer(_) | Phase::Recording(..)),
            next: matches!(self.phase, Phase::ShowingFeedback(..)),
            retry: matches!(self.phase, Phase::Loading(Loading::Fetching)) && self.in_flight.is_none(),
            cancel: matches!(self.phase, Phase::AwaitingPermission(_)),
        };

        ViewModel {
            status: self.phase.status(),
            participant: self.session.display_name.clone(),
            display,
            recording,
            error: self.error.as_ref().map(|e| e.to_string()),
            actions,
        }
    }

    /// Run until the intent channel closes
    pub async fn run(mut self, mut intents: mpsc::Receiver<Intent>) {
        info!("Interview loop started");

        loop {
            tokio::select! {
                intent = intents.recv() => match intent {
                    Some(intent) => {
                        if let Err(e) = self.handle_intent(intent).await {
                            warn!("Rejected intent: {}", e);
                        }
                    }
                    None => break,
                },
                event = self.next_event() => self.handle_event(event).await,
            }
        }

        self.shutdown().await;
        info!("Interview loop stopped");
    }

    /// Wait for and apply exactly one internal event (request completion,
    /// audio fragment, transcript event or timer tick).
    ///
    /// Never resolves if nothing is in flight and nothing is being captured.
    pub async fn step(&mut self) {
        let event = self.next_event().await;
        self.handle_event(event).await;
    }

    /// Validate `intent` against the current state and act on it
    pub async fn handle_intent(&mut self, intent: Intent) -> Result<(), InterviewError> {
        debug!("Intent '{}' in {}", intent.as_str(), self.phase.status().as_str());

        match (intent, &self.phase) {
            (Intent::Start, Phase::AwaitingAnswer(question)) => {
                let question = question.clone();
                match self.device.clone() {
                    Some(device) => self.begin_recording(question, device).await,
                    None => self.request_permission(question),
                }
            }
            (Intent::CancelPermission, Phase::AwaitingPermission(question)) => {
                info!("Microphone permission request cancelled");
                let question = question.clone();
                self.enter(Phase::AwaitingAnswer(question));
            }
            (Intent::Stop, Phase::Recording(..)) => self.stop_and_submit().await,
            (Intent::Skip, Phase::AwaitingAnswer(question)) => {
                let question = question.clone();
                self.begin_skip(question);
            }
            (Intent::Skip, Phase::Recording(..)) => {
                info!("Skipping while recording, discarding the capture");
                if let Some((question, _discarded)) = self.teardown_capture().await {
                    self.begin_skip(question);
                }
            }
            (Intent::Next, Phase::ShowingFeedback(..)) => self.begin_fetch(),
            (Intent::Retry, Phase::Loading(Loading::Fetching)) if self.in_flight.is_none() => {
                self.begin_fetch()
            }
            (intent, phase) => {
                return Err(InterviewError::InvalidIntent {
                    intent: intent.as_str().to_string(),
                    state: phase.status().as_str().to_string(),
                });
            }
        }

        Ok(())
    }

    async fn next_event(&mut self) -> Event {
        let in_flight = &mut self.in_flight;
        let (audio, transcript, ticker) = match &mut self.streams {
            Some(streams) => (
                streams.audio.as_mut(),
                streams.transcript.as_mut(),
                Some(&mut streams.ticker),
            ),
            None => (None, None, None),
        };

        let event = tokio::select! {
            biased;
            (epoch, outcome) = poll_in_flight(in_flight) => Event::Completed { epoch, outcome },
            chunk = recv_or_pending(audio) => Event::Audio(chunk),
            event = recv_or_pending(transcript) => Event::Transcript(event),
            _ = tick_or_pending(ticker) => Event::Tick,
        };

        if matches!(event, Event::Completed { .. }) {
            // A finished future must not be polled again
            self.in_flight = None;
        }

        event
    }

    async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Completed { epoch, outcome } => {
                if epoch != self.epoch {
                    debug!("Ignoring completion from epoch {} (now {})", epoch, self.epoch);
                    return;
                }
                self.apply_outcome(outcome).await;
            }
            Event::Audio(Some(chunk)) => {
                if let Phase::Recording(_, capture) = &mut self.phase {
                    if capture.chunks.push(chunk) {
                        self.publish();
                    }
                }
            }
            Event::Audio(None) => {
                warn!("Audio capture ended while recording");
                if let Some(streams) = &mut self.streams {
                    streams.audio = None;
                }
                self.overlay(InterviewError::DeviceUnavailable(
                    "capture ended unexpectedly".to_string(),
                ));
            }
            Event::Transcript(Some(TranscriptEvent::Results(batch))) => {
                if let Phase::Recording(_, capture) = &mut self.phase {
                    capture.transcript.apply(&batch);
                    self.publish();
                }
            }
            Event::Transcript(Some(TranscriptEvent::Error(reason))) => {
                warn!("Speech recognition error: {}", reason);
                self.overlay(InterviewError::TranscriptionRuntimeError(reason));
            }
            Event::Transcript(None) => {
                debug!("Transcript stream closed");
                if let Some(streams) = &mut self.streams {
                    streams.transcript = None;
                }
            }
            Event::Tick => {
                if let Phase::Recording(_, capture) = &mut self.phase {
                    capture.elapsed_seconds += 1;
                    self.publish();
                }
            }
        }
    }

    async fn apply_outcome(&mut self, outcome: Outcome) {
        match (outcome, &self.phase) {
            (Outcome::Fetched(Ok(Some(question))), Phase::Loading(Loading::Fetching)) => {
                info!("Question {}: {}", question.id, question.text);
                self.enter(Phase::AwaitingAnswer(question));
            }
            (Outcome::Fetched(Ok(None)), Phase::Loading(Loading::Fetching)) => {
                info!("Interview completed for {}", self.session.display_name);
                self.enter(Phase::Completed);
            }
            (Outcome::Fetched(Err(e)), Phase::Loading(Loading::Fetching)) => {
                error!("Failed to fetch question: {}", e);
                self.fail(Phase::Loading(Loading::Fetching), e.into());
            }

            (Outcome::Armed(Ok(device)), Phase::AwaitingPermission(question)) => {
                info!("Microphone access granted: {}", device.label);
                let question = question.clone();
                self.device = Some(device.clone());
                self.begin_recording(question, device).await;
            }
            (Outcome::Armed(Err(e)), Phase::AwaitingPermission(question)) => {
                warn!("Microphone access failed: {}", e);
                let question = question.clone();
                self.fail(Phase::AwaitingAnswer(question), e.into());
            }

            (Outcome::Submitted { result, transcript }, Phase::Submitting(question, _)) => {
                let question = question.clone();
                match result {
                    Ok(response) if response.is_ok() => {
                        info!("Answer to question {} accepted", question.id);
                        let feedback = Feedback {
                            message: response
                                .message
                                .unwrap_or_else(|| "Answer recorded successfully".to_string()),
                            transcript,
                            scores: response.scores,
                        };
                        self.enter(Phase::ShowingFeedback(question, feedback));
                    }
                    Ok(response) => {
                        warn!("Answer rejected with status '{}'", response.status);
                        let detail = response
                            .message
                            .unwrap_or_else(|| "Failed to process answer".to_string());
                        self.fail(Phase::AwaitingAnswer(question), InterviewError::ServerRejected(detail));
                    }
                    Err(e) => {
                        // The recorded answer is dropped; the participant records again
                        error!("Failed to submit answer: {}", e);
                        self.fail(Phase::AwaitingAnswer(question), e.into());
                    }
                }
            }

            (Outcome::Skipped(Ok(())), Phase::Loading(Loading::Skipping(question))) => {
                info!("Skipped question {}", question.id);
                self.begin_fetch();
            }
            (Outcome::Skipped(Err(e)), Phase::Loading(Loading::Skipping(question))) => {
                error!("Failed to skip question: {}", e);
                let question = question.clone();
                self.fail(Phase::AwaitingAnswer(question), e.into());
            }

            (_, phase) => {
                warn!("Dropping completion that does not match {}", phase.status().as_str());
            }
        }
    }

    fn request_permission(&mut self, question: Question) {
        info!("Requesting microphone access from {}", self.recorder.name());
        self.enter(Phase::AwaitingPermission(question));

        let recorder = Arc::clone(&self.recorder);
        self.issue(async move { Outcome::Armed(recorder.arm().await) });
    }

    async fn begin_recording(&mut self, question: Question, device: DeviceHandle) {
        let audio = match self.recorder.start(&device).await {
            Ok(rx) => rx,
            Err(e) => {
                error!("Failed to start capture on {}: {}", device.label, e);
                // Re-arm on the next attempt
                self.device = None;
                self.fail(Phase::AwaitingAnswer(question), e.into());
                return;
            }
        };

        let (transcript, notice) = match self.transcriber.start().await {
            Ok(rx) => (Some(rx), None),
            Err(e) => {
                warn!("Live transcription unavailable ({}), recording audio only", e);
                (None, Some(InterviewError::from(e)))
            }
        };

        let period = self.config.tick_interval;
        self.streams = Some(CaptureStreams {
            audio: Some(audio),
            transcript,
            ticker: interval_at(Instant::now() + period, period),
        });

        info!("Recording answer to question {}", question.id);
        self.enter(Phase::Recording(question, Capture::default()));

        if let Some(notice) = notice {
            self.overlay(notice);
        }
    }

    /// Two-phase stop: signal both adapters, wait for both, then collect what
    /// they emitted before acknowledging and freeze it.
    ///
    /// Leaves the machine in `Stopping`; the caller picks the next state.
    async fn teardown_capture(&mut self) -> Option<(Question, Capture)> {
        let (question, mut capture) = match &mut self.phase {
            Phase::Recording(question, capture) => (question.clone(), std::mem::take(capture)),
            _ => return None,
        };

        let streams = self.streams.take();
        self.enter(Phase::Stopping(question.clone()));

        let recorder = Arc::clone(&self.recorder);
        let transcriber = Arc::clone(&self.transcriber);
        let device = self.device.clone();

        let (recorder_result, transcriber_result) = tokio::join!(
            async move {
                match device {
                    Some(device) => recorder.stop(&device).await,
                    None => Ok(()),
                }
            },
            transcriber.stop(),
        );

        if let Err(e) = recorder_result {
            warn!("Recorder did not stop cleanly: {}", e);
            if matches!(e, CaptureError::DeviceUnavailable(_)) {
                self.device = None;
            }
        }
        if let Err(e) = transcriber_result {
            warn!("Transcriber did not stop cleanly: {}", e);
        }

        if let Some(mut streams) = streams {
            if let Some(mut audio) = streams.audio.take() {
                while let Ok(chunk) = audio.try_recv() {
                    capture.chunks.push(chunk);
                }
            }
            if let Some(mut transcript) = streams.transcript.take() {
                while let Ok(event) = transcript.try_recv() {
                    if let TranscriptEvent::Results(batch) = event {
                        capture.transcript.apply(&batch);
                    }
                }
            }
        }

        capture.chunks.freeze();

        debug!(
            "Capture frozen: {} fragments, {} bytes, {} finalized segments",
            capture.chunks.len(),
            capture.chunks.total_bytes(),
            capture.transcript.finalized_count()
        );

        Some((question, capture))
    }

    async fn stop_and_submit(&mut self) {
        let Some((question, capture)) = self.teardown_capture().await else {
            return;
        };

        let transcript = capture.transcript.live_transcript();
        let chunks = capture.chunks.into_chunks();
        let fragments: Vec<u8> = chunks.iter().flat_map(|c| c.data.iter().copied()).collect();

        let audio = match self.recorder.finish(fragments).await {
            Ok(audio) => audio,
            Err(e) => {
                error!("Failed to assemble recorded answer: {}", e);
                self.fail(Phase::AwaitingAnswer(question), e.into());
                return;
            }
        };

        info!(
            "Submitting answer to question {} ({} fragments, {} bytes)",
            question.id,
            chunks.len(),
            audio.len()
        );

        let answer = AnswerSubmission {
            audio,
            mime_type: self.recorder.mime_type().to_string(),
            file_name: format!("{}.{}", self.config.answer_file_stem, self.recorder.file_extension()),
            transcript: transcript.clone(),
        };

        self.enter(Phase::Submitting(
            question,
            FrozenAnswer {
                chunk_count: chunks.len(),
                transcript: transcript.clone(),
            },
        ));

        let backend = Arc::clone(&self.backend);
        let session = self.session.clone();
        self.issue(async move {
            Outcome::Submitted {
                result: backend.submit_answer(&session, answer).await,
                transcript,
            }
        });
    }

    fn begin_skip(&mut self, question: Question) {
        info!("Skipping question {}", question.id);
        self.enter(Phase::Loading(Loading::Skipping(question)));

        let backend = Arc::clone(&self.backend);
        let session = self.session.clone();
        self.issue(async move { Outcome::Skipped(backend.skip_question(&session).await) });
    }

    fn begin_fetch(&mut self) {
        self.enter(Phase::Loading(Loading::Fetching));

        let backend = Arc::clone(&self.backend);
        let session = self.session.clone();
        self.issue(async move { Outcome::Fetched(backend.fetch_next_question(&session).await) });
    }

    /// Attach an operation to the current state
    fn issue(&mut self, op: impl Future<Output = Outcome> + Send + 'static) {
        self.in_flight = Some(InFlight {
            epoch: self.epoch,
            op: Box::pin(op),
        });
    }

    /// Successful transition: drops whatever the old state owned and clears
    /// the error overlay
    fn enter(&mut self, phase: Phase) {
        debug!("{} -> {}", self.phase.status().as_str(), phase.status().as_str());

        if !matches!(phase, Phase::Recording(..)) {
            self.streams = None;
        }
        self.in_flight = None;
        self.epoch += 1;
        self.phase = phase;
        self.error = None;
        self.publish();
    }

    /// Transition to a safe state and show `error`
    fn fail(&mut self, phase: Phase, error: InterviewError) {
        self.enter(phase);
        self.overlay(error);
    }

    /// Show `error` without changing state
    fn overlay(&mut self, error: InterviewError) {
        self.error = Some(error);
        self.publish();
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view());
    }

    async fn shutdown(&mut self) {
        if matches!(self.phase, Phase::Recording(..)) {
            info!("Stopping capture before shutdown");
            self.teardown_capture().await;
        }
        self.in_flight = None;
    }
}

async fn poll_in_flight(slot: &mut Option<InFlight>) -> (u64, Outcome) {
    match slot {
        Some(in_flight) => {
            let outcome = (&mut in_flight.op).await;
            (in_flight.epoch, outcome)
        }
        None => std::future::pending().await,
    }
}

async fn recv_or_pending<T>(rx: Option<&mut mpsc::Receiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn tick_or_pending(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
