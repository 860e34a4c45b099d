use super::*;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use ragdesk_core::backend::{ChatReply, StatusQuery, UploadReceipt};
use ragdesk_core::conversation::MessageRole;
use std::collections::VecDeque;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

// ============================================================================
// Mock backend
// ============================================================================

enum ChatScript {
    Chunks(Vec<Vec<u8>>),
    Status(u16, &'static str),
}

/// Pauses a call until the test releases it.
#[derive(Clone, Default)]
struct Gate {
    arrived: Arc<Notify>,
    release: Arc<Notify>,
}

impl Gate {
    async fn pass(&self) {
        self.arrived.notify_one();
        self.release.notified().await;
    }
}

#[derive(Default)]
struct MockBackend {
    chats: StdMutex<VecDeque<ChatScript>>,
    chat_requests: StdMutex<Vec<ChatRequest>>,
    chat_gate: Option<Gate>,
    receipt: StdMutex<Option<UploadReceipt>>,
    upload_gate: Option<Gate>,
    statuses: StdMutex<VecDeque<StatusQuery>>,
    documents: StdMutex<Vec<String>>,
}

impl MockBackend {
    fn with_chats(chats: Vec<ChatScript>) -> Self {
        Self {
            chats: StdMutex::new(chats.into()),
            ..Self::default()
        }
    }

    fn with_documents(self, documents: &[&str]) -> Self {
        *self.documents.lock().unwrap() = documents.iter().map(|d| d.to_string()).collect();
        self
    }

    fn with_upload(self, receipt: UploadReceipt, statuses: Vec<StatusQuery>) -> Self {
        *self.receipt.lock().unwrap() = Some(receipt);
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.chat_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn open_chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.chat_requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.chat_gate {
            gate.pass().await;
        }
        let script = self
            .chats
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ChatScript::Chunks(Vec::new()));
        Ok(match script {
            ChatScript::Chunks(chunks) => {
                let body = stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c)))).boxed();
                ChatReply::streaming(200, body)
            }
            ChatScript::Status(status, body) => ChatReply::buffered(status, body),
        })
    }

    async fn upload(&self, _file: UploadFile) -> Result<UploadReceipt> {
        if let Some(gate) = &self.upload_gate {
            gate.pass().await;
        }
        self.receipt
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RagDeskError::network("connection refused"))
    }

    async fn upload_status(&self, _task_id: &str) -> Result<StatusQuery> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(StatusQuery::NotFound))
    }

    async fn list_upload_tasks(&self) -> Result<HashMap<String, UploadStatusInfo>> {
        Ok(HashMap::new())
    }

    async fn list_documents(&self) -> Result<Vec<String>> {
        Ok(self.documents.lock().unwrap().clone())
    }

    async fn delete_document(&self, filename: &str) -> Result<()> {
        let mut documents = self.documents.lock().unwrap();
        let before = documents.len();
        documents.retain(|d| d != filename);
        if documents.len() == before {
            return Err(RagDeskError::http(404, "document not found"));
        }
        Ok(())
    }

    async fn trigger_ingest(&self) -> Result<String> {
        Ok("Ingested 2 documents".to_string())
    }
}

// ============================================================================
// Mock repository
// ============================================================================

#[derive(Default)]
struct MockRepository {
    stored: StdMutex<Vec<Conversation>>,
    saves: StdMutex<usize>,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
}

impl MockRepository {
    fn stored(&self) -> Vec<Conversation> {
        self.stored.lock().unwrap().clone()
    }

    fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl ConversationRepository for MockRepository {
    async fn load(&self) -> Result<Vec<Conversation>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(RagDeskError::migration("corrupt legacy record"));
        }
        Ok(self.stored())
    }

    async fn save(&self, conversations: &[Conversation]) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RagDeskError::storage("quota exceeded"));
        }
        *self.stored.lock().unwrap() = conversations.to_vec();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }

    async fn upsert(&self, conversation: &Conversation) -> Result<()> {
        let mut stored = self.stored.lock().unwrap();
        stored.retain(|c| c.id != conversation.id);
        stored.insert(0, conversation.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Conversation>> {
        Ok(self.stored().into_iter().find(|c| c.id == id))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut stored = self.stored.lock().unwrap();
        let before = stored.len();
        stored.retain(|c| c.id != id);
        Ok(stored.len() != before)
    }

    async fn search_by_title_prefix(&self, query: &str) -> Result<Vec<Conversation>> {
        Ok(filter_by_title_prefix(self.stored(), query))
    }
}

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    backend: Arc<MockBackend>,
    repository: Arc<MockRepository>,
    controller: Arc<SessionController>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Harness {
    fn new(backend: MockBackend) -> Self {
        Self::with_repository(backend, MockRepository::default())
    }

    fn with_repository(backend: MockBackend, repository: MockRepository) -> Self {
        let backend = Arc::new(backend);
        let repository = Arc::new(repository);
        let (controller, events) =
            SessionController::new(backend.clone(), repository.clone(), &ClientConfig::default());
        Self {
            backend,
            repository,
            controller: Arc::new(controller),
            events,
        }
    }

    fn drain_events(&mut self) -> Vec<SessionEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}

fn chunks_of(text: &str, splits: &[usize]) -> ChatScript {
    let bytes = text.as_bytes();
    let mut chunks = Vec::new();
    let mut start = 0;
    for &end in splits {
        chunks.push(bytes[start..end].to_vec());
        start = end;
    }
    chunks.push(bytes[start..].to_vec());
    ChatScript::Chunks(chunks)
}

fn phases(events: &[SessionEvent]) -> Vec<SessionPhase> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::PhaseChanged(phase) => Some(*phase),
            _ => None,
        })
        .collect()
}

fn found(status: UploadStatus, progress: u8) -> StatusQuery {
    StatusQuery::Found(UploadStatusInfo::new(status).with_progress(progress))
}

fn receipt(task_id: Option<&str>, message: &str) -> UploadReceipt {
    UploadReceipt {
        task_id: task_id.map(str::to_string),
        message: Some(message.to_string()),
    }
}

// ============================================================================
// Send
// ============================================================================

#[tokio::test]
async fn test_first_message_creates_and_persists_conversation() {
    let answer = "안녕하세요! 무엇을 도와드릴까요?";
    let mut harness = Harness::new(MockBackend::with_chats(vec![chunks_of(answer, &[2, 7])]));

    harness.controller.send("안녕").await.unwrap();

    let snapshot = harness.controller.snapshot().await;
    assert_eq!(snapshot.phase, SessionPhase::Idle);
    assert_eq!(snapshot.messages, vec![Message::user("안녕"), Message::model(answer)]);
    assert_eq!(snapshot.conversations.len(), 1);

    let conversation = &snapshot.conversations[0];
    assert_eq!(conversation.title, "안녕");
    assert_eq!(snapshot.active_conversation_id.as_deref(), Some(conversation.id.as_str()));
    assert_eq!(conversation.messages, snapshot.messages);

    // Saved once before streaming and once with the final answer
    assert_eq!(harness.repository.saves(), 2);
    assert_eq!(harness.repository.stored(), snapshot.conversations);

    let requests = harness.backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].contents.len(), 1);
    assert_eq!(requests[0].contents[0].role, MessageRole::User);
    assert_eq!(requests[0].contents[0].parts[0].text, "안녕");
    assert_eq!(requests[0].temperature, 0.1);

    let events = harness.drain_events();
    assert_eq!(
        phases(&events),
        vec![
            SessionPhase::Sending,
            SessionPhase::StreamingResponse,
            SessionPhase::Idle
        ]
    );
    // No snapshot ever showed a broken character
    assert!(events.iter().all(|e| match e {
        SessionEvent::MessagesChanged { messages, .. } =>
            messages.iter().all(|m| !m.text().contains('\u{FFFD}')),
        _ => true,
    }));
}

#[tokio::test]
async fn test_follow_up_sends_cleaned_history() {
    let harness = Harness::new(MockBackend::with_chats(vec![
        chunks_of("Coils.\n<div class='sources'>manual.pdf</div>", &[]),
        chunks_of("Yes.", &[]),
    ]));

    harness.controller.send("How do relays work?").await.unwrap();
    harness.controller.send("Really?").await.unwrap();

    let requests = harness.backend.requests();
    let texts: Vec<&str> = requests[1]
        .contents
        .iter()
        .map(|c| c.parts[0].text.as_str())
        .collect();
    assert_eq!(texts, vec!["How do relays work?", "Coils.", "Really?"]);

    let snapshot = harness.controller.snapshot().await;
    assert_eq!(snapshot.conversations.len(), 1);
    assert_eq!(snapshot.messages.len(), 4);
    assert_eq!(harness.repository.stored()[0].messages, snapshot.messages);
}

#[tokio::test]
async fn test_empty_answer_becomes_warning() {
    let harness = Harness::new(MockBackend::with_chats(vec![ChatScript::Chunks(vec![])]));

    harness.controller.send("anything?").await.unwrap();

    let snapshot = harness.controller.snapshot().await;
    let last = snapshot.messages.last().unwrap();
    assert_eq!(last.text(), EMPTY_ANSWER_NOTICE);
    assert_eq!(last.icon(), Some(MessageIcon::Warning));
    assert_eq!(harness.repository.stored()[0].messages, snapshot.messages);
}

#[tokio::test]
async fn test_backend_error_becomes_error_message() {
    let harness = Harness::new(MockBackend::with_chats(vec![ChatScript::Status(
        503,
        r#"{"detail":"index not ready"}"#,
    )]));

    harness.controller.send("hello").await.unwrap();

    let snapshot = harness.controller.snapshot().await;
    assert_eq!(snapshot.messages.len(), 2);
    let last = snapshot.messages.last().unwrap();
    assert_eq!(last.icon(), Some(MessageIcon::Error));
    assert!(last.text().contains("index not ready"));
    assert!(!last.is_placeholder());
    assert_eq!(harness.repository.stored()[0].messages, snapshot.messages);
    assert_eq!(snapshot.phase, SessionPhase::Idle);
}

#[tokio::test]
async fn test_empty_input_is_rejected() {
    let harness = Harness::new(MockBackend::default());
    let err = harness.controller.send("   ").await.unwrap_err();
    assert!(matches!(err, RagDeskError::InvalidInput(_)));
    assert!(harness.backend.requests().is_empty());
}

#[tokio::test]
async fn test_stale_answer_is_discarded() {
    let gate = Gate::default();
    let backend = MockBackend {
        chat_gate: Some(gate.clone()),
        ..MockBackend::with_chats(vec![chunks_of("late answer", &[])])
    };
    let harness = Harness::new(backend);

    let controller = harness.controller.clone();
    let send = tokio::spawn(async move { controller.send("first question").await });

    gate.arrived.notified().await;
    harness.controller.new_conversation().await;
    gate.release.notify_one();
    send.await.unwrap().unwrap();

    let snapshot = harness.controller.snapshot().await;
    assert!(snapshot.active_conversation_id.is_none());
    assert!(snapshot.messages.is_empty());

    // The old record keeps only what was persisted before the answer arrived
    let stored = harness.repository.stored();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].messages, vec![Message::user("first question")]);
    assert_eq!(snapshot.conversations, stored);
    assert_eq!(snapshot.phase, SessionPhase::Idle);
}

#[tokio::test]
async fn test_second_send_in_same_generation_is_busy() {
    let gate = Gate::default();
    let backend = MockBackend {
        chat_gate: Some(gate.clone()),
        ..MockBackend::with_chats(vec![chunks_of("done", &[])])
    };
    let harness = Harness::new(backend);

    let controller = harness.controller.clone();
    let send = tokio::spawn(async move { controller.send("one").await });
    gate.arrived.notified().await;

    let err = harness.controller.send("two").await.unwrap_err();
    assert!(matches!(err, RagDeskError::Busy(_)));

    gate.release.notify_one();
    send.await.unwrap().unwrap();

    let snapshot = harness.controller.snapshot().await;
    assert_eq!(snapshot.messages, vec![Message::user("one"), Message::model("done")]);
}

#[tokio::test]
async fn test_storage_failure_is_swallowed() {
    let repository = MockRepository::default();
    repository.fail_saves.store(true, Ordering::SeqCst);
    let harness = Harness::with_repository(
        MockBackend::with_chats(vec![chunks_of("still answered", &[])]),
        repository,
    );

    harness.controller.send("question").await.unwrap();

    let snapshot = harness.controller.snapshot().await;
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.conversations[0].messages, snapshot.messages);
    assert!(harness.repository.stored().is_empty());
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_upload_progress_replaces_single_message() {
    let backend = MockBackend::default()
        .with_documents(&["manual.pdf"])
        .with_upload(
            receipt(Some("t-1"), "queued"),
            vec![
                found(UploadStatus::Processing, 30),
                found(UploadStatus::Processing, 80),
                found(UploadStatus::Done, 100),
            ],
        );
    let mut harness = Harness::new(backend);

    harness
        .controller
        .upload(UploadFile::new("manual.pdf", b"%PDF".to_vec()))
        .await
        .unwrap();

    let snapshot = harness.controller.snapshot().await;
    let feed = &snapshot.side_channel;
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0].role, MessageRole::User);
    assert_eq!(feed[1].icon(), Some(MessageIcon::Success));
    assert_eq!(feed[1].text(), "manual.pdf is ready to be searched");
    assert!(feed.iter().all(|m| m.upload_status.is_none()));

    assert_eq!(snapshot.documents, vec!["manual.pdf".to_string()]);
    assert!(snapshot.messages.is_empty());
    assert_eq!(harness.repository.saves(), 0);

    let events = harness.drain_events();
    assert_eq!(phases(&events).first(), Some(&SessionPhase::Uploading));
    assert_eq!(phases(&events).last(), Some(&SessionPhase::Idle));
    let progress_seen: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::SideChannelChanged(feed) => feed
                .iter()
                .find_map(|m| m.upload_status.as_ref())
                .map(|s| s.progress_or_zero()),
            _ => None,
        })
        .collect();
    assert!(progress_seen.contains(&30));
    assert!(progress_seen.contains(&80));
}

#[tokio::test(start_paused = true)]
async fn test_upload_without_task_id() {
    let backend = MockBackend::default()
        .with_documents(&["notes.md"])
        .with_upload(receipt(None, "stored"), vec![]);
    let harness = Harness::new(backend);

    harness
        .controller
        .upload(UploadFile::new("notes.md", b"# notes".to_vec()))
        .await
        .unwrap();

    let snapshot = harness.controller.snapshot().await;
    assert_eq!(snapshot.side_channel.len(), 2);
    assert_eq!(snapshot.side_channel[1].text(), "stored");
    assert_eq!(snapshot.side_channel[1].icon(), Some(MessageIcon::Success));
    assert_eq!(snapshot.documents, vec!["notes.md".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_task_reports_failure() {
    let backend = MockBackend::default().with_upload(receipt(Some("gone"), "queued"), vec![]);
    let harness = Harness::new(backend);

    harness
        .controller
        .upload(UploadFile::new("bundle.zip", vec![0x50, 0x4b]))
        .await
        .unwrap();

    let feed = harness.controller.snapshot().await.side_channel;
    assert_eq!(feed.len(), 2);
    assert!(feed.iter().all(|m| m.upload_status.is_none()));
    assert_eq!(feed[1].icon(), Some(MessageIcon::Error));
    assert!(feed[1].text().contains("not found"));
}

#[tokio::test]
async fn test_upload_failure_is_reported_in_feed() {
    let harness = Harness::new(MockBackend::default());

    harness
        .controller
        .upload(UploadFile::new("manual.pdf", vec![1]))
        .await
        .unwrap();

    let feed = harness.controller.snapshot().await.side_channel;
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[1].icon(), Some(MessageIcon::Error));
}

#[tokio::test]
async fn test_unsupported_upload_is_rejected() {
    let harness = Harness::new(MockBackend::default());
    let err = harness
        .controller
        .upload(UploadFile::new("notes.txt", vec![1, 2, 3]))
        .await
        .unwrap_err();
    assert!(matches!(err, RagDeskError::InvalidInput(_)));
    assert!(harness.controller.snapshot().await.side_channel.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stale_upload_refreshes_documents_but_skips_feed() {
    let gate = Gate::default();
    let backend = MockBackend {
        upload_gate: Some(gate.clone()),
        ..MockBackend::default()
    }
    .with_documents(&["manual.pdf"])
    .with_upload(
        receipt(Some("t-9"), "queued"),
        vec![found(UploadStatus::Done, 100)],
    );
    let harness = Harness::new(backend);

    let controller = harness.controller.clone();
    let upload = tokio::spawn(async move {
        controller
            .upload(UploadFile::new("manual.pdf", vec![1]))
            .await
    });

    gate.arrived.notified().await;
    harness.controller.new_conversation().await;
    gate.release.notify_one();
    upload.await.unwrap().unwrap();

    let snapshot = harness.controller.snapshot().await;
    assert!(snapshot.side_channel.is_empty());
    assert_eq!(snapshot.documents, vec!["manual.pdf".to_string()]);
    assert_eq!(snapshot.phase, SessionPhase::Idle);
}

// ============================================================================
// Deletion, navigation and lifecycle
// ============================================================================

#[tokio::test]
async fn test_delete_document_acknowledges() {
    let mut harness = Harness::new(MockBackend::default().with_documents(&["a.pdf", "b.pdf"]));

    harness.controller.delete_document("a.pdf").await.unwrap();
    assert_eq!(
        harness.controller.snapshot().await.documents,
        vec!["b.pdf".to_string()]
    );

    let err = harness.controller.delete_document("zzz.pdf").await.unwrap_err();
    assert!(err.is_http_not_found());

    let acknowledgements: Vec<AcknowledgementKind> = harness
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            SessionEvent::Acknowledgement { kind, .. } => Some(kind),
            _ => None,
        })
        .collect();
    assert_eq!(
        acknowledgements,
        vec![AcknowledgementKind::Success, AcknowledgementKind::Error]
    );

    let snapshot = harness.controller.snapshot().await;
    assert!(snapshot.conversations.is_empty());
    assert_eq!(snapshot.phase, SessionPhase::Idle);
}

#[tokio::test]
async fn test_delete_active_conversation_resets_view() {
    let harness = Harness::new(MockBackend::with_chats(vec![chunks_of("hi", &[])]));
    harness.controller.send("hello").await.unwrap();
    let id = harness.controller.snapshot().await.conversations[0].id.clone();

    harness.controller.delete_conversation(&id).await.unwrap();

    let snapshot = harness.controller.snapshot().await;
    assert!(snapshot.conversations.is_empty());
    assert!(snapshot.active_conversation_id.is_none());
    assert!(snapshot.messages.is_empty());
    assert!(harness.repository.stored().is_empty());

    let err = harness.controller.delete_conversation(&id).await.unwrap_err();
    assert!(matches!(err, RagDeskError::NotFound { .. }));
}

#[tokio::test]
async fn test_deleting_streaming_conversation_stays_deleted() {
    let gate = Gate::default();
    let backend = MockBackend {
        chat_gate: Some(gate.clone()),
        ..MockBackend::with_chats(vec![chunks_of("an answer nobody reads", &[4])])
    };
    let harness = Harness::new(backend);

    let controller = harness.controller.clone();
    let send = tokio::spawn(async move { controller.send("short lived").await });

    gate.arrived.notified().await;
    let id = harness.controller.snapshot().await.active_conversation_id.unwrap();
    harness.controller.delete_conversation(&id).await.unwrap();
    gate.release.notify_one();
    send.await.unwrap().unwrap();

    let snapshot = harness.controller.snapshot().await;
    assert!(snapshot.conversations.is_empty());
    assert!(snapshot.active_conversation_id.is_none());
    assert!(snapshot.messages.is_empty());
    assert!(harness.repository.stored().is_empty());
    assert_eq!(snapshot.phase, SessionPhase::Idle);
}

#[tokio::test]
async fn test_delete_inactive_conversation_keeps_view() {
    let harness = Harness::new(MockBackend::with_chats(vec![
        chunks_of("a!", &[]),
        chunks_of("b!", &[]),
    ]));
    harness.controller.send("a").await.unwrap();
    let first_id = harness.controller.snapshot().await.active_conversation_id.unwrap();
    harness.controller.new_conversation().await;
    harness.controller.send("b").await.unwrap();

    harness.controller.delete_conversation(&first_id).await.unwrap();

    let snapshot = harness.controller.snapshot().await;
    assert_eq!(snapshot.conversations.len(), 1);
    assert_eq!(snapshot.conversations[0].title, "b");
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(harness.repository.stored(), snapshot.conversations);
}

#[tokio::test]
async fn test_open_and_search_conversations() {
    let harness = Harness::new(MockBackend::with_chats(vec![
        chunks_of("about relays", &[]),
        chunks_of("about motors", &[]),
    ]));
    harness.controller.send("Relay basics").await.unwrap();
    let relay_id = harness.controller.snapshot().await.active_conversation_id.unwrap();
    harness.controller.new_conversation().await;
    harness.controller.send("Motors").await.unwrap();

    let hits = harness.controller.search("relay").await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, relay_id);

    harness.controller.open_conversation(&relay_id).await.unwrap();
    let snapshot = harness.controller.snapshot().await;
    assert_eq!(snapshot.active_conversation_id.as_deref(), Some(relay_id.as_str()));
    assert_eq!(snapshot.messages[1].text(), "about relays");

    let err = harness.controller.open_conversation("missing").await.unwrap_err();
    assert!(matches!(err, RagDeskError::NotFound { .. }));
}

#[tokio::test]
async fn test_init_loads_state() {
    let repository = MockRepository::default();
    let existing = Conversation::create("stored", vec![Message::user("stored")], Utc::now(), &[]);
    *repository.stored.lock().unwrap() = vec![existing.clone()];
    let harness = Harness::with_repository(
        MockBackend::default().with_documents(&["a.pdf"]),
        repository,
    );

    harness.controller.init().await;

    let snapshot = harness.controller.snapshot().await;
    assert_eq!(snapshot.conversations, vec![existing]);
    assert_eq!(snapshot.documents, vec!["a.pdf".to_string()]);
    assert!(snapshot.active_conversation_id.is_none());
}

#[tokio::test]
async fn test_init_survives_load_failure() {
    let repository = MockRepository::default();
    repository.fail_loads.store(true, Ordering::SeqCst);
    let harness = Harness::with_repository(MockBackend::default(), repository);

    harness.controller.init().await;
    assert!(harness.controller.snapshot().await.conversations.is_empty());
}

#[tokio::test]
async fn test_draft_toggles_composing() {
    let harness = Harness::new(MockBackend::default());

    harness.controller.update_draft("hel").await;
    assert_eq!(harness.controller.snapshot().await.phase, SessionPhase::Composing);

    harness.controller.update_draft("").await;
    assert_eq!(harness.controller.snapshot().await.phase, SessionPhase::Idle);
}

#[tokio::test]
async fn test_ingest_refreshes_and_acknowledges() {
    let mut harness = Harness::new(MockBackend::default().with_documents(&["a.pdf", "b.md"]));

    let message = harness.controller.ingest_documents().await.unwrap();
    assert_eq!(message, "Ingested 2 documents");
    assert_eq!(harness.controller.snapshot().await.documents.len(), 2);
    assert!(harness.drain_events().iter().any(|e| matches!(
        e,
        SessionEvent::Acknowledgement {
            kind: AcknowledgementKind::Success,
            ..
        }
    )));
}
