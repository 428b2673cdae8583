//! End-to-end tests against a stub backend.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Multipart, Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::api::{ChatApi, HttpApi, UploadFile};
use crate::auth::StaticToken;
use crate::errors::ApiError;
use crate::models::{ChatRoom, Message, MessageEntry, PodcastStatus, Role, UploadStatus};
use crate::scheduler::RecordingScheduler;
use crate::store::{Store, StoreSettings};

const TOKEN: &str = "test-token";
const AUDIO: &[u8] = b"ID3\x04\x00fake-mp3-frames";

/// Recorded upload: file name, content type, size.
type UploadRecord = (String, Option<String>, usize);

/// In-memory stand-in for the backend.
#[derive(Default)]
struct Backend {
    base_url: String,
    rooms: Vec<ChatRoom>,
    messages: HashMap<String, Vec<Message>>,
    /// Rooms published once their document reports COMPLETED
    pending_rooms: HashMap<String, ChatRoom>,
    document_statuses: VecDeque<String>,
    podcast_statuses: VecDeque<String>,
    uploads: Vec<UploadRecord>,
    podcast_requests: Vec<String>,
}

type Shared = Arc<Mutex<Backend>>;

fn stub_room(id: &str, title: &str, document_id: &str) -> ChatRoom {
    ChatRoom {
        id: id.to_string(),
        title: title.to_string(),
        user_id: "user-1".to_string(),
        document_id: document_id.to_string(),
        created_at: "2024-05-01T10:00:00Z".to_string(),
        updated_at: "2024-05-01T10:00:00Z".to_string(),
    }
}

async fn require_bearer(request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "));

    if token == Some(TOKEN) {
        next.run(request).await
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response()
    }
}

async fn list_rooms(State(backend): State<Shared>) -> Json<Vec<ChatRoom>> {
    Json(backend.lock().unwrap().rooms.clone())
}

async fn list_messages(
    State(backend): State<Shared>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, StatusCode> {
    let backend = backend.lock().unwrap();
    if !backend.rooms.iter().any(|r| r.id == id) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(backend.messages.get(&id).cloned().unwrap_or_default()))
}

async fn post_message(
    State(backend): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Message>, StatusCode> {
    let text = body["message"].as_str().ok_or(StatusCode::BAD_REQUEST)?;
    let mut backend = backend.lock().unwrap();
    let history = backend.messages.entry(id.clone()).or_default();

    let now = "2024-05-01T10:05:00Z";
    let n = history.len();
    let user = Message::local(format!("msg-{}", n + 1), &id, Role::User, text, now);
    let reply = Message::local(
        format!("msg-{}", n + 2),
        &id,
        Role::Assistant,
        &format!("You asked: {}", text),
        now,
    );
    history.push(user);
    history.push(reply.clone());
    Ok(Json(reply))
}

async fn upload(
    State(backend): State<Shared>,
    mut multipart: Multipart,
) -> Result<Json<Value>, StatusCode> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        if field.name() != Some("pdf") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;

        let mut backend = backend.lock().unwrap();
        let n = backend.uploads.len() + 1;
        let document_id = format!("doc-{}", n);
        let room = stub_room(&format!("room-{}", n), &file_name, &document_id);
        backend.pending_rooms.insert(document_id.clone(), room);
        backend.uploads.push((file_name, content_type, data.len()));

        return Ok(Json(json!({ "documentId": document_id })));
    }
    Err(StatusCode::BAD_REQUEST)
}

async fn document_status(State(backend): State<Shared>, Path(id): Path<String>) -> Json<Value> {
    let mut backend = backend.lock().unwrap();
    let status = backend
        .document_statuses
        .pop_front()
        .unwrap_or_else(|| "COMPLETED".to_string());
    if status == "COMPLETED" {
        if let Some(room) = backend.pending_rooms.remove(&id) {
            backend.rooms.insert(0, room);
        }
    }
    Json(json!({ "status": status }))
}

async fn start_podcast(State(backend): State<Shared>, Path(id): Path<String>) -> StatusCode {
    backend.lock().unwrap().podcast_requests.push(id);
    StatusCode::ACCEPTED
}

async fn podcast_status(State(backend): State<Shared>, Path(id): Path<String>) -> Json<Value> {
    let mut backend = backend.lock().unwrap();
    let status = backend
        .podcast_statuses
        .pop_front()
        .unwrap_or_else(|| "COMPLETED".to_string());
    let url = (status == "COMPLETED").then(|| format!("{}/files/{}.mp3", backend.base_url, id));
    Json(json!({ "status": status, "url": url }))
}

async fn podcast_file(Path(name): Path<String>) -> Response {
    if name == "broken.mp3" {
        // Connection drops after the first chunk
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(AUDIO.to_vec()),
            Err(std::io::Error::new(std::io::ErrorKind::Other, "connection reset")),
        ];
        return Body::from_stream(futures::stream::iter(chunks)).into_response();
    }
    AUDIO.to_vec().into_response()
}

fn stub_router(backend: Shared) -> Router {
    let api_routes = Router::new()
        .route("/chatrooms", get(list_rooms))
        .route(
            "/chatrooms/{id}/messages",
            get(list_messages).post(post_message),
        )
        .route("/upload/pdf", post(upload))
        .route("/documents/{id}/status", get(document_status))
        .route("/documents/{id}/podcast", post(start_podcast))
        .route("/documents/{id}/podcast/status", get(podcast_status))
        .layer(middleware::from_fn(require_bearer));

    Router::new()
        .nest("/api", api_routes)
        .route("/files/{name}", get(podcast_file))
        .with_state(backend)
}

/// Test fixture for end-to-end tests.
struct TestFixture {
    base_url: String,
    backend: Shared,
    temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        let backend = Arc::new(Mutex::new(Backend {
            base_url: base_url.clone(),
            ..Backend::default()
        }));
        let app = stub_router(backend.clone());

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestFixture {
            base_url,
            backend,
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn seed(&self, f: impl FnOnce(&mut Backend)) {
        f(&mut self.backend.lock().unwrap());
    }

    fn api_with_token(&self, token: Option<&str>) -> HttpApi {
        HttpApi::new(
            &format!("{}/api", self.base_url),
            Arc::new(StaticToken::new(token.map(str::to_string))),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn api(&self) -> HttpApi {
        self.api_with_token(Some(TOKEN))
    }

    fn store(&self) -> (Store, Arc<RecordingScheduler>) {
        let scheduler = Arc::new(RecordingScheduler::new());
        let store = Store::new(
            Arc::new(self.api()),
            scheduler.clone(),
            StoreSettings::default(),
        );
        scheduler.observe(store.subscribe());
        (store, scheduler)
    }
}

#[tokio::test]
async fn test_requests_carry_bearer_token() {
    let fixture = TestFixture::new().await;
    fixture.seed(|b| b.rooms.push(stub_room("r1", "report.pdf", "d1")));

    let rooms = fixture.api().get_chat_rooms().await.unwrap();

    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].title, "report.pdf");
}

#[tokio::test]
async fn test_missing_token_fails_before_request() {
    let fixture = TestFixture::new().await;

    let err = fixture.api_with_token(None).get_chat_rooms().await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_wrong_token_rejected() {
    let fixture = TestFixture::new().await;

    let err = fixture
        .api_with_token(Some("wrong-token"))
        .get_chat_rooms()
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 401, .. }));
}

#[tokio::test]
async fn test_unknown_room_is_not_found() {
    let fixture = TestFixture::new().await;

    let err = fixture.api().get_messages("nope").await.unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_room_ids_are_path_encoded() {
    let fixture = TestFixture::new().await;
    fixture.seed(|b| {
        b.rooms.push(stub_room("r/1?x", "odd.pdf", "d1"));
        b.rooms.push(stub_room("r", "other.pdf", "d2"));
        b.messages.insert(
            "r/1?x".to_string(),
            vec![Message::local(
                "msg-0".to_string(),
                "r/1?x",
                Role::Assistant,
                "hello",
                "2024-05-01T10:00:00Z",
            )],
        );
    });

    let messages = fixture.api().get_messages("r/1?x").await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "hello");

    fixture.api().post_message("r/1?x", "still there?").await.unwrap();
    let backend = fixture.backend.lock().unwrap();
    assert_eq!(backend.messages["r/1?x"].len(), 3);
    assert!(!backend.messages.contains_key("r"));
}

#[tokio::test]
async fn test_interrupted_download_leaves_no_file() {
    let fixture = TestFixture::new().await;
    let dest = fixture.temp_dir.path().join("podcast.mp3");
    let url = format!("{}/files/broken.mp3", fixture.base_url);

    let err = fixture
        .api()
        .download_podcast(&url, &dest)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Network(_) | ApiError::Decode(_)));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_empty_upload_rejected_locally() {
    let fixture = TestFixture::new().await;

    let err = fixture
        .api()
        .upload_pdf(UploadFile::new("empty.pdf", Vec::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidUpload(_)));
    assert!(fixture.backend.lock().unwrap().uploads.is_empty());
}

#[tokio::test]
async fn test_upload_and_track_end_to_end() {
    let fixture = TestFixture::new().await;
    fixture.seed(|b| {
        b.rooms.push(stub_room("r1", "older.pdf", "d1"));
        b.document_statuses = VecDeque::from(vec![
            "PROCESSING".to_string(),
            "PROCESSING".to_string(),
            "COMPLETED".to_string(),
        ]);
    });

    let path = fixture.temp_dir.path().join("doc.pdf");
    tokio::fs::write(&path, b"%PDF-1.7\n%fake").await.unwrap();
    let file = UploadFile::from_path(&path).await.unwrap();

    let (store, scheduler) = fixture.store();
    store.fetch_chat_rooms().await;
    let job = store.upload_and_track_document(file).await;

    let during = store.chat_rooms();
    assert_eq!(during.len(), 2);
    assert!(during[0].is_placeholder());
    assert_eq!(during[0].title(), "doc.pdf");

    job.wait().await;

    assert_eq!(scheduler.delays().len(), 4);
    assert_eq!(scheduler.seen()[3].upload_status, UploadStatus::Success);

    let state = store.snapshot();
    assert_eq!(state.upload_status, UploadStatus::Idle);
    let ids: Vec<&str> = state.chat_rooms.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["room-1", "r1"]);
    assert!(state.chat_rooms.iter().all(|r| !r.is_placeholder()));

    let backend = fixture.backend.lock().unwrap();
    assert_eq!(
        backend.uploads,
        vec![(
            "doc.pdf".to_string(),
            Some("application/pdf".to_string()),
            14
        )]
    );
}

#[tokio::test]
async fn test_chat_end_to_end() {
    let fixture = TestFixture::new().await;
    fixture.seed(|b| {
        b.rooms.push(stub_room("r1", "report.pdf", "d1"));
        b.messages.insert(
            "r1".to_string(),
            vec![Message::local(
                "msg-0".to_string(),
                "r1",
                Role::Assistant,
                "Ask me anything about report.pdf",
                "2024-05-01T10:00:00Z",
            )],
        );
        b.podcast_statuses.push_back("NONE".to_string());
    });

    let (store, _) = fixture.store();
    store.fetch_chat_rooms().await;
    store.set_active_chat_room_id(Some("r1")).await;
    assert_eq!(store.messages().len(), 1);
    assert_eq!(store.podcast().status, PodcastStatus::None);
    assert_eq!(store.active_document_id().as_deref(), Some("d1"));

    store.post_message("r1", "What is this document about?").await;

    let messages = store.messages();
    assert_eq!(messages.len(), 3);
    assert!(messages.iter().all(|m| matches!(m, MessageEntry::Confirmed(_))));
    assert_eq!(messages[1].message().role, Role::User);
    assert_eq!(messages[1].message().content, "What is this document about?");
    assert_eq!(messages[2].message().role, Role::Assistant);
    assert_eq!(
        messages[2].message().content,
        "You asked: What is this document about?"
    );

    assert_eq!(fixture.backend.lock().unwrap().messages["r1"].len(), 3);
}

#[tokio::test]
async fn test_podcast_end_to_end_with_download() {
    let fixture = TestFixture::new().await;
    fixture.seed(|b| {
        b.rooms.push(stub_room("r1", "report.pdf", "d1"));
        b.podcast_statuses = VecDeque::from(vec![
            "NONE".to_string(),
            "GENERATING".to_string(),
            "COMPLETED".to_string(),
        ]);
    });

    let (store, scheduler) = fixture.store();
    store.fetch_chat_rooms().await;
    store.set_active_chat_room_id(Some("r1")).await;

    let job = store.generate_podcast("d1").await.expect("job spawned");
    job.wait().await;

    assert_eq!(scheduler.delays().len(), 2);
    let podcast = store.podcast();
    assert_eq!(podcast.status, PodcastStatus::Completed);
    let url = podcast.url.expect("podcast url");
    assert_eq!(url, format!("{}/files/d1.mp3", fixture.base_url));
    assert_eq!(fixture.backend.lock().unwrap().podcast_requests, vec!["d1"]);

    let dest = fixture.temp_dir.path().join("podcast.mp3");
    let written = fixture.api().download_podcast(&url, &dest).await.unwrap();
    assert_eq!(written, AUDIO.len() as u64);
    assert_eq!(tokio::fs::read(&dest).await.unwrap(), AUDIO);
}
