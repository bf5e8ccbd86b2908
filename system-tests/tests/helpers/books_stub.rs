// system-tests/tests/helpers/books_stub.rs
// ============================================================================
// Module: Books Stub
// Description: In-process Books API used as the system-test target.
// Purpose: Exercise the contract harness over real HTTP without a remote API.
// Dependencies: axum, books-contract, tokio
// ============================================================================

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::Request;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use books_contract::Book;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Builder;
use tokio::sync::oneshot;
use tokio::time::sleep;

/// Base path the stub serves the Books resource under.
pub const STUB_BASE_PATH: &str = "/api/v1";
/// Number of seeded fixture books (ids 1 through 200).
pub const FIXTURE_COUNT: i64 = 200;

/// Deviations from a well-behaved Books API.
#[derive(Debug, Clone, Default)]
pub struct StubBehavior {
    /// Answer 200 and overwrite when a create reuses an id.
    pub accept_duplicate_ids: bool,
    /// Delay applied before every response.
    pub response_delay: Duration,
    /// Field removed from single-book read responses.
    pub strip_field_on_read: Option<&'static str>,
    /// Answer every create with 500.
    pub fail_creates: bool,
}

/// Shared handler state.
#[derive(Clone)]
struct StubState {
    /// Stored books keyed by id.
    books: Arc<Mutex<BTreeMap<i64, Book>>>,
    /// Request log shared with the handle.
    requests: Arc<Mutex<Vec<StubRequest>>>,
    /// Configured deviations.
    behavior: StubBehavior,
}

/// Recorded request line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StubRequest {
    /// HTTP method.
    pub method: String,
    /// Request path without query.
    pub path: String,
}

/// Handle for the stub Books server.
pub struct BooksStubHandle {
    /// Bound listener address.
    addr: SocketAddr,
    /// Graceful shutdown trigger; taken on drop.
    shutdown: Option<oneshot::Sender<()>>,
    /// Server thread; joined on drop.
    join: Option<thread::JoinHandle<()>>,
    /// Book store shared with the handlers.
    books: Arc<Mutex<BTreeMap<i64, Book>>>,
    /// Request log shared with the handlers.
    requests: Arc<Mutex<Vec<StubRequest>>>,
}

impl BooksStubHandle {
    /// Returns the server origin (`http://host:port`).
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Returns captured requests in arrival order.
    pub fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().map_or_else(|_| Vec::new(), |entries| entries.clone())
    }

    /// Returns the stored book with `id`.
    pub fn book(&self, id: i64) -> Option<Book> {
        self.books.lock().ok().and_then(|books| books.get(&id).cloned())
    }

    /// Returns the number of stored books.
    pub fn book_count(&self) -> usize {
        self.books.lock().map_or(0, |books| books.len())
    }
}

impl Drop for BooksStubHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Spawns a stub with `behavior` on `bind` (use port 0 for an ephemeral port).
pub fn spawn_books_stub_with(
    bind: SocketAddr,
    behavior: StubBehavior,
) -> Result<BooksStubHandle, String> {
    let listener =
        StdTcpListener::bind(bind).map_err(|err| format!("books stub bind failed: {err}"))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("books stub listener nonblocking failed: {err}"))?;
    let addr = listener.local_addr().map_err(|err| format!("books stub local addr failed: {err}"))?;

    let books = Arc::new(Mutex::new(seed_books()));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        books: Arc::clone(&books),
        requests: Arc::clone(&requests),
        behavior,
    };
    let app = Router::new()
        .route(&format!("{STUB_BASE_PATH}/Books"), get(list_books).post(create_book))
        .route(
            &format!("{STUB_BASE_PATH}/Books/{{id}}"),
            get(read_book).put(update_book).delete(delete_book),
        )
        .layer(middleware::from_fn_with_state(state.clone(), record_and_delay))
        .with_state(state);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = thread::spawn(move || {
        let Ok(runtime) = Builder::new_current_thread().enable_all().build() else {
            return;
        };
        runtime.block_on(async move {
            let Ok(listener) = tokio::net::TcpListener::from_std(listener) else {
                return;
            };
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = server.await;
        });
    });
    Ok(BooksStubHandle {
        addr,
        shutdown: Some(shutdown_tx),
        join: Some(join),
        books,
        requests,
    })
}

/// Fixture books 1 through 200.
fn seed_books() -> BTreeMap<i64, Book> {
    (1 ..= FIXTURE_COUNT)
        .map(|id| {
            let book = Book::builder(id)
                .title(format!("Book {id}"))
                .description("Lorem ipsum dolor sit amet.")
                .page_count(id * 100)
                .excerpt("Lorem ipsum dolor sit amet, consectetur adipiscing elit.")
                .publish_date("2025-10-18T14:22:07.735Z")
                .build();
            (id, book)
        })
        .collect()
}

/// Logs the request line, then applies the configured delay.
async fn record_and_delay(State(state): State<StubState>, request: Request, next: Next) -> Response {
    if let Ok(mut requests) = state.requests.lock() {
        requests.push(StubRequest {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
        });
    }
    if !state.behavior.response_delay.is_zero() {
        sleep(state.behavior.response_delay).await;
    }
    next.run(request).await
}

/// `GET /Books`: every stored book in id order.
async fn list_books(State(state): State<StubState>) -> Response {
    let Ok(books) = state.books.lock() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    Json(books.values().cloned().collect::<Vec<_>>()).into_response()
}

/// `GET /Books/{id}`: one book, minus any stripped field.
async fn read_book(State(state): State<StubState>, Path(raw_id): Path<String>) -> Response {
    let Ok(id) = raw_id.parse::<i64>() else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let Some(book) = state.books.lock().ok().and_then(|books| books.get(&id).cloned()) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let mut body = book.to_json();
    if let Some(field) = state.behavior.strip_field_on_read
        && let Some(object) = body.as_object_mut()
    {
        object.remove(field);
    }
    Json(body).into_response()
}

/// `POST /Books`: stores a valid book; 409 on a reused id unless allowed.
async fn create_book(State(state): State<StubState>, body: Bytes) -> Response {
    if state.behavior.fail_creates {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let book = match parse_book(&body) {
        Ok(book) => book,
        Err(message) => return bad_request(&message),
    };
    let Ok(mut books) = state.books.lock() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    if books.contains_key(&book.id) && !state.behavior.accept_duplicate_ids {
        return (StatusCode::CONFLICT, Json(error_body("id already exists"))).into_response();
    }
    books.insert(book.id, book.clone());
    Json(book).into_response()
}

/// `PUT /Books/{id}`: replaces an existing book whose body id matches.
async fn update_book(
    State(state): State<StubState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Response {
    let Ok(id) = raw_id.parse::<i64>() else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let book = match parse_book(&body) {
        Ok(book) => book,
        Err(message) => return bad_request(&message),
    };
    if book.id != id {
        return bad_request("body id does not match path id");
    }
    let Ok(mut books) = state.books.lock() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    let Some(slot) = books.get_mut(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    *slot = book.clone();
    Json(book).into_response()
}

/// `DELETE /Books/{id}`: 200 when removed, 404 when absent.
async fn delete_book(State(state): State<StubState>, Path(raw_id): Path<String>) -> Response {
    let Ok(id) = raw_id.parse::<i64>() else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let Ok(mut books) = state.books.lock() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    if books.remove(&id).is_some() {
        StatusCode::OK.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Decodes and validates a book payload.
fn parse_book(body: &[u8]) -> Result<Book, String> {
    let value: Value =
        serde_json::from_slice(body).map_err(|err| format!("malformed JSON: {err}"))?;
    let book: Book = serde_json::from_value(value).map_err(|err| format!("invalid book: {err}"))?;
    book.validate().map_err(|err| err.to_string())?;
    Ok(book)
}

/// 400 with a problem body.
fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(error_body(message))).into_response()
}

/// Problem body carrying `message` as detail.
fn error_body(message: &str) -> Value {
    serde_json::json!({ "title": "Bad Request", "detail": message })
}
