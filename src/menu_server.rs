//! HTTP endpoint serving each user's menu entries: `GET /{userId}`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Most bytes read for a request line plus headers.
pub const MAX_HEAD_BYTES: u64 = 8 * 1024;
/// How long a client may take to send its request head.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-user menu files laid out as `{root}/{userId}/database.json`, each a
/// JSON object whose `userId` key holds that user's entries.
#[derive(Debug, Clone)]
pub struct MenuDatabase {
    root: PathBuf,
}

impl MenuDatabase {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Entries stored for `user_id`, or an empty list if the file has none.
    pub async fn lookup(&self, user_id: &str) -> Result<Value> {
        let path = self.root.join(user_id).join("database.json");
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let database: Value = serde_json::from_str(&text)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?;

        Ok(match database.get(user_id) {
            Some(Value::Null) | None => json!([]),
            Some(entries) => entries.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Option<Value>,
}

impl Response {
    fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    fn error(status: u16, message: &str) -> Self {
        Self::json(status, json!({ "error": message }))
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            204 => "No Content",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            _ => "Internal Server Error",
        }
    }

    /// The full HTTP/1.1 response. Every response allows any origin.
    pub fn to_bytes(&self) -> Vec<u8> {
        let body = self
            .body
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default();

        let mut head = format!(
            "HTTP/1.1 {} {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Methods: GET, OPTIONS\r\n\
             Access-Control-Allow-Headers: *\r\n\
             Connection: close\r\n",
            self.status,
            self.reason()
        );
        if self.body.is_some() {
            head.push_str("Content-Type: application/json\r\n");
        }
        head.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(body.as_bytes());
        bytes
    }
}

/// User ids double as directory names, so anything that could leave the
/// database root is refused.
pub fn is_valid_user_id(user_id: &str) -> bool {
    !user_id.is_empty()
        && user_id != "."
        && user_id != ".."
        && !user_id
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
}

pub async fn handle_request(database: &MenuDatabase, method: &str, target: &str) -> Response {
    let path = target.split(['?', '#']).next().unwrap_or_default();
    let Some(user_id) = path.strip_prefix('/') else {
        return Response::error(400, "Bad request target");
    };

    match method {
        "OPTIONS" => return Response::empty(204),
        "GET" => {}
        _ => return Response::error(405, "Method not allowed"),
    }

    if user_id.is_empty() || user_id.contains('/') {
        return Response::error(404, "Not found");
    }
    if !is_valid_user_id(user_id) {
        return Response::error(400, "Invalid user id");
    }

    match database.lookup(user_id).await {
        Ok(entries) => {
            let count = entries.as_array().map_or(0, Vec::len);
            log::info!("Request from {user_id}: sent {count} entries");
            Response::json(200, entries)
        }
        Err(err) => {
            log::error!("Failed to read menu for {user_id}: {err:#}");
            Response::error(500, "Internal server error")
        }
    }
}

/// Method and target of an HTTP request line.
pub fn parse_request_line(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    Some((method, target))
}

/// Reads the request line and skips the headers, stopping after
/// [`MAX_HEAD_BYTES`]. Returns `None` when the client sent nothing. A request
/// line cut off by the limit comes back without its line ending.
pub async fn read_request_head<R>(reader: R, timeout: Duration) -> Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader.take(MAX_HEAD_BYTES));

    let read = async {
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).await? == 0 {
            return Ok(None);
        }

        // Headers are not needed, but must be consumed before replying.
        loop {
            let mut header = String::new();
            if reader.read_line(&mut header).await? == 0 || header.trim().is_empty() {
                break;
            }
        }
        Ok::<_, std::io::Error>(Some(request_line))
    };

    tokio::time::timeout(timeout, read)
        .await
        .context("Timed out reading request")?
        .context("Failed to read request")
}

async fn handle_connection(database: Arc<MenuDatabase>, stream: TcpStream) -> Result<()> {
    let (reader, mut writer) = stream.into_split();

    let Some(request_line) = read_request_head(reader, READ_TIMEOUT).await? else {
        return Ok(());
    };

    let response = if !request_line.ends_with('\n') {
        Response::error(400, "Request too large")
    } else {
        match parse_request_line(&request_line) {
            Some((method, target)) => handle_request(&database, method, target).await,
            None => Response::error(400, "Malformed request"),
        }
    };

    writer.write_all(&response.to_bytes()).await?;
    writer.shutdown().await?;
    Ok(())
}

/// Accepts connections forever, one task per connection.
pub async fn serve(listener: TcpListener, database: MenuDatabase) -> Result<()> {
    let database = Arc::new(database);
    log::info!(
        "Serving menus from {} on {}",
        database.root().display(),
        listener.local_addr()?
    );

    loop {
        let (stream, peer) = listener.accept().await.context("Failed to accept")?;
        let database = Arc::clone(&database);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(database, stream).await {
                log::warn!("Connection from {peer} failed: {err:#}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database_with(user_id: &str, contents: &str) -> (tempfile::TempDir, MenuDatabase) {
        let dir = tempfile::tempdir().unwrap();
        let user_dir = dir.path().join(user_id);
        std::fs::create_dir_all(&user_dir).unwrap();
        std::fs::write(user_dir.join("database.json"), contents).unwrap();
        let database = MenuDatabase::new(dir.path());
        (dir, database)
    }

    #[tokio::test]
    async fn returns_the_entries_under_the_user_key() {
        let (_dir, database) = database_with(
            "mario",
            r#"{"mario": [{"id": 1, "label": "Cubo", "type": "cubo"}], "luigi": []}"#,
        );

        let response = handle_request(&database, "GET", "/mario").await;
        assert_eq!(response.status, 200);
        assert_eq!(
            response.body,
            Some(json!([{ "id": 1, "label": "Cubo", "type": "cubo" }]))
        );
    }

    #[tokio::test]
    async fn missing_key_is_an_empty_list() {
        let (_dir, database) = database_with("mario", r#"{"luigi": [{"label": "x"}]}"#);

        let response = handle_request(&database, "GET", "/mario?fresh=1").await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body, Some(json!([])));
    }

    #[tokio::test]
    async fn unreadable_database_is_a_server_error() {
        let (_dir, database) = database_with("mario", "{broken");

        let response = handle_request(&database, "GET", "/mario").await;
        assert_eq!(response.status, 500);
        assert!(response.body.unwrap().get("error").is_some());

        let response = handle_request(&database, "GET", "/nobody").await;
        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn rejects_bad_ids_and_methods() {
        let database = MenuDatabase::new(".");

        assert_eq!(handle_request(&database, "GET", "/..").await.status, 400);
        assert_eq!(handle_request(&database, "GET", "/.").await.status, 400);
        assert_eq!(handle_request(&database, "GET", "/a\\b").await.status, 400);
        assert_eq!(handle_request(&database, "GET", "/a/b").await.status, 404);
        assert_eq!(handle_request(&database, "GET", "/").await.status, 404);
        assert_eq!(handle_request(&database, "POST", "/mario").await.status, 405);
        assert_eq!(
            handle_request(&database, "OPTIONS", "/mario").await,
            Response::empty(204)
        );
    }

    #[tokio::test]
    async fn dotted_user_ids_are_served() {
        let (_dir, database) = database_with("mario.rossi", r#"{"mario.rossi": []}"#);

        let response = handle_request(&database, "GET", "/mario.rossi").await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body, Some(json!([])));
    }

    #[tokio::test]
    async fn request_head_stops_at_the_size_limit() {
        let request = "A".repeat(3 * MAX_HEAD_BYTES as usize);

        let line = read_request_head(request.as_bytes(), READ_TIMEOUT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line.len(), MAX_HEAD_BYTES as usize);
        assert!(!line.ends_with('\n'));

        let request = b"GET /mario HTTP/1.1\r\nHost: x\r\n\r\n";
        let line = read_request_head(&request[..], READ_TIMEOUT).await.unwrap();
        assert_eq!(line.as_deref(), Some("GET /mario HTTP/1.1\r\n"));
    }

    #[tokio::test]
    async fn silent_clients_time_out() {
        let (_client, server) = tokio::io::duplex(64);

        let err = read_request_head(server, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Timed out"));
    }

    #[test]
    fn responses_carry_cors_headers() {
        let text = String::from_utf8(Response::json(200, json!([])).to_bytes()).unwrap();

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Access-Control-Allow-Origin: *\r\n"));
        assert!(text.contains("Content-Length: 2\r\n"));
        assert!(text.ends_with("\r\n\r\n[]"));
    }

    #[tokio::test]
    async fn serves_over_tcp() {
        let (_dir, database) =
            database_with("mario", r#"{"mario": [{"label": "Sedia", "type": "sedia"}]}"#);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, database));

        let mut stream = TcpStream::connect(address).await.unwrap();
        stream
            .write_all(b"GET /mario HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();

        assert!(reply.starts_with("HTTP/1.1 200 OK"));
        assert!(reply.ends_with(r#"[{"label":"Sedia","type":"sedia"}]"#));
    }
}
