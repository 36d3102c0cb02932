//! Fixtures and a loopback HTTP responder shared by pseudogen's tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use pseudogen_core::model::RuleFile;

/// The single-column example from the `rules.ini` docs.
pub const COLOR_RULES: &str = "\
[rec]
num = 10
mode = 1
cols = 1

[c1]
name = color
dtype = str
data = random
options = Red,Green,Blue
weights = 1,2,1
";

/// A sales lead sheet exercising most data sources, both append operations
/// and a reorder.
pub const SALES_RULES: &str = "\
[rec]
num = 40
mode = 3
cols = 7

[c1]
name = Lead_ID
dtype = int
data = company

[c2]
name = Lead_Source
dtype = str
data = random
options = Website,Call,Tradeshow
weights = 25,25,50

[c3]
name = Priority
dtype = str
data = reference
cols = 2
value = Website,Call,Tradeshow
range = Low,High,Medium

[c4]
name = Units
dtype = int
data = increment
start = 10
interval = 5

[c5]
name = Unit_Price
dtype = float
data = random
options = 9.5,12,20
weights = 1,1,1

[c6]
name = Total
dtype = float
data = total
operation = *
operands = 4,5

[c7]
name = Discounted
dtype = decimal
data = discount
cols = 6
operation = -
value = 10

[a1]
operation = replace
cols = 2
col_name = Source
find = Call
replace = Phone

[a2]
operation = generate
new_col = Owner
data = faker
faker_method = name
nullable = 0

[reorder]
order = 1,8,2,3,4,5,6,7
";

/// Parse a fixture, panicking with the parse report on failure.
pub fn rule_file(text: &str) -> RuleFile {
    match RuleFile::from_ini_str(text) {
        Ok(rf) => rf,
        Err(e) => panic!("fixture does not parse: {}", e),
    }
}

/// A successful `/parse-ini` envelope for [`COLOR_RULES`], shaped the way
/// the service reports it: lists as comma-joined strings, numbers as strings.
pub fn color_parse_response() -> String {
    r#"{
  "success": true,
  "message": "File parsed successfully",
  "data": {
    "num_records": "10",
    "mode": "1",
    "columns": [
      {
        "column_position": "1",
        "name": "color",
        "dtype": "str",
        "data": "random",
        "options": "Red,Green,Blue",
        "weights": "1,2,1"
      }
    ],
    "append_rules": [],
    "reorder": []
  }
}"#
    .to_string()
}

/// A `/preview-data` body with two rows.
pub fn color_preview_response() -> String {
    r#"{
  "preview_data": [{"color": "Green"}, {"color": "Red"}],
  "columns": ["color"],
  "shape": [2, 1],
  "message": "Preview of 2 rows"
}"#
    .to_string()
}

/// What the responder answers to every request.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl CannedResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            body: body.into().into_bytes(),
        }
    }

    pub fn bytes(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: content_type.to_string(),
            body: body.into(),
        }
    }
}

/// One request as the responder received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A one-route HTTP/1.1 server on 127.0.0.1 that answers every request with
/// the same canned response and records what it was sent. Each connection
/// serves a single request and is then closed.
pub struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start(response: CannedResponse) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let recorded = Arc::clone(&recorded);
                let response = response.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, &response, &recorded).await;
                });
            }
        });

        Ok(Self {
            addr,
            requests,
            handle,
        })
    }

    /// Base URL to hand to the client.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    response: &CannedResponse,
    recorded: &Mutex<Vec<RecordedRequest>>,
) -> std::io::Result<()> {
    let request = read_request(&mut stream).await?;
    if let Ok(mut requests) = recorded.lock() {
        requests.push(request);
    }

    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        reason(response.status),
        response.content_type,
        response.body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&response.body).await?;
    stream.shutdown().await
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let header = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    };

    let mut body = buf[header_end + 4..].to_vec();
    if let Some(len) = header("content-length").and_then(|v| v.parse::<usize>().ok()) {
        while body.len() < len {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body.truncate(len);
    } else if header("transfer-encoding").is_some_and(|v| v.eq_ignore_ascii_case("chunked")) {
        while find(&body, b"0\r\n\r\n").is_none() {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body = dechunk(&body);
    }

    Ok(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn dechunk(mut raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(line_end) = find(raw, b"\r\n") {
        let size_str = String::from_utf8_lossy(&raw[..line_end]);
        let size = usize::from_str_radix(size_str.trim(), 16).unwrap_or(0);
        if size == 0 {
            break;
        }
        let start = line_end + 2;
        let end = (start + size).min(raw.len());
        out.extend_from_slice(&raw[start..end]);
        raw = raw.get(end + 2..).unwrap_or_default();
    }
    out
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
