//! Scripted stand-in for a LiteFS node's `/events` endpoint
//!
//! Every incoming connection is bound, in accept order, to a [`Conn`] handle
//! registered by the test with [`MockNode::connection`]. The handle decides
//! what that connection sees: event lines (each flushed as its own chunk), an
//! error status, a hang-up in the middle of the body, or a clean end of the
//! response when the handle is dropped. Response headers are only written
//! with the first line, so a client stays blocked in its request until the
//! test acts.

#![allow(dead_code)]

use std::time::Duration;

use litefs_client::{Client, ClientConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

pub const INIT: &str = r#"{"type":"init","data":{"isPrimary":true,"hostname":"node-1"}}"#;
pub const TX: &str = r#"{"type":"tx","db":"db","data":{"txID":"0000000000000027","postApplyChecksum":"83b05248774ce767","pageSize":4096,"commit":2,"timestamp":"0001-01-01T00:00:00Z"}}"#;
pub const PRIMARY_CHANGE_NODE_2: &str =
    r#"{"type":"primaryChange","data":{"isPrimary":false,"hostname":"node-2"}}"#;
pub const PRIMARY_CHANGE_NODE_1: &str =
    r#"{"type":"primaryChange","data":{"isPrimary":true,"hostname":"node-1"}}"#;
pub const UNKNOWN: &str = r#"{"type":"checkpoint","data":{"pos":12}}"#;

/// Upper bound for anything a test waits on
pub const TIMEOUT: Duration = Duration::from_secs(5);

enum Step {
    Line(String),
    Status(u16),
    Hangup,
}

/// Controls one connection to the mock node
pub struct Conn {
    steps: mpsc::UnboundedSender<Step>,
}

impl Conn {
    /// Write one event line and flush it
    pub fn line(&self, line: &str) {
        let _ = self.steps.send(Step::Line(line.to_string()));
    }

    /// Respond with `code` and close (must be the first step)
    pub fn status(self, code: u16) {
        let _ = self.steps.send(Step::Status(code));
    }

    /// Drop the socket without finishing the chunked body
    pub fn hangup(self) {
        let _ = self.steps.send(Step::Hangup);
    }
}

pub struct MockNode {
    pub url: String,
    scripts: mpsc::UnboundedSender<mpsc::UnboundedReceiver<Step>>,
}

impl MockNode {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let (scripts, mut pending) = mpsc::unbounded_channel::<mpsc::UnboundedReceiver<Step>>();

        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                // Connections are served in order; wait until the test has
                // said what this one should see.
                let Some(steps) = pending.recv().await else {
                    break;
                };
                tokio::spawn(serve(socket, steps));
            }
        });

        Self { url, scripts }
    }

    /// Handle for the next connection that has not been claimed yet
    pub fn connection(&self) -> Conn {
        let (steps, rx) = mpsc::unbounded_channel();
        self.scripts.send(rx).unwrap();
        Conn { steps }
    }

    pub fn client(&self) -> Client {
        client_for(&self.url)
    }
}

/// Client for `url` with a fast retry floor, bypassing any system proxy
pub fn client_for(url: &str) -> Client {
    let config = ClientConfig {
        retry_min_ms: 5,
        retry_max_ms: 20,
        ..ClientConfig::with_url(url)
    };
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    Client::with_http_client(config, http).unwrap()
}

/// URL of a port nothing listens on
pub async fn unused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    url
}

/// Poll `f` until it returns `Some`, panicking after [`TIMEOUT`]
pub async fn eventually<T>(what: &str, mut f: impl FnMut() -> Option<T>) -> T {
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        if let Some(value) = f() {
            return value;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

async fn serve(socket: TcpStream, mut steps: mpsc::UnboundedReceiver<Step>) {
    let (mut reader, mut writer) = socket.into_split();
    if read_request(&mut reader).await.is_err() {
        return;
    }

    let mut started = false;
    loop {
        let step = tokio::select! {
            biased;
            _ = wait_closed(&mut reader) => return,
            step = steps.recv() => step,
        };

        let result = match step {
            Some(Step::Line(line)) => {
                write_line(&mut writer, &mut started, &line).await
            }
            Some(Step::Status(code)) => {
                let head = format!(
                    "HTTP/1.1 {code} Mock Status\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
                let _ = writer.write_all(head.as_bytes()).await;
                let _ = writer.shutdown().await;
                return;
            }
            Some(Step::Hangup) => return,
            None => {
                let _ = finish(&mut writer, started).await;
                return;
            }
        };

        if result.is_err() {
            return;
        }
    }
}

async fn read_request(reader: &mut OwnedReadHalf) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        request.extend_from_slice(&buf[..n]);
    }
    Ok(())
}

/// Resolves when the client closes its side of the connection
async fn wait_closed(reader: &mut OwnedReadHalf) {
    let mut buf = [0u8; 64];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => continue,
        }
    }
}

async fn write_head(writer: &mut OwnedWriteHalf) -> std::io::Result<()> {
    writer
        .write_all(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        )
        .await
}

async fn write_line(
    writer: &mut OwnedWriteHalf,
    started: &mut bool,
    line: &str,
) -> std::io::Result<()> {
    if !*started {
        write_head(writer).await?;
        *started = true;
    }
    let body = format!("{line}\n");
    let chunk = format!("{:x}\r\n{body}\r\n", body.len());
    writer.write_all(chunk.as_bytes()).await?;
    writer.flush().await
}

async fn finish(writer: &mut OwnedWriteHalf, started: bool) -> std::io::Result<()> {
    if !started {
        write_head(writer).await?;
    }
    writer.write_all(b"0\r\n\r\n").await?;
    writer.shutdown().await
}
