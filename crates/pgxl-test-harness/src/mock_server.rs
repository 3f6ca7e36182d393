//! Mock line-protocol TCP server for end-to-end session tests.
//!
//! [`MockLineServer`] listens on a random localhost port, greets the first
//! client with a scripted burst of unsolicited lines, then answers counted
//! commands using body-keyed reply rules. Every line the client sends is
//! recorded and returned from [`wait`](MockLineServer::wait).
//!
//! # Example
//!
//! ```
//! use pgxl_test_harness::MockLineServer;
//!
//! # async fn example() -> pgxl_core::Result<()> {
//! let mut server = MockLineServer::new().await?;
//! server.greet("V1.4.0.0");
//! server.greet("S0|radio band_persistence_enabled=1");
//! server.reply_to("slice t 0 14.200000", "0|");
//! let port = server.port();
//! server.start();
//! // ... connect a session to 127.0.0.1:port ...
//! # Ok(())
//! # }
//! ```

use pgxl_core::error::{Error, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A single-connection scripted server for the counted line protocol.
pub struct MockLineServer {
    listener: Option<TcpListener>,
    port: u16,
    greeting: Vec<String>,
    rules: Vec<(String, String)>,
    terminator: String,
    server_handle: Option<JoinHandle<std::result::Result<Vec<String>, String>>>,
}

impl MockLineServer {
    /// Bind a listener on `127.0.0.1:0`.
    pub async fn new() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| Error::Connection(format!("failed to bind mock line server: {e}")))?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            listener: Some(listener),
            port,
            greeting: Vec::new(),
            rules: Vec::new(),
            terminator: "\n".to_string(),
            server_handle: None,
        })
    }

    /// Port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Add a line to the burst sent immediately after accept.
    pub fn greet(&mut self, line: &str) {
        self.greeting.push(line.to_string());
    }

    /// Answer every `C<seq>|<body>` with `R<seq>|<tail>`.
    pub fn reply_to(&mut self, body: &str, tail: &str) {
        self.rules.push((body.to_string(), tail.to_string()));
    }

    /// Line terminator for everything the server writes (default `\n`).
    pub fn terminator(&mut self, terminator: &str) {
        self.terminator = terminator.to_string();
    }

    /// Accept one client and serve it until it disconnects.
    pub fn start(&mut self) {
        let listener = self.listener.take();
        let greeting = std::mem::take(&mut self.greeting);
        let rules = std::mem::take(&mut self.rules);
        let terminator = self.terminator.clone();

        let handle = tokio::spawn(async move {
            let listener = listener.ok_or_else(|| "server already started".to_string())?;
            let (stream, _) = listener
                .accept()
                .await
                .map_err(|e| format!("failed to accept connection: {e}"))?;
            let (read_half, mut write_half) = stream.into_split();

            for line in &greeting {
                write_half
                    .write_all(format!("{line}{terminator}").as_bytes())
                    .await
                    .map_err(|e| format!("greeting write error: {e}"))?;
            }
            write_half
                .flush()
                .await
                .map_err(|e| format!("greeting flush error: {e}"))?;

            let mut received = Vec::new();
            let mut lines = BufReader::new(read_half).lines();
            while let Some(line) = lines
                .next_line()
                .await
                .map_err(|e| format!("read error: {e}"))?
            {
                let line = line.trim_end().to_string();
                let reply = line
                    .strip_prefix('C')
                    .and_then(|rest| rest.split_once('|'))
                    .and_then(|(seq, body)| {
                        rules
                            .iter()
                            .find(|(rule_body, _)| rule_body == body)
                            .map(|(_, tail)| format!("R{seq}|{tail}{terminator}"))
                    });
                received.push(line);

                if let Some(reply) = reply {
                    write_half
                        .write_all(reply.as_bytes())
                        .await
                        .map_err(|e| format!("reply write error: {e}"))?;
                }
            }

            Ok(received)
        });

        self.server_handle = Some(handle);
    }

    /// Wait for the client to disconnect and return every line it sent.
    pub async fn wait(self) -> std::result::Result<Vec<String>, String> {
        match self.server_handle {
            Some(handle) => handle
                .await
                .map_err(|e| format!("server task panicked: {e}"))?,
            None => Ok(Vec::new()),
        }
    }
}
