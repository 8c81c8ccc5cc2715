use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::{debug, info, warn};

use courtbot_core::config::MailConfig;
use courtbot_core::types::MailCredentials;

use crate::error::MailError;
use crate::extract::select_code;
use crate::protocol::{
    advertises_starttls, body_from_fetch, parse_completion, parse_search_ids, quote, search_date,
    CompletionStatus, LineBuffer, TagGen, TaggedResponse,
};

/// Per-attempt protocol state. Done and Failed are terminal; a new
/// attempt always starts from Disconnected on a fresh connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailState {
    Disconnected,
    Greeted,
    Upgrading,
    Authenticated,
    MailboxSelected,
    Searched,
    Fetched,
    Done,
    Failed,
}

/// What to look for: verification mails from this sender, optionally
/// narrowed by subject, received after `since`.
#[derive(Debug, Clone)]
pub struct MailQuery {
    pub sender: String,
    pub subject: Option<String>,
    pub since: DateTime<Utc>,
}

trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

struct Connection {
    stream: Box<dyn Transport>,
    buffer: LineBuffer,
    tags: TagGen,
}

impl Connection {
    fn new(stream: Box<dyn Transport>) -> Self {
        Self {
            stream,
            buffer: LineBuffer::new(),
            tags: TagGen::new(),
        }
    }

    /// Next complete line, buffering partial reads until the terminator
    /// shows up. Never assumes a response is complete on first read.
    async fn read_line(&mut self) -> Result<String, MailError> {
        loop {
            if let Some(line) = self.buffer.pop_line() {
                return Ok(line);
            }
            let mut chunk = [0u8; 4096];
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(MailError::Transport("connection closed by peer".into()));
            }
            self.buffer.push(&chunk[..n]);
        }
    }

    async fn write_line(&mut self, line: &str) -> Result<(), MailError> {
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Send one tagged command and collect lines until the matching
    /// tagged completion arrives.
    async fn exchange(&mut self, command: &str) -> Result<TaggedResponse, MailError> {
        let tag = self.tags.next();
        self.write_line(&format!("{} {}", tag, command)).await?;

        let mut untagged = Vec::new();
        loop {
            let line = self.read_line().await?;
            if let Some((status, detail)) = parse_completion(&line, &tag) {
                return Ok(TaggedResponse { status, detail, untagged });
            }
            untagged.push(line);
        }
    }
}

/// One-shot mail retrieval client. Each call opens a fresh connection,
/// runs the handshake/search/fetch sequence, and closes; connections are
/// never pooled. Timeouts are failures here — retry is the caller's
/// policy.
pub struct MailClient {
    creds: MailCredentials,
    config: MailConfig,
}

impl MailClient {
    pub fn new(creds: MailCredentials, config: MailConfig) -> Self {
        Self { creds, config }
    }

    /// Query for the configured verification sender/subject, restricted
    /// to mail received after `since`.
    pub fn verification_query(&self, since: DateTime<Utc>) -> MailQuery {
        MailQuery {
            sender: self.config.verification_sender.clone(),
            subject: Some(self.config.verification_subject.clone()),
            since,
        }
    }

    /// Run one retrieval attempt and return the extracted code, if any
    /// relevant message contains one.
    pub async fn fetch_verification_code(
        &self,
        query: &MailQuery,
    ) -> Result<Option<String>, MailError> {
        // Malformed credentials fail before any socket is opened.
        self.creds
            .validate()
            .map_err(|e| MailError::Validation(e.to_string()))?;

        let handshake = Duration::from_secs(self.config.handshake_timeout_seconds);
        let mut attempt = timed("mail handshake", handshake, self.open_session()).await??;

        let result = self.search_and_fetch(&mut attempt, query).await;

        // Best-effort logout; the attempt is terminal either way.
        let command = Duration::from_secs(self.config.command_timeout_seconds);
        let _ = timed("logout", command, attempt.conn.exchange("LOGOUT")).await;

        match &result {
            Ok(_) => attempt.state = MailState::Done,
            Err(_) => attempt.state = MailState::Failed,
        }
        debug!(state = ?attempt.state, "mail attempt finished");
        result
    }

    /// Connect, read the greeting, upgrade the transport when the peer
    /// advertises it, authenticate, and select the mailbox.
    async fn open_session(&self) -> Result<MailAttempt, MailError> {
        let address = (self.creds.server.as_str(), self.creds.port);
        let tcp = TcpStream::connect(address).await?;
        let mut conn = Connection::new(Box::new(tcp));
        let mut state = MailState::Disconnected;
        debug!(server = %self.creds.server, state = ?state, "connected");

        let greeting = conn.read_line().await?;
        if !greeting.starts_with("* OK") {
            return Err(MailError::Protocol(format!("unexpected greeting: {}", greeting)));
        }
        state = MailState::Greeted;
        debug!(server = %self.creds.server, state = ?state, "greeted");

        let caps = conn.exchange("CAPABILITY").await?;
        let mut advertised = caps.untagged.clone();
        advertised.push(greeting);

        if advertises_starttls(&advertised) {
            let response = conn.exchange("STARTTLS").await?;
            if response.status != CompletionStatus::Ok {
                return Err(MailError::Protocol(format!(
                    "transport upgrade rejected: {}",
                    response.detail
                )));
            }
            state = MailState::Upgrading;
            debug!(server = %self.creds.server, state = ?state, "upgrading transport");

            // The line buffer must be empty across the upgrade; anything
            // buffered was sent in the clear and cannot be trusted.
            let Connection { stream, tags, .. } = conn;
            let tls = self.wrap_tls(stream).await?;
            conn = Connection {
                stream: tls,
                buffer: LineBuffer::new(),
                tags,
            };
        }

        let login = conn
            .exchange(&format!(
                "LOGIN {} {}",
                quote(&self.creds.address),
                quote(&self.creds.secret)
            ))
            .await?;
        if login.status != CompletionStatus::Ok {
            return Err(MailError::Auth(login.detail));
        }
        state = MailState::Authenticated;
        debug!(state = ?state, "authenticated");

        let select = conn
            .exchange(&format!("SELECT {}", self.config.mailbox))
            .await?;
        if select.status != CompletionStatus::Ok {
            return Err(MailError::Protocol(format!(
                "mailbox select rejected: {}",
                select.detail
            )));
        }
        state = MailState::MailboxSelected;
        debug!(mailbox = %self.config.mailbox, state = ?state, "mailbox selected");

        Ok(MailAttempt { conn, state })
    }

    async fn wrap_tls(&self, stream: Box<dyn Transport>) -> Result<Box<dyn Transport>, MailError> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(config));

        let name = ServerName::try_from(self.creds.server.clone())
            .map_err(|e| MailError::Transport(format!("invalid server name: {}", e)))?;
        let tls = connector.connect(name, stream).await?;
        Ok(Box::new(tls))
    }

    /// Search ladder: sender+subject, sender-only, broadened keyword,
    /// then a full window listing as a diagnostic fallback. The first
    /// policy that yields hits wins.
    async fn search_and_fetch(
        &self,
        attempt: &mut MailAttempt,
        query: &MailQuery,
    ) -> Result<Option<String>, MailError> {
        let command = Duration::from_secs(self.config.command_timeout_seconds);

        let skew = chrono::Duration::seconds(self.config.clock_skew_seconds);
        let lookback = chrono::Duration::minutes(self.config.lookback_minutes);
        let floor = Utc::now() - lookback;
        let effective_since = std::cmp::max(query.since - skew, floor);
        let date = search_date(effective_since);

        let mut policies: Vec<(&str, String)> = Vec::new();
        if let Some(subject) = &query.subject {
            policies.push((
                "sender and subject",
                format!(
                    "SEARCH SINCE {} FROM {} SUBJECT {}",
                    date,
                    quote(&query.sender),
                    quote(subject)
                ),
            ));
        }
        policies.push((
            "sender only",
            format!("SEARCH SINCE {} FROM {}", date, quote(&query.sender)),
        ));
        policies.push((
            "broadened subject keyword",
            format!("SEARCH SINCE {} SUBJECT {}", date, quote("code")),
        ));
        policies.push(("full window listing", format!("SEARCH SINCE {}", date)));

        let mut ids: Vec<u32> = Vec::new();
        for (policy, search) in &policies {
            let response = timed("search response", command, attempt.conn.exchange(search)).await??;
            if response.status != CompletionStatus::Ok {
                warn!(policy, detail = %response.detail, "search rejected");
                continue;
            }
            let found = parse_search_ids(&response.untagged);
            if !found.is_empty() {
                info!(policy, hits = found.len(), "search matched");
                ids = found;
                break;
            }
            debug!(policy, "no hits");
        }

        if ids.is_empty() {
            return Ok(None);
        }
        attempt.state = MailState::Searched;

        // Most recent first; sequence numbers ascend with arrival order.
        ids.sort_unstable();
        for id in ids.iter().rev().take(3) {
            let fetch = format!("FETCH {} BODY[TEXT]", id);
            let response = timed("fetch response", command, attempt.conn.exchange(&fetch)).await??;
            if response.status != CompletionStatus::Ok {
                warn!(id, detail = %response.detail, "fetch rejected");
                continue;
            }
            attempt.state = MailState::Fetched;

            let body = match body_from_fetch(&response.untagged) {
                Some(body) => body,
                None => {
                    warn!(id, "fetch response had no body payload");
                    continue;
                }
            };
            if let Some(code) = select_code(&body) {
                info!(id, "verification code extracted");
                return Ok(Some(code));
            }
        }

        Ok(None)
    }
}

struct MailAttempt {
    conn: Connection,
    state: MailState,
}

/// Bound a wait and name the condition being waited for.
async fn timed<T>(
    condition: &str,
    limit: Duration,
    fut: impl std::future::Future<Output = T>,
) -> Result<T, MailError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| MailError::Timeout(condition.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MailConfig {
        MailConfig {
            command_timeout_seconds: 1,
            handshake_timeout_seconds: 1,
            lookback_minutes: 15,
            clock_skew_seconds: 60,
            mailbox: "INBOX".into(),
            verification_sender: "noreply@booking.example".into(),
            verification_subject: "verification".into(),
        }
    }

    #[tokio::test]
    async fn malformed_app_credential_fails_before_any_socket() {
        // An unroutable server: if validation didn't fail first, this
        // test would error differently (or hang past its timeout).
        let creds = MailCredentials {
            address: "user@example.com".into(),
            secret: "abcd1234".into(),
            server: "mail.invalid".into(),
            port: 143,
            app_password_provider: true,
        };
        let client = MailClient::new(creds, config());
        let query = MailQuery {
            sender: "noreply@booking.example".into(),
            subject: None,
            since: Utc::now(),
        };
        let err = client.fetch_verification_code(&query).await.unwrap_err();
        assert!(matches!(err, MailError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_completion_line_times_out() {
        // A listener that greets but never completes any command.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let _ = socket.write_all(b"* OK ready\r\n").await;
                // Swallow whatever arrives without ever answering.
                let mut sink = [0u8; 1024];
                loop {
                    match socket.read(&mut sink).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
            }
        });

        let creds = MailCredentials {
            address: "user@example.com".into(),
            secret: "hunter2hunter2".into(),
            server: "127.0.0.1".into(),
            port,
            app_password_provider: false,
        };
        let client = MailClient::new(creds, config());
        let query = MailQuery {
            sender: "noreply@booking.example".into(),
            subject: Some("verification".into()),
            since: Utc::now(),
        };
        let err = client.fetch_verification_code(&query).await.unwrap_err();
        assert!(matches!(err, MailError::Timeout(_)), "got {:?}", err);
    }
}
