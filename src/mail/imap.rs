//! Mailbox reader backed by raw IMAP over TLS.
//!
//! Speaks just enough IMAP (LOGIN / SELECT / SEARCH / FETCH / STORE) to pull
//! unseen mail from one sender. Blocking socket I/O runs in `spawn_blocking`.

use std::io::Write as IoWrite;
use std::net::TcpStream;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mail_parser::{MessageParser, MimeHeaders};
use uuid::Uuid;

use crate::error::MailError;
use crate::mail::{InboundEmail, MailConfig, MailboxReader};

/// Inbound mail over IMAP.
pub struct ImapMailbox {
    config: MailConfig,
}

impl ImapMailbox {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MailboxReader for ImapMailbox {
    async fn fetch_latest(
        &self,
        from_address: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<InboundEmail>, MailError> {
        let config = self.config.clone();
        let from = from_address.to_string();

        match tokio::task::spawn_blocking(move || fetch_from_sender(&config, &from, since)).await {
            Ok(Ok(found)) => Ok(found),
            Ok(Err(e)) => {
                let reason = e.to_string();
                if reason.contains("login") {
                    Err(MailError::AuthFailed(reason))
                } else {
                    Err(MailError::FetchFailed(reason))
                }
            }
            Err(e) => Err(MailError::FetchFailed(format!("IMAP task panicked: {e}"))),
        }
    }
}

// ── Helpers (public for testing) ────────────────────────────────────

/// Strip HTML tags from content (basic).
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    // Normalize whitespace
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Check whether a parsed sender address matches the one we polled for.
pub fn from_matches(expected: &str, actual: &str) -> bool {
    expected.eq_ignore_ascii_case(actual.trim())
}

/// Parse UIDs out of `* SEARCH ...` response lines.
pub fn parse_search_uids(lines: &[String]) -> Vec<String> {
    let mut uids = Vec::new();
    for line in lines {
        if line.starts_with("* SEARCH") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() > 2 {
                uids.extend(parts[2..].iter().map(|s| s.to_string()));
            }
        }
    }
    uids
}

/// Extract the sender address from a parsed email.
fn extract_sender(parsed: &mail_parser::Message) -> String {
    parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(|a| a.address())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".into())
}

/// Extract readable text from a parsed email.
fn extract_text(parsed: &mail_parser::Message) -> String {
    if let Some(text) = parsed.body_text(0) {
        return text.to_string();
    }
    if let Some(html) = parsed.body_html(0) {
        return strip_html(html.as_ref());
    }
    for part in parsed.attachments() {
        let part: &mail_parser::MessagePart = part;
        if let Some(ct) = MimeHeaders::content_type(part)
            && ct.ctype() == "text"
            && let Ok(text) = std::str::from_utf8(part.contents())
        {
            return text.to_string();
        }
    }
    String::new()
}

/// Extract the received timestamp from a parsed email, falling back to now.
fn extract_received_at(parsed: &mail_parser::Message) -> DateTime<Utc> {
    parsed
        .date()
        .and_then(|d| {
            chrono::NaiveDate::from_ymd_opt(d.year as i32, u32::from(d.month), u32::from(d.day))
                .and_then(|date| {
                    date.and_hms_opt(
                        u32::from(d.hour),
                        u32::from(d.minute),
                        u32::from(d.second),
                    )
                })
                .map(|n| n.and_utc())
        })
        .unwrap_or_else(Utc::now)
}

/// Error type for IMAP fetch operations.
type ImapError = Box<dyn std::error::Error + Send + Sync>;

/// Fetch the newest unseen email from `from_address` received at or after
/// `since`, via raw IMAP over TLS (blocking — run in spawn_blocking).
///
/// Every matching unseen message is marked `\Seen` so the next poll only
/// sees genuinely new mail.
fn fetch_from_sender(
    config: &MailConfig,
    from_address: &str,
    since: DateTime<Utc>,
) -> Result<Option<InboundEmail>, ImapError> {
    use std::sync::Arc as StdArc;

    // Connect TCP
    let tcp = TcpStream::connect((&*config.imap_host, config.imap_port))?;
    tcp.set_read_timeout(Some(Duration::from_secs(30)))?;

    // TLS via rustls
    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = StdArc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    );
    let server_name: rustls::pki_types::ServerName<'_> =
        rustls::pki_types::ServerName::try_from(config.imap_host.clone())?;
    let conn = rustls::ClientConnection::new(tls_config, server_name)?;
    let mut tls = rustls::StreamOwned::new(conn, tcp);

    // ── IMAP helpers ────────────────────────────────────────────────
    let read_line =
        |tls: &mut rustls::StreamOwned<rustls::ClientConnection, TcpStream>| -> Result<String, ImapError> {
            let mut buf = Vec::new();
            loop {
                let mut byte = [0u8; 1];
                match std::io::Read::read(tls, &mut byte) {
                    Ok(0) => return Err("IMAP connection closed".into()),
                    Ok(_) => {
                        buf.push(byte[0]);
                        if buf.ends_with(b"\r\n") {
                            return Ok(String::from_utf8_lossy(&buf).to_string());
                        }
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

    let send_cmd =
        |tls: &mut rustls::StreamOwned<rustls::ClientConnection, TcpStream>,
         tag: &str,
         cmd: &str|
         -> Result<Vec<String>, ImapError> {
            let full = format!("{tag} {cmd}\r\n");
            IoWrite::write_all(tls, full.as_bytes())?;
            IoWrite::flush(tls)?;
            let mut lines = Vec::new();
            loop {
                let line = read_line(tls)?;
                let done = line.starts_with(tag);
                lines.push(line);
                if done {
                    break;
                }
            }
            Ok(lines)
        };

    // Read greeting
    let _greeting = read_line(&mut tls)?;

    // Login
    let login_resp = send_cmd(
        &mut tls,
        "A1",
        &format!("LOGIN \"{}\" \"{}\"", config.username, config.password),
    )?;
    if !login_resp.last().is_some_and(|l| l.contains("OK")) {
        return Err("IMAP login failed".into());
    }

    // Select INBOX
    let _select = send_cmd(&mut tls, "A2", "SELECT \"INBOX\"")?;

    // Search unseen mail from the sender we are watching
    let search_resp = send_cmd(
        &mut tls,
        "A3",
        &format!("SEARCH UNSEEN FROM \"{from_address}\""),
    )?;
    let uids = parse_search_uids(&search_resp);

    let mut newest: Option<InboundEmail> = None;
    let mut tag_counter = 4_u32;

    for uid in &uids {
        let fetch_tag = format!("A{tag_counter}");
        tag_counter += 1;
        let fetch_resp = send_cmd(&mut tls, &fetch_tag, &format!("FETCH {uid} RFC822"))?;

        let raw: String = fetch_resp
            .iter()
            .skip(1)
            .take(fetch_resp.len().saturating_sub(2))
            .cloned()
            .collect();

        if let Some(parsed) = MessageParser::default().parse(raw.as_bytes()) {
            let sender = extract_sender(&parsed);
            let received_at = extract_received_at(&parsed);

            // SEARCH FROM matches on the whole header, so re-check the address
            if from_matches(from_address, &sender) && received_at >= since {
                let subject = parsed.subject().unwrap_or("(no subject)").to_string();
                let body = extract_text(&parsed);
                let message_id = parsed
                    .message_id()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("gen-{}", Uuid::new_v4()));

                let keep = newest
                    .as_ref()
                    .is_none_or(|current| received_at > current.received_at);
                if keep {
                    newest = Some(InboundEmail {
                        message_id,
                        from: sender,
                        subject,
                        body,
                        received_at,
                    });
                }
            }
        }

        // Mark as seen
        let store_tag = format!("A{tag_counter}");
        tag_counter += 1;
        let _ = send_cmd(&mut tls, &store_tag, &format!("STORE {uid} +FLAGS (\\Seen)"));
    }

    // Logout
    let logout_tag = format!("A{tag_counter}");
    let _ = send_cmd(&mut tls, &logout_tag, "LOGOUT");

    Ok(newest)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── HTML stripping tests ────────────────────────────────────────

    #[test]
    fn strip_html_basic() {
        assert_eq!(strip_html("<p>Hello</p>"), "Hello");
    }

    #[test]
    fn strip_html_nested_tags() {
        assert_eq!(
            strip_html("<div><b>Bold</b> and <i>italic</i></div>"),
            "Bold and italic"
        );
    }

    #[test]
    fn strip_html_with_attributes() {
        assert_eq!(
            strip_html(r#"<a href="https://example.com">Link</a>"#),
            "Link"
        );
    }

    #[test]
    fn strip_html_whitespace_normalized() {
        assert_eq!(strip_html("<p>  Hello   World  </p>"), "Hello World");
    }

    #[test]
    fn strip_html_plain_text_passthrough() {
        assert_eq!(strip_html("No HTML here"), "No HTML here");
    }

    // ── Sender matching tests ───────────────────────────────────────

    #[test]
    fn from_matches_exact() {
        assert!(from_matches("alice@example.com", "alice@example.com"));
    }

    #[test]
    fn from_matches_case_insensitive() {
        assert!(from_matches("alice@example.com", "Alice@Example.COM"));
    }

    #[test]
    fn from_matches_trims_whitespace() {
        assert!(from_matches("alice@example.com", " alice@example.com "));
    }

    #[test]
    fn from_matches_rejects_other_sender() {
        assert!(!from_matches("alice@example.com", "bob@example.com"));
    }

    // ── SEARCH response parsing tests ───────────────────────────────

    #[test]
    fn search_uids_parsed_from_response() {
        let lines = vec![
            "* SEARCH 3 7 12\r\n".to_string(),
            "A3 OK SEARCH completed\r\n".to_string(),
        ];
        assert_eq!(parse_search_uids(&lines), vec!["3", "7", "12"]);
    }

    #[test]
    fn search_uids_empty_result() {
        let lines = vec![
            "* SEARCH\r\n".to_string(),
            "A3 OK SEARCH completed\r\n".to_string(),
        ];
        assert!(parse_search_uids(&lines).is_empty());
    }

    #[test]
    fn search_uids_ignores_unrelated_lines() {
        let lines = vec![
            "* 14 EXISTS\r\n".to_string(),
            "* SEARCH 2\r\n".to_string(),
            "A3 OK SEARCH completed\r\n".to_string(),
        ];
        assert_eq!(parse_search_uids(&lines), vec!["2"]);
    }
}
