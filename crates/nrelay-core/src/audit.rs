use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Local;
use serde::Serialize;

use crate::Result;

const AUDIT_MAX_TEXT: usize = 500;

pub const MESSAGES_LOG: &str = "messages.log";
pub const MESSAGES_JSONL: &str = "messages.jsonl";
pub const AUTH_LOG: &str = "auth.log";
pub const ERRORS_LOG: &str = "errors.log";

/// Local ISO-8601 timestamp with milliseconds.
pub fn local_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}

/// One send or auth attempt.
///
/// `channel` is the delivery channel for sends and the authenticator (`ldap`/`file`)
/// for logins.
#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub user: String,
    pub channel: String,
    pub recipient: String,
    pub message: String,
    pub status: String,
}

impl AuditEvent {
    pub fn new(channel: &str, recipient: &str, message: &str, user: &str, status: &str) -> Self {
        Self {
            timestamp: local_timestamp(),
            user: user.to_string(),
            channel: channel.to_string(),
            recipient: recipient.to_string(),
            message: message.to_string(),
            status: status.to_string(),
        }
    }

    /// `[timestamp] user -> channel: recipient - status`
    pub fn short_line(&self) -> String {
        format!(
            "[{}] {} -> {}: {} - {}",
            self.timestamp, self.user, self.channel, self.recipient, self.status
        )
    }
}

/// Append-only audit trail under `<data>/logs/`.
///
/// Write failures are reported through `tracing` and never fail the audited
/// operation.
#[derive(Clone, Debug)]
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record(&self, mut event: AuditEvent) {
        for field in [
            &mut event.user,
            &mut event.channel,
            &mut event.recipient,
            &mut event.status,
        ] {
            *field = flatten_lines(field);
        }
        event.message = truncate_text(&flatten_lines(&event.message), AUDIT_MAX_TEXT);

        tracing::info!("{}", event.short_line());
        self.append_or_warn(MESSAGES_LOG, &event.short_line());
        match serde_json::to_string(&event) {
            Ok(line) => self.append_or_warn(MESSAGES_JSONL, &line),
            Err(e) => tracing::warn!("audit event not serializable: {e}"),
        }
    }

    pub fn message(&self, channel: &str, recipient: &str, message: &str, user: &str, status: &str) {
        self.record(AuditEvent::new(channel, recipient, message, user, status));
    }

    pub fn auth_attempt(&self, username: &str, success: bool) {
        let status = if success { "SUCCESS" } else { "FAILED" };
        let line = format!(
            "[{}] AUTH {status} - User: {}",
            local_timestamp(),
            flatten_lines(username)
        );
        tracing::info!("{line}");
        self.append_or_warn(AUTH_LOG, &line);
    }

    pub fn error(&self, operation: &str, detail: &str, user: &str) {
        let line = format!(
            "[{}] ERROR - {}: {} - User: {}",
            local_timestamp(),
            flatten_lines(operation),
            flatten_lines(detail),
            flatten_lines(user)
        );
        tracing::error!("{line}");
        self.append_or_warn(ERRORS_LOG, &line);
    }

    fn append_or_warn(&self, file: &str, line: &str) {
        if let Err(e) = self.append(file, line) {
            tracing::warn!("audit write to {file} failed: {e}");
        }
    }

    fn append(&self, file: &str, line: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file))?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

/// One log record per line: caller-supplied text never carries a line break.
fn flatten_lines(s: &str) -> String {
    s.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}
