//! Audit sink: durable join/win records, decoupled from game state.
//!
//! The coordinator invokes the sink after a mutation commits. Failures
//! are logged and swallowed — they never roll back or block game state.
//! Implementations must not block the caller; anything that does real
//! I/O should enqueue internally and flush on its own schedule.

use std::time::{SystemTime, UNIX_EPOCH};

use tombola_protocol::BoardId;

/// One record per successful join.
#[derive(Debug, Clone)]
pub struct PlayerJoinedRecord {
    pub name: String,
    pub contact: String,
    pub board_id: BoardId,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

/// One record per confirmed win.
#[derive(Debug, Clone)]
pub struct PlayerWonRecord {
    pub name: String,
    pub board_id: BoardId,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

/// An audit write failed. The coordinator logs this and moves on.
#[derive(Debug, thiserror::Error)]
#[error("audit write failed: {0}")]
pub struct AuditError(pub String);

/// Receives append-only join/win records, best-effort.
///
/// Ordering is not transactional with in-memory state: a record may
/// arrive after the session that produced it has already moved on.
pub trait AuditSink: Send + Sync + 'static {
    fn player_joined(
        &self,
        record: PlayerJoinedRecord,
    ) -> Result<(), AuditError>;

    fn player_won(&self, record: PlayerWonRecord) -> Result<(), AuditError>;
}

/// Writes audit records to the `audit` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn player_joined(
        &self,
        record: PlayerJoinedRecord,
    ) -> Result<(), AuditError> {
        tracing::info!(
            target: "audit",
            name = %record.name,
            contact = %record.contact,
            board = %record.board_id,
            timestamp_ms = record.timestamp_ms,
            "player joined"
        );
        Ok(())
    }

    fn player_won(&self, record: PlayerWonRecord) -> Result<(), AuditError> {
        tracing::info!(
            target: "audit",
            name = %record.name,
            board = %record.board_id,
            timestamp_ms = record.timestamp_ms,
            "player won"
        );
        Ok(())
    }
}

/// Discards every record. Useful in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn player_joined(
        &self,
        _record: PlayerJoinedRecord,
    ) -> Result<(), AuditError> {
        Ok(())
    }

    fn player_won(&self, _record: PlayerWonRecord) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Current wall-clock time as milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sink_accepts_records() {
        let sink = NullAuditSink;
        sink.player_joined(PlayerJoinedRecord {
            name: "Lupe".into(),
            contact: "table 4".into(),
            board_id: BoardId(3),
            timestamp_ms: 12345,
        })
        .unwrap();
        sink.player_won(PlayerWonRecord {
            name: "Lupe".into(),
            board_id: BoardId(3),
            timestamp_ms: 12346,
        })
        .unwrap();
    }

    #[test]
    fn test_now_ms_is_monotonic_enough() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
        assert!(a > 0, "the clock should be past the epoch");
    }
}
