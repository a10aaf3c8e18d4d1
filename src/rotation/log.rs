//! Append-only assignment log
//!
//! Provides the durable history every cycle is derived from. The file
//! backend writes one JSON object per line to `<data_dir>/assignments.jsonl`.
//! A line only counts once its terminating newline is on disk, so readers
//! never observe a half-written assignment.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use crate::error::PersistenceError;
use crate::rotation::{Assignment, NewAssignment};

/// Log file name for live runs
pub const LIVE_LOG_FILE: &str = "assignments.jsonl";
/// Log file name for test-mode runs, kept apart from live history
pub const TEST_LOG_FILE: &str = "assignments-test.jsonl";

/// Durable, append-only store of assignments.
#[async_trait]
pub trait AssignmentLog: Send + Sync {
    /// Append one assignment and return it as written.
    async fn append(&self, new: NewAssignment) -> Result<Assignment, PersistenceError>;

    /// Every committed assignment, in the order they were written.
    async fn read_all(&self) -> Result<Vec<Assignment>, PersistenceError>;
}

/// JSONL file backend
pub struct JsonlAssignmentLog {
    log_path: PathBuf,
    timeout: Duration,
}

impl JsonlAssignmentLog {
    /// Create a log at `<log_dir>/<file_name>`
    ///
    /// # Errors
    /// Returns an error if the log directory cannot be created
    pub fn new<P: AsRef<Path>>(
        log_dir: P,
        file_name: &str,
        timeout: Duration,
    ) -> Result<Self, PersistenceError> {
        let log_dir = log_dir.as_ref();
        std::fs::create_dir_all(log_dir)?;

        Ok(Self {
            log_path: log_dir.join(file_name),
            timeout,
        })
    }

    /// Get the path to the log file
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, PersistenceError>
    where
        F: std::future::Future<Output = Result<T, PersistenceError>> + Send,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| PersistenceError::Timeout {
                op,
                after: self.timeout,
            })?
    }
}

/// Read the committed prefix of the log.
///
/// Returns the parsed assignments and the byte length of the committed
/// prefix.
async fn read_committed(path: &Path) -> Result<(Vec<Assignment>, u64), PersistenceError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
        Err(e) => return Err(e.into()),
    };
    let committed = committed_prefix(&content);
    Ok((parse_lines(committed)?, committed.len() as u64))
}

/// Everything up to and including the last newline.
fn committed_prefix(content: &str) -> &str {
    content.rfind('\n').map_or("", |end| &content[..=end])
}

fn parse_lines(committed: &str) -> Result<Vec<Assignment>, PersistenceError> {
    let mut assignments = Vec::new();

    for (line_num, line) in committed.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let assignment = serde_json::from_str(line).map_err(|source| PersistenceError::Corrupt {
            line: line_num + 1,
            source,
        })?;
        assignments.push(assignment);
    }

    Ok(assignments)
}

fn next_id(existing: &[Assignment]) -> Result<u64, PersistenceError> {
    existing
        .iter()
        .map(|a| a.id)
        .max()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or(PersistenceError::Overflow {
            counter: "assignment id",
        })
}

#[async_trait]
impl AssignmentLog for JsonlAssignmentLog {
    async fn append(&self, new: NewAssignment) -> Result<Assignment, PersistenceError> {
        self.bounded("append", async {
            let (existing, committed_len) = read_committed(&self.log_path).await?;

            let assignment = Assignment {
                id: next_id(&existing)?,
                member_id: new.member_id,
                duty_kind: new.duty_kind,
                cycle_id: new.cycle_id,
                assigned_at: Utc::now(),
            };
            let json = serde_json::to_string(&assignment).map_err(PersistenceError::Serialize)?;

            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(false)
                .open(&self.log_path)
                .await?;

            // Drop any torn tail left by an interrupted write
            file.set_len(committed_len).await?;
            file.seek(SeekFrom::End(0)).await?;
            file.write_all(format!("{json}\n").as_bytes()).await?;
            file.flush().await?;
            file.sync_data().await?;

            Ok::<_, PersistenceError>(assignment)
        })
        .await
    }

    async fn read_all(&self) -> Result<Vec<Assignment>, PersistenceError> {
        self.bounded("read", async {
            let (assignments, _) = read_committed(&self.log_path).await?;
            Ok::<_, PersistenceError>(assignments)
        })
        .await
    }
}

/// In-process backend for tests and dry runs.
#[derive(Default)]
pub struct MemoryAssignmentLog {
    entries: Mutex<Vec<Assignment>>,
}

impl MemoryAssignmentLog {
    /// An empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A log pre-filled with existing history
    #[must_use]
    pub const fn with_history(entries: Vec<Assignment>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Snapshot of the log contents
    #[must_use]
    pub fn entries(&self) -> Vec<Assignment> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AssignmentLog for MemoryAssignmentLog {
    async fn append(&self, new: NewAssignment) -> Result<Assignment, PersistenceError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let assignment = Assignment {
            id: next_id(&entries)?,
            member_id: new.member_id,
            duty_kind: new.duty_kind,
            cycle_id: new.cycle_id,
            assigned_at: Utc::now(),
        };
        entries.push(assignment.clone());
        Ok(assignment)
    }

    async fn read_all(&self) -> Result<Vec<Assignment>, PersistenceError> {
        Ok(self.entries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duty::DutyKind;
    use tempfile::TempDir;

    fn new_assignment(member_id: u32, cycle_id: u32) -> NewAssignment {
        NewAssignment {
            member_id,
            duty_kind: DutyKind::Coffee,
            cycle_id,
        }
    }

    fn open_log(dir: &Path) -> JsonlAssignmentLog {
        JsonlAssignmentLog::new(dir, LIVE_LOG_FILE, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_new_log_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join(".rota");

        let log = open_log(&log_dir);

        assert!(log_dir.exists());
        assert_eq!(log.log_path(), log_dir.join("assignments.jsonl"));
    }

    #[tokio::test]
    async fn test_read_all_empty_log() {
        let temp_dir = TempDir::new().unwrap();
        let log = open_log(temp_dir.path());

        assert!(log.read_all().await.unwrap().is_empty());
        assert!(!log.log_path().exists());
    }

    #[tokio::test]
    async fn test_append_assigns_sequential_ids() {
        let temp_dir = TempDir::new().unwrap();
        let log = open_log(temp_dir.path());

        let first = log.append(new_assignment(1, 1)).await.unwrap();
        let second = log.append(new_assignment(2, 1)).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        let content = std::fs::read_to_string(log.log_path()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_read_all_returns_written_order() {
        let temp_dir = TempDir::new().unwrap();
        let log = open_log(temp_dir.path());

        log.append(new_assignment(3, 1)).await.unwrap();
        log.append(new_assignment(1, 1)).await.unwrap();

        let entries = log.read_all().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].member_id, 3);
        assert_eq!(entries[1].member_id, 1);
        assert_eq!(entries[1].duty_kind, DutyKind::Coffee);
    }

    #[tokio::test]
    async fn test_unterminated_tail_is_not_committed() {
        let temp_dir = TempDir::new().unwrap();
        let log = open_log(temp_dir.path());
        log.append(new_assignment(1, 1)).await.unwrap();

        let mut content = std::fs::read_to_string(log.log_path()).unwrap();
        content.push_str(r#"{"id":2,"member_id":2,"duty_kind":"cof"#);
        std::fs::write(log.log_path(), &content).unwrap();

        let entries = log.read_all().await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_append_discards_torn_tail() {
        let temp_dir = TempDir::new().unwrap();
        let log = open_log(temp_dir.path());
        log.append(new_assignment(1, 1)).await.unwrap();

        let mut content = std::fs::read_to_string(log.log_path()).unwrap();
        content.push_str("{\"id\":2,\"mem");
        std::fs::write(log.log_path(), &content).unwrap();

        let written = log.append(new_assignment(2, 1)).await.unwrap();
        assert_eq!(written.id, 2);

        let entries = log.read_all().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].member_id, 2);
    }

    #[tokio::test]
    async fn test_corrupt_committed_line_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let log = open_log(temp_dir.path());
        std::fs::write(log.log_path(), "not json\n").unwrap();

        let err = log.read_all().await.unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupt { line: 1, .. }));
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let log = open_log(temp_dir.path());
        log.append(new_assignment(1, 1)).await.unwrap();

        let mut content = std::fs::read_to_string(log.log_path()).unwrap();
        content.push('\n');
        std::fs::write(log.log_path(), &content).unwrap();

        assert_eq!(log.read_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_log_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let log = open_log(temp_dir.path());
        std::fs::create_dir(log.log_path()).unwrap();

        let err = log.read_all().await.unwrap_err();
        assert!(matches!(err, PersistenceError::Io(_)));
    }

    #[tokio::test]
    async fn test_bounded_times_out_stalled_operation() {
        let temp_dir = TempDir::new().unwrap();
        let log =
            JsonlAssignmentLog::new(temp_dir.path(), LIVE_LOG_FILE, Duration::from_millis(10))
                .unwrap();

        let err = log
            .bounded("read", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, PersistenceError>(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PersistenceError::Timeout { op: "read", .. }));
    }

    #[tokio::test]
    async fn test_bounded_passes_through_fast_operation() {
        let temp_dir = TempDir::new().unwrap();
        let log = open_log(temp_dir.path());

        let value = log
            .bounded("read", async { Ok::<_, PersistenceError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_committed_prefix() {
        assert_eq!(committed_prefix(""), "");
        assert_eq!(committed_prefix("partial"), "");
        assert_eq!(committed_prefix("a\nb"), "a\n");
        assert_eq!(committed_prefix("a\nb\n"), "a\nb\n");
    }

    #[tokio::test]
    async fn test_memory_log_appends_with_ids() {
        let log = MemoryAssignmentLog::new();
        let first = log.append(new_assignment(5, 2)).await.unwrap();
        let second = log.append(new_assignment(6, 2)).await.unwrap();

        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(log.read_all().await.unwrap(), log.entries());
    }

    #[tokio::test]
    async fn test_append_past_max_id_is_overflow() {
        let log = MemoryAssignmentLog::with_history(vec![log_entry(u64::MAX)]);

        let err = log.append(new_assignment(2, 3)).await.unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::Overflow {
                counter: "assignment id"
            }
        ));
        assert_eq!(log.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_jsonl_append_past_max_id_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let log = open_log(temp_dir.path());
        let line = serde_json::to_string(&log_entry(u64::MAX)).unwrap();
        std::fs::write(log.log_path(), format!("{line}\n")).unwrap();

        let err = log.append(new_assignment(2, 1)).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Overflow { .. }));
        assert_eq!(log.read_all().await.unwrap().len(), 1);
    }

    fn log_entry(id: u64) -> Assignment {
        Assignment {
            id,
            member_id: 1,
            duty_kind: DutyKind::Coffee,
            cycle_id: 1,
            assigned_at: Utc::now(),
        }
    }
}
