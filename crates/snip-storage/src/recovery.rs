use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use snip_core::{Record, Result, StorageError, Token};
use std::fmt::{Debug, Formatter};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One line of the recovery log: the state of a record right after a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub hash: String,
    pub original_url: String,
    pub user_id: String,
    pub is_deleted: bool,
}

impl From<&Record> for LogEntry {
    fn from(record: &Record) -> Self {
        Self {
            hash: record.token.as_str().to_owned(),
            original_url: record.original_url.clone(),
            user_id: record.owner_id.clone(),
            is_deleted: record.deleted,
        }
    }
}

impl From<LogEntry> for Record {
    fn from(entry: LogEntry) -> Self {
        Self {
            token: Token::new(entry.hash),
            original_url: entry.original_url,
            owner_id: entry.user_id,
            deleted: entry.is_deleted,
        }
    }
}

/// Append-only JSON-lines file mirroring every mutation of a memory engine.
///
/// Each line is handed to the writer in a single `write_all` under one lock,
/// so concurrent appends never interleave. The file is only ever appended
/// to; the one exception is a torn final line left by a crash mid-write,
/// which [`RecoveryLog::open`] cuts off before appending resumes.
///
/// Appends are synchronous writes. Callers holding a lock across an append
/// block that lock for the duration of the write.
pub struct RecoveryLog {
    path: PathBuf,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Debug for RecoveryLog {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryLog")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Outcome of reading a log from the start.
struct Replay {
    entries: Vec<LogEntry>,
    /// Bytes covered by `entries` (and blank lines between them).
    valid_len: u64,
    /// The last entry decoded fine but its line lacks the terminating newline.
    unterminated: bool,
}

impl RecoveryLog {
    /// Opens (creating if needed) the log at `path` and replays it.
    ///
    /// Returns the log ready for appending together with every entry in file
    /// order. A malformed complete line is fatal. A final line without a
    /// newline is kept when it decodes, and cut off when it does not.
    pub fn open(path: &Path) -> Result<(Self, Vec<LogEntry>)> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| io_error(path, e))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .map_err(|e| io_error(path, e))?;

        let replay = replay(&file, path)?;

        let len = file.metadata().map_err(|e| io_error(path, e))?.len();
        if replay.valid_len < len {
            warn!(
                path = %path.display(),
                torn_bytes = len - replay.valid_len,
                "cutting torn final line off recovery log"
            );
            file.set_len(replay.valid_len)
                .map_err(|e| io_error(path, e))?;
        }
        if replay.unterminated {
            debug!(path = %path.display(), "terminating complete final line");
            file.write_all(b"\n").map_err(|e| io_error(path, e))?;
        }

        debug!(path = %path.display(), entries = replay.entries.len(), "recovery log replayed");

        Ok((Self::with_writer(path, file), replay.entries))
    }

    /// Builds a log that appends to `writer`. Nothing is replayed.
    pub fn with_writer(path: impl Into<PathBuf>, writer: impl Write + Send + 'static) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Appends one entry and flushes it.
    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)
            .map_err(|e| StorageError::RecoveryLog(format!("failed to encode entry: {e}")))?;
        line.push(b'\n');

        let mut writer = self.writer.lock();
        writer
            .write_all(&line)
            .map_err(|e| io_error(&self.path, e))?;
        writer.flush().map_err(|e| io_error(&self.path, e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reads lines from the start of `file` until the end or the first line
/// without a terminating newline.
fn replay(file: &File, path: &Path) -> Result<Replay> {
    let mut reader = BufReader::new(file);
    let mut entries = Vec::new();
    let mut offset = 0u64;
    let mut unterminated = false;
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|e| io_error(path, e))?;
        if read == 0 {
            break;
        }

        let body = line.trim_ascii();
        if line.last() != Some(&b'\n') {
            // a crash may leave the last line half written
            if let Ok(entry) = serde_json::from_slice::<LogEntry>(body) {
                entries.push(entry);
                offset += read as u64;
                unterminated = true;
            }
            break;
        }

        if !body.is_empty() {
            let entry = serde_json::from_slice::<LogEntry>(body).map_err(|e| {
                StorageError::RecoveryLog(format!(
                    "malformed entry in {} at byte {offset}: {e}",
                    path.display()
                ))
            })?;
            entries.push(entry);
        }
        offset += read as u64;
    }

    Ok(Replay {
        entries,
        valid_len: offset,
        unterminated,
    })
}

fn io_error(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::RecoveryLog(format!("{}: {err}", path.display()))
}
