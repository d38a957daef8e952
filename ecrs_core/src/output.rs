//! Process-wide output channel.
//!
//! One file, opened once, shared by every observer, closed once at teardown.
//!
//! ```text
//! Unopened ──open──► Open ──close──► Closed
//! ```
//!
//! Each write holds the channel lock for the whole line, so records from
//! concurrently running callbacks never interleave.

use crate::error::{OutputError, SequencingError};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{debug, info};

/// Default output file name.
pub const DEFAULT_OUTPUT: &str = "Cosmic_Output.dat";

/// Observable state of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Unopened,
    Open,
    Closed,
}

enum Sink {
    Unopened,
    Open(BufWriter<File>),
    Closed,
}

struct Inner {
    sink: Sink,
    path: Option<PathBuf>,
    lines_written: u64,
}

/// The single writable output resource.
pub struct OutputChannel {
    inner: Mutex<Inner>,
}

static INSTANCE: OnceLock<Arc<OutputChannel>> = OnceLock::new();

impl OutputChannel {
    /// Creates a detached, unopened channel.
    ///
    /// The binary uses `instance()`; detached channels exist for tests and
    /// embedding.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                sink: Sink::Unopened,
                path: None,
                lines_written: 0,
            }),
        }
    }
    
    /// Returns the process-wide channel, creating it on first call.
    pub fn instance() -> Arc<OutputChannel> {
        Arc::clone(INSTANCE.get_or_init(|| Arc::new(OutputChannel::new())))
    }
    
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
    
    /// Opens the output file. Truncates unless `append` is set.
    pub fn open(&self, path: impl AsRef<Path>, append: bool) -> Result<(), OutputError> {
        let path = path.as_ref();
        let mut inner = self.lock();
        match inner.sink {
            Sink::Open(_) => return Err(SequencingError::AlreadyOpen.into()),
            Sink::Closed => return Err(SequencingError::ReopenAfterClose.into()),
            Sink::Unopened => {}
        }
        
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;
        
        inner.sink = Sink::Open(BufWriter::new(file));
        inner.path = Some(path.to_path_buf());
        info!("Output channel open: {}", path.display());
        Ok(())
    }
    
    /// Writes one line.
    pub fn write_line(&self, line: &str) -> Result<(), OutputError> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        match &mut inner.sink {
            Sink::Unopened => Err(SequencingError::WriteWhileUnopened.into()),
            Sink::Closed => Err(SequencingError::WriteAfterClose.into()),
            Sink::Open(writer) => {
                writeln!(writer, "{}", line)?;
                inner.lines_written += 1;
                Ok(())
            }
        }
    }
    
    /// Flushes and closes the file. Closing twice is a no-op.
    pub fn close(&self) -> Result<(), OutputError> {
        let mut inner = self.lock();
        match std::mem::replace(&mut inner.sink, Sink::Closed) {
            Sink::Open(mut writer) => {
                writer.flush()?;
                info!("Output channel closed after {} lines", inner.lines_written);
            }
            Sink::Unopened => debug!("Output channel closed without being opened"),
            Sink::Closed => {}
        }
        Ok(())
    }
    
    /// Current state.
    pub fn state(&self) -> ChannelState {
        match self.lock().sink {
            Sink::Unopened => ChannelState::Unopened,
            Sink::Open(_) => ChannelState::Open,
            Sink::Closed => ChannelState::Closed,
        }
    }
    
    /// Path of the opened file, if any.
    pub fn path(&self) -> Option<PathBuf> {
        self.lock().path.clone()
    }
    
    /// Number of lines written so far.
    pub fn lines_written(&self) -> u64 {
        self.lock().lines_written
    }
}

impl Default for OutputChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("ecrs-output-{}.dat", uuid::Uuid::new_v4()))
    }
    
    #[test]
    fn test_write_before_open_fails() {
        let channel = OutputChannel::new();
        let err = channel.write_line("x").unwrap_err();
        assert!(matches!(err, OutputError::Sequencing(SequencingError::WriteWhileUnopened)));
    }
    
    #[test]
    fn test_write_after_close_fails() {
        let path = temp_path();
        let channel = OutputChannel::new();
        channel.open(&path, false).unwrap();
        channel.write_line("first").unwrap();
        channel.close().unwrap();
        
        let err = channel.write_line("late").unwrap_err();
        assert!(matches!(err, OutputError::Sequencing(SequencingError::WriteAfterClose)));
        
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first\n");
        let _ = std::fs::remove_file(path);
    }
    
    #[test]
    fn test_open_twice_rejected() {
        let path = temp_path();
        let channel = OutputChannel::new();
        channel.open(&path, false).unwrap();
        
        let err = channel.open(&path, false).unwrap_err();
        assert!(matches!(err, OutputError::Sequencing(SequencingError::AlreadyOpen)));
        assert_eq!(channel.state(), ChannelState::Open);
        
        channel.close().unwrap();
        let err = channel.open(&path, false).unwrap_err();
        assert!(matches!(err, OutputError::Sequencing(SequencingError::ReopenAfterClose)));
        let _ = std::fs::remove_file(path);
    }
    
    #[test]
    fn test_close_idempotent() {
        let path = temp_path();
        let channel = OutputChannel::new();
        channel.open(&path, false).unwrap();
        channel.close().unwrap();
        channel.close().unwrap();
        assert_eq!(channel.state(), ChannelState::Closed);
        let _ = std::fs::remove_file(path);
    }
    
    #[test]
    fn test_append_mode_keeps_contents() {
        let path = temp_path();
        std::fs::write(&path, "previous\n").unwrap();
        
        let channel = OutputChannel::new();
        channel.open(&path, true).unwrap();
        channel.write_line("next").unwrap();
        channel.close().unwrap();
        
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous\nnext\n");
        assert_eq!(channel.lines_written(), 1);
        let _ = std::fs::remove_file(path);
    }
    
    #[test]
    fn test_instance_is_shared() {
        let a = OutputChannel::instance();
        let b = OutputChannel::instance();
        assert!(Arc::ptr_eq(&a, &b));
    }
    
    #[test]
    fn test_concurrent_writes_do_not_interleave() {
        let path = temp_path();
        let channel = Arc::new(OutputChannel::new());
        channel.open(&path, false).unwrap();
        
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let channel = Arc::clone(&channel);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        channel.write_line(&format!("thread {} line {}", t, i)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        channel.close().unwrap();
        
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 400);
        assert!(contents.lines().all(|l| l.starts_with("thread ")));
        let _ = std::fs::remove_file(path);
    }
}
