//! `tracing` output routed to logcat on device and to stderr elsewhere.

use std::io::{self, Write};
use std::sync::Once;
use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const TAG: &str = "ox-common";

static INIT: Once = Once::new();

/// Installs the global subscriber once. Later calls are no-ops, so a
/// re-attach cannot change the level.
pub fn init(level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(LogcatMakeWriter)
            .with_ansi(false)
            .without_time()
            .with_target(false)
            .try_init();
        if let Err(e) = installed {
            // Someone else owns the global dispatcher; log through theirs.
            tracing::debug!(error = %e, "tracing subscriber already set");
        }
    });
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogcatMakeWriter;

impl<'a> MakeWriter<'a> for LogcatMakeWriter {
    type Writer = LogcatWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogcatWriter::new(Level::INFO)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        LogcatWriter::new(*meta.level())
    }
}

/// Collects one formatted event and emits it as a single line on drop.
pub struct LogcatWriter {
    level: Level,
    buf: Vec<u8>,
}

impl LogcatWriter {
    fn new(level: Level) -> Self {
        Self {
            level,
            buf: Vec::with_capacity(128),
        }
    }

    fn line(&self) -> String {
        String::from_utf8_lossy(&self.buf).trim_end().to_string()
    }
}

/// `android/log.h` priority for a tracing level.
fn priority(level: Level) -> i32 {
    match level {
        Level::TRACE => 2,
        Level::DEBUG => 3,
        Level::INFO => 4,
        Level::WARN => 5,
        Level::ERROR => 6,
    }
}

impl Write for LogcatWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LogcatWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        emit(priority(self.level), &self.line());
    }
}

#[cfg(target_os = "android")]
fn emit(prio: i32, msg: &str) {
    use std::ffi::CString;

    let tag = CString::new(TAG).unwrap_or_default();
    let text = CString::new(msg.replace('\0', "?")).unwrap_or_default();
    unsafe {
        android_log_sys::__android_log_write(prio as _, tag.as_ptr(), text.as_ptr());
    }
}

#[cfg(not(target_os = "android"))]
fn emit(prio: i32, msg: &str) {
    let _ = writeln!(io::stderr().lock(), "{TAG}[{prio}] {msg}");
}
