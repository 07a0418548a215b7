//! Progress bars for ingestion, and a log writer that keeps them pinned.

use crate::engine::ProgressHook;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::sync::{Arc, OnceLock};
use tracing_subscriber::fmt::MakeWriter;

static MULTI_PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

const EMBED_TEMPLATE: &str = "{spinner} {msg} [{bar:30}] {pos}/{len} chunks ({elapsed})";

fn multi_progress() -> &'static MultiProgress {
    MULTI_PROGRESS.get_or_init(|| {
        let mp = MultiProgress::new();
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        mp
    })
}

pub fn add_progress_bar(len: u64) -> ProgressBar {
    multi_progress().add(ProgressBar::new(len))
}

/// A hook that drives one progress bar per ingestion, labelled with `label`.
///
/// The bar is created on the first report and finished once every chunk
/// has been embedded.
pub fn embedding_progress(label: impl Into<String>) -> ProgressHook {
    let label = label.into();
    let bar: Arc<OnceLock<ProgressBar>> = Arc::new(OnceLock::new());

    Arc::new(move |done: usize, total: usize| {
        let bar = bar.get_or_init(|| {
            let bar = add_progress_bar(total as u64);
            if let Ok(style) = ProgressStyle::with_template(EMBED_TEMPLATE) {
                bar.set_style(style.progress_chars("=> "));
            }
            bar.set_message(format!("Embedding {}", label));
            bar
        });
        bar.set_length(total as u64);
        bar.set_position(done as u64);
        if done >= total {
            bar.finish_and_clear();
        }
    })
}

#[derive(Default, Clone)]
pub struct LogWriterFactory;

/// Buffers log output and prints whole lines above any active bars
pub struct LogWriter {
    buffer: String,
}

impl LogWriter {
    fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    fn print_line(line: &str) {
        let _ = multi_progress().println(line.trim_end_matches('\r'));
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.push_str(&String::from_utf8_lossy(buf));

        while let Some(idx) = self.buffer.find('\n') {
            Self::print_line(&self.buffer[..idx]);
            self.buffer.drain(..idx + 1);
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            Self::print_line(rest.trim_end_matches('\n'));
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter::new()
    }
}
