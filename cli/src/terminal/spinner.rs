use std::io::{self, Write};
use std::sync::OnceLock;
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::Metadata;
use tracing_subscriber::fmt::MakeWriter;

use crate::terminal::colors;
use crate::terminal::print::PRINT_TARGET;

static SPINNER: OnceLock<ProgressBar> = OnceLock::new();

pub fn get_spinner() -> &'static ProgressBar {
    SPINNER.get_or_init(init_spinner)
}

fn init_spinner() -> ProgressBar {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden());
    let style = ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ]);
    pb.set_style(style);
    pb
}

/// Shows the spinner on stderr until [`finish`].
pub fn start(msg: &str) {
    let pb = get_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_message(format!("{}", msg.italic().color(colors::TEXT_DEFAULT)));
    pb.enable_steady_tick(Duration::from_millis(100));
}

pub fn finish() {
    get_spinner().finish_and_clear();
}

pub fn report_discovery_progress(count: usize) {
    get_spinner().set_message(
        format!(
            "Identified {} so far...",
            format!("{count} hosts").green().bold()
        )
        .color(colors::TEXT_DEFAULT)
        .to_string(),
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Writes around the spinner so its line is redrawn below the output.
pub struct SpinnerWriter {
    stream: Stream,
}

impl Write for SpinnerWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        get_spinner().suspend(|| match self.stream {
            Stream::Stdout => io::stdout().lock().write_all(buf),
            Stream::Stderr => io::stderr().lock().write_all(buf),
        })?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream {
            Stream::Stdout => io::stdout().flush(),
            Stream::Stderr => io::stderr().flush(),
        }
    }
}

/// Terminal output goes to stdout, every log line to stderr.
pub struct TerminalOutput;

impl<'a> MakeWriter<'a> for TerminalOutput {
    type Writer = SpinnerWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SpinnerWriter { stream: Stream::Stderr }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        let stream = if meta.target() == PRINT_TARGET {
            Stream::Stdout
        } else {
            Stream::Stderr
        };
        SpinnerWriter { stream }
    }
}
