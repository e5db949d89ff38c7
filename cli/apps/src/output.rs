//! Terminal output.
//!
//! Commands never write to stdout or stderr directly. They go through a
//! [`Printer`], which can be cloned into concurrent workers (wait and log
//! tail write at the same time), knows whether to colourise, and can be
//! pointed at in-memory buffers in tests.

use nu_ansi_term::Color;
use std::fmt::Display;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

fn lock(writer: &SharedWriter) -> MutexGuard<'_, Box<dyn Write + Send>> {
    writer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Write and flush `text`. A closed stream (e.g. `apps ... | head`) must not
/// abort the command, so failures are only logged.
fn emit(writer: &SharedWriter, stream: &str, text: impl Display) {
    let mut out = lock(writer);
    if let Err(e) = write!(out, "{text}").and_then(|()| out.flush()) {
        debug!("Unable to write to {stream}: {e}");
    }
}

/// Colour palette for log prefixes, picked by pod name.
const POD_COLORS: &[Color] = &[
    Color::Cyan,
    Color::Green,
    Color::Magenta,
    Color::Yellow,
    Color::Blue,
    Color::LightCyan,
    Color::LightGreen,
    Color::LightMagenta,
];

/// Shared handle to the process output streams.
#[derive(Clone)]
pub struct Printer {
    stdout: SharedWriter,
    stderr: SharedWriter,
    color: bool,
    info_to_stderr: bool,
}

impl std::fmt::Debug for Printer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Printer")
            .field("color", &self.color)
            .field("info_to_stderr", &self.info_to_stderr)
            .finish_non_exhaustive()
    }
}

impl Printer {
    /// Printer over the real process streams.
    pub fn stdio(color: bool) -> Self {
        Self::new(Box::new(std::io::stdout()), Box::new(std::io::stderr()), color)
    }

    /// Printer over arbitrary writers.
    pub fn new(stdout: Box<dyn Write + Send>, stderr: Box<dyn Write + Send>, color: bool) -> Self {
        Self {
            stdout: Arc::new(Mutex::new(stdout)),
            stderr: Arc::new(Mutex::new(stderr)),
            color,
            info_to_stderr: false,
        }
    }

    /// Route informational messages to stderr, keeping stdout for the
    /// rendered resource (used by `--dry-run`).
    #[must_use]
    pub fn with_info_to_stderr(mut self) -> Self {
        self.info_to_stderr = true;
        self
    }

    /// Whether output is colourised
    pub fn color(&self) -> bool {
        self.color
    }

    /// Write to stdout as is.
    pub fn print(&self, text: impl Display) {
        emit(&self.stdout, "stdout", text);
    }

    /// Write a line to stdout.
    pub fn println(&self, text: impl Display) {
        self.print(format_args!("{text}\n"));
    }

    /// Write a line to stderr.
    pub fn eprintln(&self, text: impl Display) {
        emit(&self.stderr, "stderr", format_args!("{text}\n"));
    }

    /// Informational line; stdout unless redirected by dry-run.
    pub fn info(&self, text: impl Display) {
        if self.info_to_stderr {
            self.eprintln(text);
        } else {
            self.println(text);
        }
    }

    /// Success line in green.
    pub fn success(&self, text: impl Display) {
        let text = text.to_string();
        self.info(self.paint(Color::Green, &text));
    }

    /// Failure explanation on stderr in red.
    pub fn error(&self, text: impl Display) {
        let text = text.to_string();
        self.eprintln(self.paint(Color::Red, &text));
    }

    /// `Error: <text>` on stdout.
    pub fn error_line(&self, text: impl Display) {
        self.println(format_args!("{} {text}", self.error_prefix()));
    }

    /// `Error: <text>` on stderr.
    pub fn eerror_line(&self, text: impl Display) {
        self.eprintln(format_args!("{} {text}", self.error_prefix()));
    }

    /// The `Error:` label, red when colour is enabled.
    pub fn error_prefix(&self) -> String {
        self.paint(Color::Red, "Error:")
    }

    /// Bold section heading.
    pub fn heading(&self, text: &str) -> String {
        if self.color {
            Color::White.bold().paint(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Removed diff line
    pub fn removed(&self, text: &str) -> String {
        self.paint(Color::Red, text)
    }

    /// Added diff line
    pub fn added(&self, text: &str) -> String {
        self.paint(Color::Green, text)
    }

    /// Colour a log prefix consistently for a given pod.
    pub fn pod_prefix(&self, pod: &str, prefix: &str) -> String {
        let idx = pod.bytes().fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(usize::from(b)));
        self.paint(POD_COLORS[idx % POD_COLORS.len()], prefix)
    }

    fn paint(&self, color: Color, text: &str) -> String {
        if self.color {
            color.paint(text).to_string()
        } else {
            text.to_string()
        }
    }
}

/// In-memory capture of a [`Printer`]'s streams.
#[derive(Clone, Default, Debug)]
pub struct CapturedOutput {
    stdout: Arc<Mutex<Vec<u8>>>,
    stderr: Arc<Mutex<Vec<u8>>>,
}

struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedOutput {
    /// Create a printer writing into a fresh capture.
    pub fn printer(color: bool) -> (Printer, Self) {
        let captured = Self::default();
        let printer = Printer::new(
            Box::new(BufferWriter(Arc::clone(&captured.stdout))),
            Box::new(BufferWriter(Arc::clone(&captured.stderr))),
            color,
        );
        (printer, captured)
    }

    /// Everything written to stdout so far
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.stdout.lock().unwrap_or_else(PoisonError::into_inner)).into_owned()
    }

    /// Everything written to stderr so far
    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.stderr.lock().unwrap_or_else(PoisonError::into_inner)).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_follows_dry_run_redirect() {
        let (printer, out) = CapturedOutput::printer(false);
        printer.info("to stdout");
        printer.with_info_to_stderr().info("to stderr");

        assert_eq!(out.stdout(), "to stdout\n");
        assert_eq!(out.stderr(), "to stderr\n");
    }

    #[test]
    fn test_plain_output_has_no_escapes() {
        let (printer, out) = CapturedOutput::printer(false);
        printer.error_line("boom");
        printer.success("done");
        assert_eq!(out.stdout(), "Error: boom\ndone\n");
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn test_closed_stdout_does_not_stop_stderr() {
        let out = CapturedOutput::default();
        let printer = Printer::new(Box::new(ClosedPipe), Box::new(BufferWriter(Arc::clone(&out.stderr))), false);

        printer.println("lost");
        printer.eprintln("still here");

        assert_eq!(out.stderr(), "still here\n");
    }

    #[test]
    fn test_colored_error_prefix() {
        let (printer, _) = CapturedOutput::printer(true);
        assert_eq!(printer.error_prefix(), Color::Red.paint("Error:").to_string());
        assert_eq!(
            printer.pod_prefix("pod-a", "x"),
            printer.pod_prefix("pod-a", "x"),
            "same pod keeps its colour"
        );
    }
}
