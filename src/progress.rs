use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

type StatusOut = Arc<Mutex<Box<dyn Write + Send>>>;

/// User-facing output for one download: a byte counter plus status lines.
///
/// The bar is drawn on stderr. Status lines always go to stdout, with the bar
/// suspended while they are written.
#[derive(Clone)]
pub struct Progress {
    multi: MultiProgress,
    bar: ProgressBar,
    out: StatusOut,
    visible: bool,
}

impl Progress {
    pub fn new(visible: bool) -> Self {
        Self::with_output(visible, io::stdout())
    }

    pub(crate) fn with_output(visible: bool, out: impl Write + Send + 'static) -> Self {
        let target = if visible {
            ProgressDrawTarget::stderr_with_hz(5)
        } else {
            ProgressDrawTarget::hidden()
        };
        let multi = MultiProgress::with_draw_target(target);
        let bar = multi.add(ProgressBar::new(0));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes:>12}/{total_bytes:<12} {bytes_per_sec:>12} {eta:>4} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self {
            multi,
            bar,
            out: Arc::new(Mutex::new(Box::new(out))),
            visible,
        }
    }

    pub fn hidden() -> Self {
        Self::new(false)
    }

    pub fn start(&self, total: u64, message: String) {
        self.bar.set_length(total);
        self.bar.set_message(message);
    }

    pub fn inc(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    pub fn status(&self, line: impl AsRef<str>) {
        if !self.visible {
            return;
        }
        self.multi.suspend(|| {
            let mut out = match self.out.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let _ = writeln!(out, "{}", line.as_ref());
            let _ = out.flush();
        });
    }

    pub fn finish(&self, message: String) {
        self.bar.finish_with_message(message);
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}
