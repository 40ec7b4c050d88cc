//! Block-scoped wall-clock timing with intermediate checkpoints.
//!
//! A [`ScopedTimer`] starts measuring when it is created and reports when it goes out of
//! scope, whichever way the scope is left (normal return, `?`, or a panic unwinding through
//! it). Every message is written to a sink, which defaults to `tracing` at debug level.
//!
//! ```ignore
//! let mut timer = ScopedTimer::start("rebuild index");
//! timer.announce_start(None)?;
//! load()?;
//! timer.checkpoint("load", "sort")?;
//! sort()?;
//! // dropping `timer` reports "sort in .. ms." and the overall summary
//! ```

use chrono::Local;
use std::{
    fmt,
    io::{self, Write},
    time::{Duration, Instant},
};

/// Receives one formatted line per call.
pub type LogSink = Box<dyn FnMut(&str) -> io::Result<()> + Send>;

/// The default sink: every line becomes a debug event under `docview::timer`.
pub fn tracing_sink(line: &str) -> io::Result<()> {
    tracing::debug!(target: "docview::timer", "{}", line);
    Ok(())
}

pub struct ScopedTimer {
    description: String,
    sink: LogSink,
    started: Instant,
    sub_time: Duration,
    next_segment: Option<String>,
    finished: bool,
}

impl ScopedTimer {
    /// Starts timing now.
    pub fn start(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            sink: Box::new(tracing_sink),
            started: Instant::now(),
            sub_time: Duration::ZERO,
            next_segment: None,
            finished: false,
        }
    }

    /// Replaces the sink every later message goes to.
    pub fn with_sink<F>(mut self, sink: F) -> Self
    where
        F: FnMut(&str) -> io::Result<()> + Send + 'static,
    {
        self.sink = Box::new(sink);
        self
    }

    /// Writes one line per message to `writer`.
    pub fn with_writer<W>(self, mut writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        self.with_sink(move |line| writeln!(writer, "{}", line))
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Time since the timer started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Emits a timestamped "Started" line, using `description` when it is not blank.
    pub fn announce_start(&mut self, description: Option<&str>) -> io::Result<&mut Self> {
        let description = description
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(&self.description)
            .to_string();
        let now = Local::now().format("%-m/%-d/%Y %I:%M:%S");

        self.emit(format_args!("[{}] ------ Started: {} ------", now, description))?;
        Ok(self)
    }

    /// Extends the description as work progresses.
    pub fn append_description(&mut self, text: &str) {
        self.description.push(' ');
        self.description.push_str(text);
    }

    /// Reports the segment that just ended and names the one that starts now.
    ///
    /// The segment length is measured from the previous checkpoint, or from the start for
    /// the first one.
    pub fn checkpoint(&mut self, finished: &str, next: &str) -> io::Result<()> {
        let elapsed = self.started.elapsed();
        let segment = elapsed.saturating_sub(self.sub_time);

        self.sub_time = elapsed;
        self.next_segment = Some(next.to_string());
        self.emit(format_args!("{} in {} ms", finished, segment.as_millis()))
    }

    /// Stops the clock and reports, returning the total time.
    ///
    /// Dropping the timer does the same; calling this instead surfaces sink errors.
    pub fn finish(mut self) -> io::Result<Duration> {
        self.finalize()
    }

    fn finalize(&mut self) -> io::Result<Duration> {
        self.finished = true;
        let total = self.started.elapsed();

        if let Some(segment) = self.next_segment.take() {
            let last = total.saturating_sub(self.sub_time);
            self.emit(format_args!("{} in {} ms.", segment, last.as_millis()))?;
        }

        let description = std::mem::take(&mut self.description);
        self.emit(format_args!(
            "========== Finished: {} in {} ms. ==========",
            description,
            total.as_millis()
        ))?;
        self.emit(format_args!(""))?;

        Ok(total)
    }

    fn emit(&mut self, message: fmt::Arguments<'_>) -> io::Result<()> {
        (self.sink)(&message.to_string())
    }
}

impl fmt::Debug for ScopedTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedTimer")
            .field("description", &self.description)
            .field("elapsed", &self.started.elapsed())
            .field("sub_time", &self.sub_time)
            .field("next_segment", &self.next_segment)
            .finish_non_exhaustive()
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        if let Err(err) = self.finalize() {
            tracing::warn!(
                target: "docview::timer",
                error = %err,
                "failed to report timing"
            );
        }
    }
}
