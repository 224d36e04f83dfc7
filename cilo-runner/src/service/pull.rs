//! Image pulling with terminal progress
//!
//! Renders the pull's progress events the way a terminal progress display
//! does:
//! - a new status starts its own line: statuses longer than 20 characters
//!   are printed on a fresh line with the progress below them, shorter
//!   ones right-aligned in 18 columns with the progress beside them
//! - a repeated status rewrites the previous progress text in place using
//!   backspaces
//!
//! The pull is not retried; the first stream error aborts it.

use std::io::{self, Write};
use tracing::info;

use crate::error::{JobError, RuntimeError};
use crate::runtime::{ContainerRuntime, ProgressEvent};

/// Statuses longer than this get a line of their own
const LONG_STATUS: usize = 20;

/// Column width of short statuses
const STATUS_WIDTH: usize = 18;

/// Progress display state machine
pub struct ProgressRenderer<W: Write> {
    out: W,
    last_status: Option<String>,
    last_progress: String,
    rendered: bool,
}

impl<W: Write> ProgressRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_status: None,
            last_progress: String::new(),
            rendered: false,
        }
    }

    /// Renders one event
    pub fn render(&mut self, event: &ProgressEvent) -> io::Result<()> {
        if self.last_status.as_deref() == Some(event.status.as_str()) {
            let erase = "\x08".repeat(self.last_progress.chars().count());
            write!(self.out, "{}{}", erase, event.progress)?;
        } else {
            if self.last_status.is_some() {
                writeln!(self.out)?;
            }

            if event.status.chars().count() > LONG_STATUS {
                write!(self.out, "\n{}", event.status)?;
                if !event.progress.is_empty() {
                    write!(self.out, "\n{}", event.progress)?;
                }
            } else {
                write!(self.out, "{:>width$}", event.status, width = STATUS_WIDTH)?;
                if !event.progress.is_empty() {
                    write!(self.out, " {}", event.progress)?;
                }
            }

            self.last_status = Some(event.status.clone());
        }

        self.last_progress = event.progress.clone();
        self.rendered = true;
        self.out.flush()
    }

    /// Ends the display, leaving a blank line if anything was rendered
    pub fn finish(&mut self) -> io::Result<()> {
        if self.rendered {
            write!(self.out, "\n\n")?;
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Pulls an image, rendering progress to `out`
pub async fn pull_image<W: Write>(
    runtime: &dyn ContainerRuntime,
    reference: &str,
    out: W,
) -> Result<W, JobError> {
    info!("Making sure image {} is available ...", reference);

    let pull_error = |source: RuntimeError| JobError::Pull {
        image: reference.to_string(),
        source,
    };

    let mut stream = runtime.pull_image(reference).await.map_err(pull_error)?;
    let mut renderer = ProgressRenderer::new(out);

    while let Some(item) = stream.next().await {
        let event = item.map_err(pull_error)?;
        renderer
            .render(&event)
            .map_err(|e| JobError::io("Failed to write pull progress", e))?;
    }

    renderer
        .finish()
        .map_err(|e| JobError::io("Failed to write pull progress", e))?;
    Ok(renderer.into_inner())
}
