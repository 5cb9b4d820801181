//! Frame acquisition.
//!
//! The tracker pulls frames one at a time through [`LandmarkSource`]. Two
//! sources ship with the crate: [`ReplaySource`] reads a JSON-lines recording
//! and [`MemorySource`] serves frames from a queue.
//!
//! ## JSON Lines Format
//!
//! One frame per line; `landmarks` is omitted or `null` when no face was
//! found:
//!
//! ```json
//! {"width":640,"height":480,"landmarks":[[0.41,0.52],[0.43,0.50]]}
//! {"width":640,"height":480,"landmarks":null}
//! ```

use std::{
    collections::VecDeque,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{landmarks::FaceLandmarks, Error, Result};

/// Detector output for one video frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Normalized landmarks, `None` when no face was detected
    #[serde(default)]
    pub landmarks: Option<FaceLandmarks>,
}

impl Frame {
    pub fn new(width: u32, height: u32, landmarks: Option<FaceLandmarks>) -> Self {
        Self { width, height, landmarks }
    }

    /// A frame in which no face was found
    pub fn no_face(width: u32, height: u32) -> Self {
        Self::new(width, height, None)
    }
}

/// Pull-based frame source
pub trait LandmarkSource {
    /// Block until the next frame is available.
    ///
    /// Returns `Ok(None)` at the end of a finite stream.
    ///
    /// # Errors
    ///
    /// Returns an error when a frame cannot be acquired; callers decide
    /// whether to retry.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Replays frames from a JSON-lines recording
#[derive(Debug)]
pub struct ReplaySource<R> {
    reader: R,
    line: String,
    line_number: usize,
    frames_read: usize,
}

impl ReplaySource<BufReader<File>> {
    /// Open a recording on disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        debug!("Replaying landmarks from {}", path.as_ref().display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
            frames_read: 0,
        }
    }

    pub fn frames_read(&self) -> usize {
        self.frames_read
    }
}

impl<R: BufRead> LandmarkSource for ReplaySource<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let frame: Frame = serde_json::from_str(trimmed)
                .map_err(|e| Error::Source(format!("Line {}: {e}", self.line_number)))?;
            self.frames_read += 1;
            return Ok(Some(frame));
        }
    }
}

/// Serves frames from memory in FIFO order
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    frames: VecDeque<Frame>,
}

impl MemorySource {
    pub fn new<I: IntoIterator<Item = Frame>>(frames: I) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push_back(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl LandmarkSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }
}
