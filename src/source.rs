//! Frame sources: a looping image sequence on disk and a live raw stream.

use image::{DynamicImage, ImageResult};
use log::{debug, warn};
use std::{
    fs,
    io::{ErrorKind, Read},
    path::{Path, PathBuf},
};

use crate::error::SessionError;
use crate::frame::Frame;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

pub trait FrameSource {
    fn describe(&self) -> String;

    /// Live sources end the session at end-of-stream; finite ones loop.
    fn is_live(&self) -> bool;

    /// `Err(EmptyFrame)` means this tick produced nothing usable.
    fn next_frame(&mut self) -> Result<Frame, SessionError>;

    /// Restart from the first frame. Sources that cannot rewind refuse.
    fn rewind(&mut self) -> Result<(), SessionError> {
        Err(SessionError::SourceUnavailable {
            source_desc: self.describe(),
            reason: "source cannot rewind".into(),
        })
    }
}

/// Image files in a directory, played in file-name order.
#[derive(Debug)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    pos: usize,
    decoded_this_pass: usize,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self, SessionError> {
        let unavailable = |reason: String| SessionError::SourceUnavailable {
            source_desc: dir.display().to_string(),
            reason,
        };

        let rd = fs::read_dir(dir).map_err(|e| unavailable(e.to_string()))?;
        let mut files: Vec<PathBuf> = rd
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|s| s.to_str())
                    .map(|s| IMAGE_EXTENSIONS.contains(&s.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(unavailable("directory holds no image frames".into()));
        }
        debug!("image sequence {}: {} frames", dir.display(), files.len());

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            pos: 0,
            decoded_this_pass: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

impl FrameSource for ImageSequenceSource {
    fn describe(&self) -> String {
        format!("{} ({} frames, looping)", self.dir.display(), self.len())
    }

    fn is_live(&self) -> bool {
        false
    }

    fn next_frame(&mut self) -> Result<Frame, SessionError> {
        while let Some(path) = self.files.get(self.pos) {
            self.pos += 1;
            if let Some(frame) = usable_frame(path, image::open(path)) {
                self.decoded_this_pass += 1;
                return Ok(frame);
            }
        }

        if self.decoded_this_pass == 0 {
            return Err(SessionError::SourceUnavailable {
                source_desc: self.dir.display().to_string(),
                reason: "no frame in the sequence could be decoded".into(),
            });
        }
        Err(SessionError::EmptyFrame)
    }

    fn rewind(&mut self) -> Result<(), SessionError> {
        self.pos = 0;
        self.decoded_this_pass = 0;
        Ok(())
    }
}

fn usable_frame(path: &Path, decoded: ImageResult<DynamicImage>) -> Option<Frame> {
    let img = match decoded {
        Ok(img) => img,
        Err(e) => {
            warn!("skipping unreadable frame {}: {e}", path.display());
            return None;
        }
    };
    match Frame::from_dynamic(img) {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!("skipping frame {}: {e}", path.display());
            None
        }
    }
}

/// Back-to-back 8-bit grayscale frames of fixed geometry, e.g. piped from a
/// capture tool (`ffmpeg -f v4l2 -i /dev/video0 -pix_fmt gray -f rawvideo -`).
pub struct RawStreamSource<R: Read> {
    name: String,
    reader: R,
    width: u32,
    height: u32,
}

impl<R: Read> RawStreamSource<R> {
    pub fn new(name: impl Into<String>, reader: R, width: u32, height: u32) -> Result<Self, SessionError> {
        let name = name.into();
        if width == 0 || height == 0 {
            return Err(SessionError::SourceUnavailable {
                source_desc: name,
                reason: format!("invalid frame geometry {width}x{height}"),
            });
        }
        Ok(Self {
            name,
            reader,
            width,
            height,
        })
    }
}

impl<R: Read> FrameSource for RawStreamSource<R> {
    fn describe(&self) -> String {
        format!("{} ({}x{} gray, live)", self.name, self.width, self.height)
    }

    fn is_live(&self) -> bool {
        true
    }

    fn next_frame(&mut self) -> Result<Frame, SessionError> {
        let mut buf = vec![0u8; (self.width as usize) * (self.height as usize)];
        match self.reader.read_exact(&mut buf) {
            Ok(()) => Frame::from_raw(self.width, self.height, buf),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(SessionError::EmptyFrame),
            Err(e) => Err(e.into()),
        }
    }
}
