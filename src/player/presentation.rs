// SPDX-License-Identifier: MPL-2.0
//! Hand-off between the playback engine and whatever draws the frames.

use crate::domain::{DecodedPicture, TransportMode};
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// What should be on screen for one tick.
///
/// The pictures are shared with the engine; a presenter may keep the `Arc`s
/// only until the next tick.
#[derive(Debug, Clone)]
pub struct PresentationSnapshot {
    pub current: Option<Arc<DecodedPicture>>,
    /// Only populated when cross-fade blending is enabled.
    pub previous: Option<Arc<DecodedPicture>>,
    /// Weight of `current` in the mix, within `[0, 1]`.
    pub blend_factor: f32,
    pub mode: TransportMode,
}

impl PresentationSnapshot {
    /// A snapshot with nothing to draw.
    #[must_use]
    pub fn empty(mode: TransportMode) -> Self {
        Self {
            current: None,
            previous: None,
            blend_factor: 1.0,
            mode,
        }
    }

    #[must_use]
    pub fn timecode(&self) -> Option<Duration> {
        self.current.as_ref().map(|picture| picture.timecode)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}

/// Rendering collaborator (texture upload, colour conversion, blending).
pub trait Presenter {
    /// Draws one tick.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be drawn. The session stops.
    fn present(&mut self, snapshot: &PresentationSnapshot) -> Result<()>;
}

/// Headless presenter that logs every newly surfaced frame.
#[derive(Debug, Default)]
pub struct LogPresenter {
    last: Option<Duration>,
    frames: u64,
}

impl LogPresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct frames presented so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Presenter for LogPresenter {
    fn present(&mut self, snapshot: &PresentationSnapshot) -> Result<()> {
        let Some(current) = snapshot.current.as_deref() else {
            return Ok(());
        };
        if self.last == Some(current.timecode) {
            return Ok(());
        }

        self.last = Some(current.timecode);
        self.frames += 1;
        log::debug!(
            "Frame {:>6} at {:>9.3}s {}x{} blend={:.2} {:?}",
            self.frames,
            current.timecode.as_secs_f64(),
            current.planes.width,
            current.planes.height,
            snapshot.blend_factor,
            snapshot.mode
        );
        Ok(())
    }
}

/// Scale factors that fit a frame into a viewport without distortion.
///
/// Returns `(x, y)` relative to the full viewport: the wider side is 1 and
/// the other is shrunk (letterbox or pillarbox). Degenerate sizes yield
/// `(1, 1)`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn aspect_fit(frame: (u32, u32), viewport: (u32, u32)) -> (f32, f32) {
    let (fw, fh) = frame;
    let (vw, vh) = viewport;
    if fw == 0 || fh == 0 || vw == 0 || vh == 0 {
        return (1.0, 1.0);
    }

    let frame_aspect = fw as f32 / fh as f32;
    let view_aspect = vw as f32 / vh as f32;
    if frame_aspect > view_aspect {
        (1.0, view_aspect / frame_aspect)
    } else {
        (frame_aspect / view_aspect, 1.0)
    }
}
