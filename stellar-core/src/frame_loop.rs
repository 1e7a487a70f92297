/// Repeating frame task with explicit cancellation
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared flag that stops a [`FrameLoop`]
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Timing for one invocation of the frame callback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    pub index: u64,
    /// Time since the previous frame started
    pub delta: Duration,
}

/// Calls a frame callback at a fixed cadence until cancelled
#[derive(Debug, Clone)]
pub struct FrameLoop {
    target_frame_time: Duration,
    max_frames: Option<u64>,
    cancel: CancelToken,
}

impl FrameLoop {
    pub fn new(fps: u32) -> Self {
        Self {
            target_frame_time: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            max_frames: None,
            cancel: CancelToken::new(),
        }
    }

    /// Stop on its own after `frames` iterations.
    pub fn with_max_frames(mut self, frames: Option<u64>) -> Self {
        self.max_frames = frames;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run until cancelled, the frame limit is hit, or the callback fails.
    ///
    /// Returns the number of frames that ran.
    pub fn run<E, F>(&self, mut frame: F) -> Result<u64, E>
    where
        F: FnMut(FrameTick) -> Result<(), E>,
    {
        let mut index = 0;
        let mut last = Instant::now();

        while !self.cancel.is_cancelled() {
            if self.max_frames.is_some_and(|max| index >= max) {
                break;
            }

            let frame_start = Instant::now();
            let delta = frame_start - last;
            last = frame_start;

            frame(FrameTick { index, delta })?;
            index += 1;

            let elapsed = frame_start.elapsed();
            if elapsed < self.target_frame_time && !self.cancel.is_cancelled() {
                std::thread::sleep(self.target_frame_time - elapsed);
            }
        }

        tracing::debug!("frame loop stopped after {index} frames");
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_frame_limit() {
        let frame_loop = FrameLoop::new(1000).with_max_frames(Some(5));
        let mut seen = Vec::new();
        let ran = frame_loop
            .run(|tick| {
                seen.push(tick.index);
                Ok::<_, ()>(())
            })
            .unwrap();
        assert_eq!(ran, 5);
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn cancel_from_inside_callback() {
        let frame_loop = FrameLoop::new(1000);
        let token = frame_loop.cancel_token();
        let ran = frame_loop
            .run(|tick| {
                if tick.index == 2 {
                    token.cancel();
                }
                Ok::<_, ()>(())
            })
            .unwrap();
        assert_eq!(ran, 3);
    }

    #[test]
    fn cancelled_before_start_runs_nothing() {
        let frame_loop = FrameLoop::new(60);
        frame_loop.cancel_token().cancel();
        assert_eq!(frame_loop.run(|_| Ok::<_, ()>(())).unwrap(), 0);
    }

    #[test]
    fn callback_error_propagates() {
        let frame_loop = FrameLoop::new(1000);
        let result = frame_loop.run(|tick| if tick.index == 1 { Err("boom") } else { Ok(()) });
        assert_eq!(result, Err("boom"));
    }
}
