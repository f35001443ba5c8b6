use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Frame counter units per unit of shader time. Ties the animation speed to the
/// display refresh rate instead of wall-clock seconds.
pub const TIME_DIVISOR: f32 = 500.0;

/// Vertices in the full-screen quad (two triangles).
pub const QUAD_VERTEX_COUNT: u32 = 6;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("frame scheduler was stopped and cannot be restarted")]
    NotRestartable,
}

/// Four floats uploaded to the uniform buffer every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub width: f32,
    pub height: f32,
    pub time: f32,
    pub reserved: f32,
}

impl FrameUniforms {
    pub fn for_frame(width: u32, height: u32, frame: u64) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
            time: elapsed_time_units(frame),
            reserved: 0.0,
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.width, self.height, self.time, self.reserved]
    }
}

pub fn elapsed_time_units(frame: u64) -> f32 {
    frame as f32 / TIME_DIVISOR
}

/// The single render pass recorded per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadPass {
    /// RGBA clear colour applied before drawing.
    pub clear: [f64; 4],
    pub bind_group: u32,
    pub vertex_count: u32,
}

impl QuadPass {
    pub const FULL_SCREEN: QuadPass = QuadPass {
        clear: [0.0, 0.0, 0.0, 1.0],
        bind_group: 0,
        vertex_count: QUAD_VERTEX_COUNT,
    };
}

/// What the sink did with a submitted pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Presented,
    /// No frame was available to draw into, e.g. the surface was being
    /// reconfigured. Nothing was submitted.
    Skipped,
}

/// Destination for the per-frame work. The GPU implementation lives in the
/// renderer crate; tests substitute a recorder.
pub trait FrameSink {
    type Error;

    /// Current surface size in physical pixels.
    fn surface_size(&self) -> (u32, u32);

    /// Replaces the entire uniform buffer contents.
    fn upload_uniforms(&mut self, uniforms: &FrameUniforms) -> Result<(), Self::Error>;

    /// Records and submits one command sequence containing `pass`, or reports
    /// that the frame was skipped without submitting anything.
    fn submit(&mut self, pass: &QuadPass) -> Result<Submission, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// `start` has not been called yet.
    Idle,
    /// A frame was submitted; the host should schedule the next tick.
    Rendered { frame: u64 },
    /// The sink skipped this frame. The counter still advanced; the host
    /// should schedule the next tick.
    Skipped { frame: u64 },
    /// The loop was stopped; no further ticks will render.
    Stopped,
}

/// Cloneable handle that stops a [`FrameScheduler`] from any thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Owns the frame counter and the `Idle -> Running -> Stopped` lifecycle of the
/// display-synchronised render loop.
#[derive(Debug)]
pub struct FrameScheduler {
    state: LoopState,
    frame: u64,
    presented: u64,
    stop: StopHandle,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
            frame: 0,
            presented: 0,
            stop: StopHandle::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        if self.stop.is_stopped() {
            LoopState::Stopped
        } else {
            self.state
        }
    }

    /// Ticks run so far, skipped frames included; also the counter value the
    /// next tick uploads.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Frames the sink actually presented.
    pub fn presented_count(&self) -> u64 {
        self.presented
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn start(&mut self) -> Result<(), SchedulerError> {
        match self.state() {
            LoopState::Idle => {
                tracing::debug!("frame scheduler running");
                self.state = LoopState::Running;
                Ok(())
            }
            LoopState::Running => Ok(()),
            LoopState::Stopped => Err(SchedulerError::NotRestartable),
        }
    }

    /// No tick renders after this returns.
    pub fn stop(&mut self) {
        self.stop.stop();
        self.state = LoopState::Stopped;
    }

    pub fn tick<S: FrameSink>(&mut self, sink: &mut S) -> Result<TickOutcome, S::Error> {
        match self.state() {
            LoopState::Idle => return Ok(TickOutcome::Idle),
            LoopState::Stopped => {
                self.state = LoopState::Stopped;
                return Ok(TickOutcome::Stopped);
            }
            LoopState::Running => {}
        }

        let (width, height) = sink.surface_size();
        let frame = self.frame;
        let uniforms = FrameUniforms::for_frame(width, height, frame);
        self.frame += 1;

        let result = sink
            .upload_uniforms(&uniforms)
            .and_then(|()| sink.submit(&QuadPass::FULL_SCREEN));
        match result {
            Ok(Submission::Presented) => {
                self.presented += 1;
                Ok(TickOutcome::Rendered { frame })
            }
            Ok(Submission::Skipped) => {
                tracing::trace!(frame, "frame skipped by sink");
                Ok(TickOutcome::Skipped { frame })
            }
            Err(err) => {
                self.stop();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        size: (u32, u32),
        uploads: Vec<FrameUniforms>,
        submits: Vec<QuadPass>,
        fail_on_submit: Option<usize>,
        skip_on_call: Option<usize>,
        calls: usize,
    }

    impl FrameSink for RecordingSink {
        type Error = String;

        fn surface_size(&self) -> (u32, u32) {
            self.size
        }

        fn upload_uniforms(&mut self, uniforms: &FrameUniforms) -> Result<(), String> {
            self.uploads.push(*uniforms);
            Ok(())
        }

        fn submit(&mut self, pass: &QuadPass) -> Result<Submission, String> {
            let call = self.calls;
            self.calls += 1;
            if self.skip_on_call == Some(call) {
                return Ok(Submission::Skipped);
            }
            if self.fail_on_submit == Some(self.submits.len()) {
                return Err("device lost".into());
            }
            self.submits.push(*pass);
            Ok(Submission::Presented)
        }
    }

    fn sink(width: u32, height: u32) -> RecordingSink {
        RecordingSink {
            size: (width, height),
            ..Default::default()
        }
    }

    #[test]
    fn idle_scheduler_renders_nothing() {
        let mut scheduler = FrameScheduler::new();
        let mut sink = sink(10, 10);
        assert_eq!(scheduler.tick(&mut sink), Ok(TickOutcome::Idle));
        assert!(sink.uploads.is_empty());
        assert!(sink.submits.is_empty());
    }

    #[test]
    fn counter_starts_at_zero_and_advances_once_per_tick() {
        let mut scheduler = FrameScheduler::new();
        scheduler.start().unwrap();
        let mut sink = sink(640, 480);
        for expected in 0..1200u64 {
            let outcome = scheduler.tick(&mut sink).unwrap();
            assert_eq!(outcome, TickOutcome::Rendered { frame: expected });
        }
        assert_eq!(scheduler.frame_count(), 1200);
        for (index, uniforms) in sink.uploads.iter().enumerate() {
            assert_eq!(uniforms.time, index as f32 / 500.0);
            assert_eq!(uniforms.width, 640.0);
            assert_eq!(uniforms.height, 480.0);
            assert_eq!(uniforms.reserved, 0.0);
        }
    }

    #[test]
    fn payload_time_component_uses_fixed_divisor() {
        assert_eq!(FrameUniforms::for_frame(1, 1, 0).time, 0.0);
        assert_eq!(FrameUniforms::for_frame(1, 1, 250).time, 0.5);
        assert_eq!(FrameUniforms::for_frame(1, 1, 500).time, 1.0);
        assert_eq!(
            FrameUniforms::for_frame(1600, 1200, 1000).to_array(),
            [1600.0, 1200.0, 2.0, 0.0]
        );
    }

    #[test]
    fn each_tick_submits_exactly_one_quad_pass() {
        let mut scheduler = FrameScheduler::new();
        scheduler.start().unwrap();
        let mut sink = sink(800, 600);

        scheduler.tick(&mut sink).unwrap();
        assert_eq!(sink.submits.len(), 1);
        scheduler.tick(&mut sink).unwrap();
        assert_eq!(sink.submits.len(), 2);
        assert_eq!(sink.uploads.len(), 2);

        for pass in &sink.submits {
            assert_eq!(pass.vertex_count, 6);
            assert_eq!(pass.bind_group, 0);
            assert_eq!(pass.clear, [0.0, 0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn skipped_frame_advances_counter_without_submitting() {
        let mut scheduler = FrameScheduler::new();
        scheduler.start().unwrap();
        let mut sink = sink(800, 600);
        sink.skip_on_call = Some(1);

        assert_eq!(
            scheduler.tick(&mut sink),
            Ok(TickOutcome::Rendered { frame: 0 })
        );
        assert_eq!(
            scheduler.tick(&mut sink),
            Ok(TickOutcome::Skipped { frame: 1 })
        );
        assert_eq!(
            scheduler.tick(&mut sink),
            Ok(TickOutcome::Rendered { frame: 2 })
        );

        assert_eq!(sink.submits.len(), 2);
        assert_eq!(sink.uploads.len(), 3);
        assert_eq!(sink.uploads[2].time, 2.0 / 500.0);
        assert_eq!(scheduler.frame_count(), 3);
        assert_eq!(scheduler.presented_count(), 2);
        assert_eq!(scheduler.state(), LoopState::Running);
    }

    #[test]
    fn stop_prevents_further_ticks() {
        let mut scheduler = FrameScheduler::new();
        scheduler.start().unwrap();
        let mut sink = sink(4, 4);
        scheduler.tick(&mut sink).unwrap();

        let handle = scheduler.stop_handle();
        handle.stop();
        assert_eq!(scheduler.tick(&mut sink), Ok(TickOutcome::Stopped));
        assert_eq!(scheduler.tick(&mut sink), Ok(TickOutcome::Stopped));
        assert_eq!(sink.submits.len(), 1);
        assert_eq!(scheduler.state(), LoopState::Stopped);
    }

    #[test]
    fn stopped_scheduler_refuses_restart() {
        let mut scheduler = FrameScheduler::new();
        scheduler.start().unwrap();
        scheduler.start().unwrap();
        scheduler.stop();
        assert_eq!(scheduler.start(), Err(SchedulerError::NotRestartable));
    }

    #[test]
    fn sink_failure_terminates_loop() {
        let mut scheduler = FrameScheduler::new();
        scheduler.start().unwrap();
        let mut sink = sink(4, 4);
        sink.fail_on_submit = Some(1);

        scheduler.tick(&mut sink).unwrap();
        assert_eq!(scheduler.tick(&mut sink), Err("device lost".to_string()));
        assert_eq!(scheduler.state(), LoopState::Stopped);
        assert_eq!(scheduler.tick(&mut sink), Ok(TickOutcome::Stopped));
        assert_eq!(sink.submits.len(), 1);
    }
}
