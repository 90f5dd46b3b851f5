//! Software camera service for running the pipeline without the device.
//!
//! The simulated service keeps the same books the real one does: every
//! descriptor it hands out is outstanding until released, it withholds new
//! frames while its cache is full, and it rejects releases of descriptors it
//! does not know about. The sink exposes those books so tests can check that
//! every frame came back exactly once.

use crate::frame::{YUV_420SP, YuvFrame};
use crate::pacing::FramePacing;
use crate::sink::FrameSink;
use crate::source::FrameSource;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

const BASE_ADDRESS: u64 = 0x4000_0000;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatorError {
    #[error("Release of unknown or already released frame {0}")]
    UnknownFrame(u64),
}

#[derive(Debug, Default)]
struct Ledger {
    outstanding: HashSet<u64>,
    issued: u64,
    released: u64,
    withheld: u64,
    bad_releases: u64,
}

type SharedLedger = Arc<Mutex<Ledger>>;

fn lock(ledger: &SharedLedger) -> MutexGuard<'_, Ledger> {
    ledger.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Cadence {
    PerPoll(usize),
    Paced(FramePacing),
}

/// Shape of the simulated stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedCamera {
    pub width: u32,
    pub height: u32,
    /// Unreleased frames the service holds before it stops handing out new ones
    pub buffer_depth: usize,
    /// Stop producing after this many frames
    pub frame_limit: Option<u64>,
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            buffer_depth: 25,
            frame_limit: None,
        }
    }
}

impl SimulatedCamera {
    /// Hand out `frames_per_poll` frames on every poll, independent of time.
    pub fn fixed(self, frames_per_poll: usize) -> (SimulatedSource, Arc<SimulatedSink>) {
        self.build(Cadence::PerPoll(frames_per_poll))
    }

    /// Hand out frames at `fps` in real time.
    pub fn realtime(self, fps: u32) -> (SimulatedSource, Arc<SimulatedSink>) {
        self.build(Cadence::Paced(FramePacing::new(fps)))
    }

    fn build(self, cadence: Cadence) -> (SimulatedSource, Arc<SimulatedSink>) {
        let ledger = SharedLedger::default();
        let source = SimulatedSource {
            camera: self,
            cadence,
            ledger: Arc::clone(&ledger),
            next_id: 0,
        };
        (source, Arc::new(SimulatedSink { ledger }))
    }
}

pub struct SimulatedSource {
    camera: SimulatedCamera,
    cadence: Cadence,
    ledger: SharedLedger,
    next_id: u64,
}

impl SimulatedSource {
    fn descriptor(&self, id: u64) -> YuvFrame {
        let bytes = u64::from(self.camera.width) * u64::from(self.camera.height) * 3 / 2;
        let addr = BASE_ADDRESS.saturating_add(id.saturating_mul(bytes));
        YuvFrame {
            addr_phy: addr,
            addr_virt: addr,
            // The descriptor field is 32 bits wide
            size: u32::try_from(bytes).unwrap_or(u32::MAX),
            width: self.camera.width,
            height: self.camera.height,
            stride: self.camera.width,
            format: YUV_420SP,
            pts: id * 40_000,
            pts_sys: id * 40_000,
            cookie: [id as u32, (id >> 32) as u32, 0, 0],
            ..Default::default()
        }
    }
}

/// Frame id carried in the release token.
pub fn frame_id(frame: &YuvFrame) -> u64 {
    u64::from(frame.cookie[0]) | (u64::from(frame.cookie[1]) << 32)
}

impl FrameSource for SimulatedSource {
    type Frame = YuvFrame;
    type Error = SimulatorError;

    fn poll_batch(&mut self, batch: &mut Vec<YuvFrame>) -> Result<usize, SimulatorError> {
        let mut wanted = match &mut self.cadence {
            Cadence::PerPoll(n) => *n as u64,
            Cadence::Paced(pacing) => pacing.due(),
        };
        if let Some(limit) = self.camera.frame_limit {
            wanted = wanted.min(limit.saturating_sub(self.next_id));
        }

        let mut ledger = lock(&self.ledger);
        let room = self
            .camera
            .buffer_depth
            .saturating_sub(ledger.outstanding.len()) as u64;
        let handed_out = wanted.min(room);
        // A full service cache loses the frame at the sensor
        ledger.withheld += wanted - handed_out;

        for _ in 0..handed_out {
            let id = self.next_id;
            self.next_id += 1;
            ledger.outstanding.insert(id);
            ledger.issued += 1;
            batch.push(self.descriptor(id));
        }
        if self.camera.frame_limit.is_some() {
            self.next_id += wanted - handed_out;
        }

        Ok(handed_out as usize)
    }
}

/// Release side of the simulated service, plus its bookkeeping.
pub struct SimulatedSink {
    ledger: SharedLedger,
}

impl SimulatedSink {
    /// Frames handed out and not released yet.
    pub fn outstanding(&self) -> usize {
        lock(&self.ledger).outstanding.len()
    }

    pub fn issued(&self) -> u64 {
        lock(&self.ledger).issued
    }

    pub fn released(&self) -> u64 {
        lock(&self.ledger).released
    }

    /// Frames lost at the source because the service cache was full.
    pub fn withheld(&self) -> u64 {
        lock(&self.ledger).withheld
    }

    /// Releases of frames that were not outstanding.
    pub fn bad_releases(&self) -> u64 {
        lock(&self.ledger).bad_releases
    }
}

impl FrameSink for SimulatedSink {
    type Frame = YuvFrame;
    type Error = SimulatorError;

    fn release(&self, frame: &YuvFrame) -> Result<(), SimulatorError> {
        let id = frame_id(frame);
        let mut ledger = lock(&self.ledger);
        if ledger.outstanding.remove(&id) {
            ledger.released += 1;
            Ok(())
        } else {
            ledger.bad_releases += 1;
            Err(SimulatorError::UnknownFrame(id))
        }
    }
}
