//! Orchestrator: stage sequencing, progress, cancellation, apply-to-grid.
//!
//! The pipeline computes into an owned `CellBuffer` that the live grid
//! never sees until the explicit apply step. Synchronous runs block the
//! caller; asynchronous runs move the whole pipeline onto one dedicated
//! worker thread, and `finish()` joins it and applies the result on the
//! caller's thread. This two-phase commit keeps the live grid
//! single-threaded without locks: buffer ownership moves to the worker at
//! start and back to the caller at finish, never shared.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::cell::{CellBuffer, RoadFlags};
use crate::config::GenerationConfig;
use crate::error::GenerateError;
use crate::seeds::WorldSeeds;
use crate::world::HexGrid;
use crate::{climate, features, land, rivers, roads};

/// How many work units a stage may process between cancellation checks.
pub const CANCEL_CHECK_INTERVAL: usize = 256;

/// Pipeline stages in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Resetting,
    Land,
    Climate,
    Rivers,
    Features,
    Roads,
    Applying,
    Complete,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Resetting => "Resetting",
            Stage::Land => "Land",
            Stage::Climate => "Climate",
            Stage::Rivers => "Rivers",
            Stage::Features => "Features",
            Stage::Roads => "Roads",
            Stage::Applying => "Applying",
            Stage::Complete => "Complete",
        }
    }
}

/// One progress message: stage plus completion fraction 0..1.
#[derive(Clone, Copy, Debug)]
pub struct Progress {
    pub stage: Stage,
    pub fraction: f32,
}

/// Terminal outcome of a run. Failure travels separately as
/// `Err(GenerateError)`.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Complete,
    Cancelled,
}

/// Cancellation and progress plumbing handed to each stage.
pub struct StageContext<'a> {
    stage: Stage,
    cancel: Option<&'a AtomicBool>,
    progress: Option<&'a Sender<Progress>>,
}

impl<'a> StageContext<'a> {
    pub fn new(stage: Stage, cancel: &'a AtomicBool, progress: &'a Sender<Progress>) -> Self {
        Self {
            stage,
            cancel: Some(cancel),
            progress: Some(progress),
        }
    }

    /// Context with no cancellation or progress wiring, for running a
    /// stage in isolation.
    pub fn detached(stage: Stage) -> StageContext<'static> {
        StageContext {
            stage,
            cancel: None,
            progress: None,
        }
    }

    /// Cooperative cancellation check, sampled every
    /// `CANCEL_CHECK_INTERVAL` work units.
    pub fn check_cancelled(&self, unit: usize) -> Result<(), GenerateError> {
        if unit % CANCEL_CHECK_INTERVAL == 0 {
            if let Some(cancel) = self.cancel {
                if cancel.load(Ordering::Relaxed) {
                    return Err(GenerateError::Cancelled);
                }
            }
        }
        Ok(())
    }

    /// Report fractional progress for this stage. Dropped receivers are
    /// ignored; progress is advisory.
    pub fn report(&self, fraction: f32) {
        if let Some(progress) = self.progress {
            let _ = progress.send(Progress {
                stage: self.stage,
                fraction: fraction.clamp(0.0, 1.0),
            });
        }
    }
}

/// Run every stage against a fresh buffer. Pure compute: the live grid is
/// never touched here.
pub fn run_pipeline(
    config: &GenerationConfig,
    width: usize,
    height: usize,
    seed: u64,
    cancel: &AtomicBool,
    progress: &Sender<Progress>,
) -> Result<CellBuffer, GenerateError> {
    config.validate()?;
    let seeds = WorldSeeds::from_master(seed);
    debug!("pipeline start: {}x{} {}", width, height, seeds);

    let ctx = StageContext::new(Stage::Resetting, cancel, progress);
    ctx.report(0.0);
    let mut cells = CellBuffer::new(width, height, config.min_elevation, config.water_level);
    ctx.report(1.0);

    let ctx = StageContext::new(Stage::Land, cancel, progress);
    ctx.report(0.0);
    let mut rng = ChaCha8Rng::seed_from_u64(seeds.land);
    land::generate(&mut cells, config, &mut rng, &ctx)?;

    let ctx = StageContext::new(Stage::Climate, cancel, progress);
    ctx.report(0.0);
    climate::generate(&mut cells, config, seeds.climate, &ctx)?;

    let ctx = StageContext::new(Stage::Rivers, cancel, progress);
    ctx.report(0.0);
    let mut rng = ChaCha8Rng::seed_from_u64(seeds.rivers);
    rivers::generate(&mut cells, config, &mut rng, &ctx)?;

    let ctx = StageContext::new(Stage::Features, cancel, progress);
    ctx.report(0.0);
    let mut rng = ChaCha8Rng::seed_from_u64(seeds.features);
    features::generate(&mut cells, config, &mut rng, &ctx)?;

    let ctx = StageContext::new(Stage::Roads, cancel, progress);
    ctx.report(0.0);
    roads::generate(&mut cells, config, &ctx)?;

    Ok(cells)
}

/// Apply a finished buffer to the live grid in three ordered passes,
/// wrapped in one batched visual refresh.
fn apply_to_grid(grid: &mut HexGrid, cells: &CellBuffer) -> Result<(), GenerateError> {
    if grid.width != cells.width || grid.height != cells.height {
        return Err(GenerateError::GridMismatch {
            buffer_width: cells.width,
            buffer_height: cells.height,
            grid_width: grid.width,
            grid_height: grid.height,
        });
    }

    grid.begin_bulk_edit();

    // Pass 1: scalar properties. Rivers and roads are cleared so passes
    // 2 and 3 rebuild them against the new elevations.
    for (index, source) in cells.iter() {
        let target = grid.cell_at_mut(index);
        target.elevation = source.elevation;
        target.terrain = source.terrain;
        target.moisture = source.moisture;
        target.urban_level = source.urban_level;
        target.farm_level = source.farm_level;
        target.plant_level = source.plant_level;
        target.special = source.special;
        target.walled = source.walled;
        target.incoming_river = None;
        target.outgoing_river = None;
        target.roads = RoadFlags::NONE;
    }

    // Pass 2: rivers, validated against the already-applied neighbor
    // elevations (a river may not climb out of a cell).
    for (index, source) in cells.iter() {
        if let Some(direction) = source.outgoing_river {
            if let Some(neighbor) = grid.neighbor(index, direction) {
                let valid = grid.cell_at(neighbor).elevation <= grid.cell_at(index).elevation
                    || !grid.is_land(neighbor);
                if valid {
                    grid.cell_at_mut(index).outgoing_river = Some(direction);
                    grid.cell_at_mut(neighbor).incoming_river = Some(direction.opposite());
                }
            }
        }
    }

    // Pass 3: roads, which may depend on the applied river state.
    for (index, source) in cells.iter() {
        grid.cell_at_mut(index).roads = source.roads;
    }

    grid.request_refresh();
    grid.end_bulk_edit();
    Ok(())
}

struct Worker {
    handle: JoinHandle<Result<CellBuffer, GenerateError>>,
    progress_rx: Receiver<Progress>,
}

/// Drives generation runs against a live grid, one at a time.
pub struct MapGenerator {
    pub config: GenerationConfig,
    cancel: Arc<AtomicBool>,
    progress_tx: Sender<Progress>,
    progress_rx: Receiver<Progress>,
    worker: Option<Worker>,
}

impl MapGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        let (progress_tx, progress_rx) = channel();
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
            progress_tx,
            progress_rx,
            worker: None,
        }
    }

    /// Whether a background run is active (finished or not).
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Whether a background run has completed its compute phase and is
    /// ready for `finish()`.
    pub fn is_finished(&self) -> bool {
        self.worker
            .as_ref()
            .map(|w| w.handle.is_finished())
            .unwrap_or(false)
    }

    /// Request cooperative cancellation of the active run. The worker
    /// exits after its current bounded unit of work.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Drain queued progress messages without blocking.
    pub fn drain_progress(&mut self) -> Vec<Progress> {
        self.progress_rx.try_iter().collect()
    }

    /// Run the whole pipeline on the caller's thread and apply the result.
    pub fn generate(&mut self, grid: &mut HexGrid, seed: u64) -> Result<Outcome, GenerateError> {
        if self.worker.is_some() {
            return Err(GenerateError::Busy);
        }
        self.cancel.store(false, Ordering::Relaxed);

        let result = run_pipeline(
            &self.config,
            grid.width,
            grid.height,
            seed,
            &self.cancel,
            &self.progress_tx,
        );
        match result {
            Ok(cells) => {
                self.apply(grid, &cells)?;
                info!("generation complete (seed {})", seed);
                Ok(Outcome::Complete)
            }
            Err(GenerateError::Cancelled) => {
                // Partial work is discarded silently.
                info!("generation cancelled (seed {})", seed);
                Ok(Outcome::Cancelled)
            }
            Err(error) => Err(error),
        }
    }

    /// Launch the pipeline on a dedicated background worker against an
    /// isolated buffer. Rejected while another run is active. The live
    /// grid is untouched until `finish()`.
    pub fn start(&mut self, width: usize, height: usize, seed: u64) -> Result<(), GenerateError> {
        if self.worker.is_some() {
            return Err(GenerateError::Busy);
        }
        self.config.validate()?;
        self.cancel.store(false, Ordering::Relaxed);

        let config = self.config.clone();
        let cancel = Arc::clone(&self.cancel);
        // Worker progress queues in its own channel and is flushed at
        // finish, so the caller thread never observes mid-run state.
        let (progress_tx, progress_rx) = channel();
        let handle = thread::Builder::new()
            .name("hexmap-generator".into())
            .spawn(move || run_pipeline(&config, width, height, seed, &cancel, &progress_tx))
            .map_err(|e| GenerateError::Worker(e.to_string()))?;

        self.worker = Some(Worker {
            handle,
            progress_rx,
        });
        Ok(())
    }

    /// Join the background worker and apply its buffer to the grid on the
    /// caller's thread. Blocks if the worker is still computing; poll
    /// `is_finished()` to avoid that. Flushes queued worker progress into
    /// the generator's progress queue.
    pub fn finish(&mut self, grid: &mut HexGrid) -> Result<Outcome, GenerateError> {
        let worker = self.worker.take().ok_or(GenerateError::NotRunning)?;

        let result = worker
            .handle
            .join()
            .map_err(|panic| GenerateError::Worker(panic_message(&panic)))?;

        // The worker has exited, so this flushes its whole progress queue.
        for message in worker.progress_rx.try_iter() {
            let _ = self.progress_tx.send(message);
        }

        match result {
            Ok(cells) => {
                self.apply(grid, &cells)?;
                info!("background generation applied");
                Ok(Outcome::Complete)
            }
            Err(GenerateError::Cancelled) => {
                info!("background generation cancelled");
                Ok(Outcome::Cancelled)
            }
            Err(error) => Err(error),
        }
    }

    fn apply(&self, grid: &mut HexGrid, cells: &CellBuffer) -> Result<(), GenerateError> {
        let ctx = StageContext::new(Stage::Applying, &self.cancel, &self.progress_tx);
        ctx.report(0.0);
        apply_to_grid(grid, cells)?;
        ctx.report(1.0);
        let _ = self.progress_tx.send(Progress {
            stage: Stage::Complete,
            fraction: 1.0,
        });
        Ok(())
    }
}

impl Default for MapGenerator {
    fn default() -> Self {
        Self::new(GenerationConfig::default())
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
