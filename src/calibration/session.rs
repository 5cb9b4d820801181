//! Calibration sessions driven by a landmark source.
//!
//! Collection is frame-at-a-time: each frame is tracked, then the control is
//! polled for abort and, until recording starts, for the start signal. An
//! abort discards the in-progress point and leaves every model untouched.

use log::{debug, info};

use super::{calibration_targets, CalibrationFitter, CalibrationPoint, FitReport};
use crate::{
    config::CalibrationConfig,
    gaze_vector::GazeVector,
    source::LandmarkSource,
    tracker::GazeTracker,
    Error, Result,
};

/// User input during a calibration session
pub trait SessionControl {
    /// Whether the user is fixating `target` and recording should begin.
    /// Polled once per frame until it returns `true`.
    fn start_requested(&mut self, target: (i32, i32)) -> bool;

    /// Whether the user cancelled. Polled once per frame.
    fn abort_requested(&mut self) -> bool;
}

/// Starts recording on the first frame of every point and never aborts
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoStart;

impl SessionControl for AutoStart {
    fn start_requested(&mut self, _target: (i32, i32)) -> bool {
        true
    }

    fn abort_requested(&mut self) -> bool {
        false
    }
}

/// Gathers combined gaze vectors for one target
#[derive(Debug, Clone, Copy)]
pub struct SampleCollector {
    samples_per_point: usize,
    reset_filters_on_start: bool,
}

impl SampleCollector {
    /// Collector that resets the tracker's filters when recording starts
    pub fn new(samples_per_point: usize) -> Self {
        Self {
            samples_per_point: samples_per_point.max(1),
            reset_filters_on_start: true,
        }
    }

    pub fn with_filter_reset(mut self, reset: bool) -> Self {
        self.reset_filters_on_start = reset;
        self
    }

    pub fn samples_per_point(&self) -> usize {
        self.samples_per_point
    }

    /// Record samples for `target` until enough frames produced an estimate.
    /// Frames without an estimate are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Error::CalibrationAborted` on abort and `Error::Source` if
    /// the source ends first; source errors propagate unchanged
    pub fn collect<S, C>(
        &self,
        tracker: &mut GazeTracker,
        source: &mut S,
        control: &mut C,
        target: (i32, i32),
    ) -> Result<Vec<GazeVector>>
    where
        S: LandmarkSource + ?Sized,
        C: SessionControl + ?Sized,
    {
        let mut samples = Vec::with_capacity(self.samples_per_point);
        let mut recording = false;

        loop {
            let frame = source
                .next_frame()?
                .ok_or_else(|| Error::Source("Landmark stream ended during calibration".to_string()))?;
            let estimate = tracker.process_frame(&frame);

            if control.abort_requested() {
                info!("Calibration aborted at target {target:?}");
                return Err(Error::CalibrationAborted);
            }

            if !recording && control.start_requested(target) {
                recording = true;
                samples.clear();
                if self.reset_filters_on_start {
                    tracker.reset_filters();
                }
            }

            if recording {
                if let Some(estimate) = estimate {
                    samples.push(estimate.combined);
                    if samples.len() >= self.samples_per_point {
                        debug!("Collected {} samples for {target:?}", samples.len());
                        return Ok(samples);
                    }
                }
            }
        }
    }
}

/// Full calibration: collect every target, then fit
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    targets: Vec<(i32, i32)>,
    collector: SampleCollector,
}

impl CalibrationSession {
    pub fn new(targets: Vec<(i32, i32)>, samples_per_point: usize) -> Self {
        Self {
            targets,
            collector: SampleCollector::new(samples_per_point),
        }
    }

    /// Session with the configured target layout
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an unsupported point count
    pub fn from_config(config: &CalibrationConfig, screen_width: u32, screen_height: u32) -> Result<Self> {
        let targets = calibration_targets(config.num_points, screen_width, screen_height, config.margin)?;
        Ok(Self::new(targets, config.samples_per_point))
    }

    pub fn targets(&self) -> &[(i32, i32)] {
        &self.targets
    }

    /// Collect samples for every target
    ///
    /// # Errors
    ///
    /// Propagates abort and source errors from [`SampleCollector::collect`]
    pub fn collect<S, C>(&self, tracker: &mut GazeTracker, source: &mut S, control: &mut C) -> Result<Vec<CalibrationPoint>>
    where
        S: LandmarkSource + ?Sized,
        C: SessionControl + ?Sized,
    {
        let mut points = Vec::with_capacity(self.targets.len());
        for (i, &target) in self.targets.iter().enumerate() {
            info!("Point {}/{}: {target:?}", i + 1, self.targets.len());
            let samples = self.collector.collect(tracker, source, control, target)?;
            points.push(CalibrationPoint::new(target, samples));
        }
        info!("Collected data from {} points", points.len());
        Ok(points)
    }

    /// Collect every target and fit. The fitter is only modified by a
    /// successful fit.
    ///
    /// # Errors
    ///
    /// Returns abort, source and fit errors
    pub fn run<S, C>(
        &self,
        tracker: &mut GazeTracker,
        source: &mut S,
        control: &mut C,
        fitter: &mut CalibrationFitter,
    ) -> Result<FitReport>
    where
        S: LandmarkSource + ?Sized,
        C: SessionControl + ?Sized,
    {
        let points = self.collect(tracker, source, control)?;
        fitter.fit(&points)
    }
}
