// argus_sim/src/simulation/runner.rs

//! The closed-loop simulation: truth trajectory, pose sensor and filter.
//!
//! No inertial propagation is simulated. Each new snapshot takes its
//! navigation states from the truth and its calibration states and covariance
//! from the filter, inflated by process noise. Since the navigation states are
//! replaced, their correlation with the rest of the state is cleared.

use std::collections::VecDeque;
use std::sync::Arc;

use argus_core::prelude::{
    AbortReason, ErrorStateBlock, ErrorStateEkf, FilterState, PoseMeasurement,
    PoseSensorConfig, PoseUpdateHandler, SharedPoseConfig, StateIndex, UpdateOutcome,
};
use tracing::{debug, info};

use crate::error::{Result, SimError};
use crate::simulation::config::{CalibrationConfig, ReconfigureEvent, ScenarioConfig};
use crate::simulation::prng::SimulationRng;
use crate::simulation::report::{CalibrationError, RunReport};
use crate::simulation::sensor::PoseSensor;
use crate::simulation::trajectory::{CircularTrajectory, TruthSample};

// Timestamps closer than this are treated as simultaneous.
const TIME_EPSILON: f64 = 1e-9;

/// Counters accumulated while the simulation runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub snapshots: u64,
    pub readings: u64,
    pub dispatched: u64,
    pub aborted_stale: u64,
    pub aborted_invalid: u64,
    innovation_sq_sum: f64,
}

impl RunStats {
    /// RMS of the position innovation over all dispatched readings.
    pub fn position_innovation_rms(&self) -> f64 {
        if self.dispatched == 0 {
            return 0.0;
        }
        (self.innovation_sq_sum / self.dispatched as f64).sqrt()
    }
}

pub struct Simulation {
    scenario: ScenarioConfig,
    rng: SimulationRng,
    trajectory: CircularTrajectory,
    sensor: PoseSensor,
    engine: ErrorStateEkf,
    handler: PoseUpdateHandler,
    /// Readings in flight, ordered by delivery time.
    pending: VecDeque<(f64, PoseMeasurement)>,
    /// Reconfigurations not yet applied, ordered by time.
    reconfigure: VecDeque<ReconfigureEvent>,
    /// The most recently corrected snapshot, the best base for the next one.
    last_corrected: Option<StateIndex>,
    stats: RunStats,
}

impl Simulation {
    pub fn new(scenario: ScenarioConfig) -> Result<Self> {
        scenario.validate()?;

        let rng = SimulationRng::from_seed_option(scenario.simulation.seed);
        let trajectory = CircularTrajectory::new(scenario.trajectory.clone());
        let sensor = PoseSensor::new(scenario.sensor.clone())?;

        let mut initial = FilterState::new(0.0, scenario.estimator.initial_variance);
        set_navigation(&mut initial, &trajectory.sample(0.0));
        set_calibration(&mut initial, &scenario.estimator.initial);
        let engine = ErrorStateEkf::new(initial, scenario.history);

        let handler = PoseUpdateHandler::new(SharedPoseConfig::new(scenario.pose_model));

        let mut events = scenario.reconfigure.clone();
        events.sort_by(|a, b| a.at.total_cmp(&b.at));

        Ok(Self {
            rng,
            trajectory,
            sensor,
            engine,
            handler,
            pending: VecDeque::new(),
            reconfigure: events.into(),
            last_corrected: None,
            stats: RunStats::default(),
            scenario,
        })
    }

    pub fn engine(&self) -> &ErrorStateEkf {
        &self.engine
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// The handler's configuration, for reconfiguring it from outside the loop.
    pub fn shared_config(&self) -> &Arc<SharedPoseConfig> {
        self.handler.config()
    }

    /// Runs the scenario to completion and summarizes the result.
    pub fn run(mut self) -> Result<RunReport> {
        let rate = self.scenario.simulation.state_rate;
        let steps = (self.scenario.simulation.duration_seconds * rate).round() as u64;
        info!(
            steps,
            rate,
            sensor_rate = self.sensor.config().rate,
            convention = ?self.sensor.config().convention,
            "starting simulation"
        );

        for k in 1..=steps {
            let t = k as f64 / rate;
            self.step(t);
            if k % rate.round().max(1.0) as u64 == 0 {
                if let Some(estimate) = self.engine.latest_state() {
                    debug!(t, scale = estimate.scale, dispatched = self.stats.dispatched, "progress");
                }
            }
        }

        let report = self.report()?;
        info!(
            dispatched = report.dispatched,
            aborted = report.aborted_stale + report.aborted_invalid,
            scale = report.scale.estimated,
            "simulation finished"
        );
        Ok(report)
    }

    /// Advances the world to time `t`.
    pub fn step(&mut self, t: f64) {
        self.apply_reconfigurations(t);

        let truth = self.trajectory.sample(t);
        self.record_snapshot(&truth);

        if self.sensor.poll(t) {
            let mut truth_state = FilterState::new(t, 0.0);
            set_navigation(&mut truth_state, &truth);
            set_calibration(&mut truth_state, &self.scenario.truth);

            let reading = self.sensor.capture(&truth_state, &mut self.rng);
            self.stats.readings += 1;
            self.pending
                .push_back((t + self.sensor.config().latency, reading));
        }

        while self
            .pending
            .front()
            .is_some_and(|(deliver_at, _)| *deliver_at <= t + TIME_EPSILON)
        {
            if let Some((_, reading)) = self.pending.pop_front() {
                self.deliver(&reading);
            }
        }
    }

    fn apply_reconfigurations(&mut self, t: f64) {
        while self
            .reconfigure
            .front()
            .is_some_and(|event| event.at <= t + TIME_EPSILON)
        {
            let Some(event) = self.reconfigure.pop_front() else {
                break;
            };
            let shared = self.handler.config();
            match event.use_fixed_covariance {
                Some(fixed) => {
                    let next = PoseSensorConfig {
                        position_noise: event.position_noise,
                        attitude_noise: event.attitude_noise,
                        use_fixed_covariance: fixed,
                        ..*shared.snapshot()
                    };
                    shared.update(next);
                }
                None => {
                    shared.update_noise(event.position_noise, event.attitude_noise);
                }
            }
            debug!(t, at = event.at, "applied scheduled reconfiguration");
        }
    }

    /// Records the nominal snapshot for `truth.timestamp`.
    fn record_snapshot(&mut self, truth: &TruthSample) {
        let corrected = self.last_corrected.and_then(|index| self.engine.state(index));
        let Some(latest) = self.engine.latest_state() else {
            return;
        };

        let mut next = latest.clone();
        let base_time = match corrected {
            Some(corrected) => {
                next.covariance = corrected.covariance.clone();
                corrected.timestamp
            }
            None => latest.timestamp,
        };
        let dt = (truth.timestamp - base_time).max(0.0);
        self.add_process_noise(&mut next, dt);

        next.timestamp = truth.timestamp;
        set_navigation(&mut next, truth);
        decouple_navigation(&mut next);

        self.engine.record_state(next);
        self.stats.snapshots += 1;
    }

    fn add_process_noise(&self, state: &mut FilterState, dt: f64) {
        let estimator = &self.scenario.estimator;
        for block in ErrorStateBlock::ALL {
            let rate = match block {
                ErrorStateBlock::Position | ErrorStateBlock::Velocity | ErrorStateBlock::Attitude => {
                    estimator.navigation_process_noise
                }
                b if b.is_calibration() => estimator.calibration_process_noise,
                _ => 0.0,
            };
            for i in block.columns() {
                state.covariance[(i, i)] += rate * dt;
            }
        }
    }

    fn deliver(&mut self, reading: &PoseMeasurement) {
        match self.handler.handle(&mut self.engine, reading) {
            UpdateOutcome::Dispatched { index, residual } => {
                self.stats.dispatched += 1;
                self.stats.innovation_sq_sum += residual.fixed_rows::<3>(0).norm_squared();
                self.last_corrected = Some(index);
            }
            UpdateOutcome::Aborted(AbortReason::StaleHistory(_)) => self.stats.aborted_stale += 1,
            UpdateOutcome::Aborted(AbortReason::Measurement(_)) => self.stats.aborted_invalid += 1,
        }
    }

    fn report(&self) -> Result<RunReport> {
        let estimate = self.engine.latest_state().ok_or(SimError::EmptyHistory)?;
        let truth = &self.scenario.truth;
        let scale = ErrorStateBlock::Scale.offset();

        Ok(RunReport {
            duration_seconds: self.scenario.simulation.duration_seconds,
            snapshots: self.stats.snapshots,
            readings: self.stats.readings,
            dispatched: self.stats.dispatched,
            aborted_stale: self.stats.aborted_stale,
            aborted_invalid: self.stats.aborted_invalid,
            updates_applied: self.engine.updates_applied(),
            position_innovation_rms: self.stats.position_innovation_rms(),
            scale: CalibrationError {
                estimated: estimate.scale,
                truth: truth.scale,
                stddev: estimate.covariance[(scale, scale)].max(0.0).sqrt(),
            },
            vision_world_error_deg: estimate
                .vision_world
                .angle_to(&truth.vision_world())
                .to_degrees(),
            camera_imu_rotation_error_deg: estimate
                .camera_imu_rotation
                .angle_to(&truth.camera_imu_rotation())
                .to_degrees(),
            camera_imu_translation_error: (estimate.camera_imu_translation
                - truth.camera_imu_translation())
            .norm(),
        })
    }
}

fn set_navigation(state: &mut FilterState, truth: &TruthSample) {
    state.position = truth.position;
    state.velocity = truth.velocity;
    state.orientation = truth.orientation;
}

/// Zeroes the covariance between the navigation blocks (position, velocity,
/// attitude) and every other block.
fn decouple_navigation(state: &mut FilterState) {
    let navigation = ErrorStateBlock::Position.offset()..ErrorStateBlock::Attitude.columns().end;
    let dim = state.covariance.nrows();
    for i in navigation.clone() {
        for j in (0..dim).filter(|j| !navigation.contains(j)) {
            state.covariance[(i, j)] = 0.0;
            state.covariance[(j, i)] = 0.0;
        }
    }
}

fn set_calibration(state: &mut FilterState, calibration: &CalibrationConfig) {
    state.scale = calibration.scale;
    state.vision_world = calibration.vision_world();
    state.camera_imu_rotation = calibration.camera_imu_rotation();
    state.camera_imu_translation = calibration.camera_imu_translation();
}
