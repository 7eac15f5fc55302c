//! Synthetic collaborators for headless runs: generated PCM audio, an obstacle
//! scene with a wall, a moving anchor and a JSON-lines record writer.

use anyhow::Result;
use clap::ValueEnum;
use orbflow_core::{
    AnalysisSnapshot, CollisionOracle, FftSpectrumSource, Hit, LayerMask, ObstacleScene,
    OutputParameterSet, OwnerId, ParameterTable, Shape, Vec3,
};
use serde::Serialize;
use std::cell::RefCell;
use std::f32::consts::TAU;
use std::io::Write;
use std::rc::Rc;

/// Audio fed to the spectral source
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// 120 BPM kick drum over a quiet pad
    Kick,
    /// Bass, mid and treble tones with slow swells
    Tones,
    /// Nothing loaded; the engine writes its fallback set
    Silence,
}

/// Generates mono PCM for a scenario
pub struct SyntheticAudio {
    scenario: Scenario,
    sample_rate: f32,
    time: f32,
    pending: f32,
}

impl SyntheticAudio {
    pub fn new(scenario: Scenario, sample_rate: u32) -> Self {
        Self {
            scenario,
            sample_rate: sample_rate as f32,
            time: 0.0,
            pending: 0.0,
        }
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// Samples covering the next `dt` seconds; fractional samples carry over
    pub fn next_block(&mut self, dt: f32) -> Vec<f32> {
        if self.scenario == Scenario::Silence {
            return Vec::new();
        }
        self.pending += dt * self.sample_rate;
        let count = self.pending.floor();
        self.pending -= count;

        let step = 1.0 / self.sample_rate;
        (0..count as usize)
            .map(|_| {
                let sample = self.sample_at(self.time);
                self.time += step;
                sample
            })
            .collect()
    }

    fn sample_at(&self, t: f32) -> f32 {
        match self.scenario {
            Scenario::Kick => {
                let beat = t.rem_euclid(0.5);
                let kick = (TAU * 55.0 * beat).sin() * (-beat * 14.0).exp();
                let pad = (TAU * 440.0 * t).sin() * 0.05;
                kick * 0.8 + pad
            }
            Scenario::Tones => {
                let swell = |rate: f32| 0.5 + 0.5 * (TAU * rate * t).sin();
                (TAU * 80.0 * t).sin() * 0.4 * swell(0.25)
                    + (TAU * 800.0 * t).sin() * 0.3 * swell(0.4)
                    + (TAU * 5000.0 * t).sin() * 0.2 * swell(0.7)
            }
            Scenario::Silence => 0.0,
        }
    }
}

/// Prepare the source for a scenario of `seconds` length
pub fn prepare_source(source: &mut FftSpectrumSource, scenario: Scenario, seconds: f32) {
    if scenario == Scenario::Silence {
        source.unload();
        return;
    }
    // A little longer than the run so playback never hits the end
    source.load(Some(seconds + 1.0));
    source.play();
}

/// The owner id of the orb's own geometry
pub const ORB_OWNER: OwnerId = OwnerId(1);

/// Radius of the orb's own collision sphere
const ORB_BODY_RADIUS: f32 = 0.1;

/// A wall at x = 1 plus a sphere around the orb itself.
///
/// Clones share the scene, so the runner can keep moving the orb's sphere
/// after the engine has taken its copy.
#[derive(Clone)]
pub struct DemoScene {
    scene: Rc<RefCell<ObstacleScene>>,
    orb_collider: u64,
}

impl DemoScene {
    pub fn new() -> Self {
        let mut scene = ObstacleScene::new();
        scene.add_box(
            OwnerId(0),
            0,
            Vec3::new(1.0, -2.0, -2.0),
            Vec3::new(1.5, 2.0, 2.0),
        );
        let orb_collider = scene.add_sphere(ORB_OWNER, 0, Vec3::ZERO, ORB_BODY_RADIUS);
        Self {
            scene: Rc::new(RefCell::new(scene)),
            orb_collider,
        }
    }

    /// Keep the orb's sphere centered on the anchor
    pub fn move_orb(&self, anchor: Vec3) {
        self.scene.borrow_mut().set_shape(
            self.orb_collider,
            Shape::Sphere {
                center: anchor,
                radius: ORB_BODY_RADIUS,
            },
        );
    }
}

impl Default for DemoScene {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionOracle for DemoScene {
    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: LayerMask) -> Vec<Hit> {
        self.scene.borrow().overlap_sphere(center, radius, layers)
    }
}

/// Anchor drifting toward and away from the wall
pub fn anchor_at(time: f32) -> Vec3 {
    Vec3::new(0.6 * (time * 0.5).sin(), 0.0, 0.0)
}

#[derive(Serialize)]
struct TickRecord<'a> {
    tick: u64,
    time: f64,
    signal: bool,
    beat: bool,
    tempo_bpm: Option<f32>,
    outputs: &'a OutputParameterSet,
    parameters: &'a ParameterTable,
}

/// Write one JSON object per tick
pub struct JsonLinesWriter<W: Write> {
    out: W,
    lines: u64,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, lines: 0 }
    }

    pub fn write(
        &mut self,
        tick: u64,
        snapshot: &AnalysisSnapshot,
        outputs: &OutputParameterSet,
        parameters: &ParameterTable,
    ) -> Result<()> {
        let record = TickRecord {
            tick,
            time: snapshot.time,
            signal: snapshot.signal_present,
            beat: snapshot.beat,
            tempo_bpm: snapshot.tempo_bpm,
            outputs,
            parameters,
        };
        serde_json::to_writer(&mut self.out, &record)?;
        self.out.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}
