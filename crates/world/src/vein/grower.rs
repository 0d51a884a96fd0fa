//! Vein growth: a biased 3D random walk scattering ore around its path.
//!
//! Growth runs in two phases. [`VeinGrower::sample`] consumes the random
//! source in a fixed order and produces every candidate; it never touches the
//! world. [`VeinGrower::grow`] then routes the candidates, writes the ones
//! landing in existing chunks and applies the acceptance gate to pebbles.

use std::collections::BTreeMap;
use std::f32::consts::TAU;
use std::sync::OnceLock;

use glam::{Mat3, Vec3};
use rand::Rng;
use terra_core::RegistryKey;
use tracing::{debug, instrument};

use crate::access::WorldAccess;
use crate::blocks::tags;
use crate::chunk::{BlockPos, BlockState};
use crate::deferred::SharedDeferredStore;
use crate::router::{PlacementRouter, Routed};
use crate::vein::config::{Depth, VeinConfig};
use crate::vein::replacer::{first_match, ReplacerList};

/// Raw output of the random walk, before any world lookups.
#[derive(Debug, Clone, Default)]
pub struct VeinSample {
    /// Segments walked.
    pub length: u32,
    /// Direction changes taken.
    pub bends: u32,
    /// Stages that passed their spawn roll.
    pub active_stages: usize,
    /// Deduplicated ore candidates; later stages overwrite earlier ones.
    pub ores: BTreeMap<BlockPos, ReplacerList>,
    /// Pebble columns `(x, z, state)` in draw order.
    pub pebbles: Vec<(i32, i32, BlockState)>,
    /// Axis point of each segment (root plus the rotated segment offset).
    pub path: Vec<Vec3>,
}

/// Result of growing one vein into a world.
#[derive(Debug, Clone, Default)]
pub struct VeinOutcome {
    pub length: u32,
    /// Ore candidates after deduplication.
    pub candidates: usize,
    pub deferred_ores: usize,
    pub dropped_ores: usize,
    pub deferred_pebbles: usize,
    /// Ores written to existing chunks.
    pub placed_ores: BTreeMap<BlockPos, BlockState>,
    /// Pebbles written to existing chunks (empty unless accepted).
    pub placed_pebbles: BTreeMap<BlockPos, BlockState>,
    pub accepted: bool,
}

/// Outcome of [`commit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commit {
    pub placed_ores: BTreeMap<BlockPos, BlockState>,
    pub placed_pebbles: BTreeMap<BlockPos, BlockState>,
    pub accepted: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VeinGrower {
    router: PlacementRouter,
}

impl VeinGrower {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk the vein starting at `start`. Depth-dependent parameters are
    /// evaluated at `start.y`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        start: BlockPos,
        config: &VeinConfig,
        rng: &mut R,
    ) -> VeinSample {
        let depth = Depth(start.y);
        let tuning = config.tuning;

        let (min_length, max_length) = config.lengths(depth);
        let length = rng.gen_range(min_length..=max_length);

        let mut angles = Vec3::new(
            rng.gen::<f32>() * TAU,
            rng.gen::<f32>() * TAU,
            rng.gen::<f32>() * TAU,
        );
        let mut rotation = rotation_xyz(angles);
        let mut root = Vec3::new(start.x as f32, start.y as f32, start.z as f32);

        let stages: Vec<_> = config
            .stages
            .iter()
            .filter(|stage| rng.gen::<f32>() < stage.spawn_chance.at(depth))
            .map(|stage| {
                let (min_radius, max_radius) = stage.radii(depth);
                (stage, min_radius, max_radius, stage.block_count(depth))
            })
            .collect();

        let mut sample = VeinSample {
            length,
            active_stages: stages.len(),
            ..VeinSample::default()
        };

        let mut divisor = tuning.direction_change_divisor.max(1);
        let mut segment = 0u32;
        let mut offset = Vec3::ZERO;

        for _ in 0..length {
            if rng.gen_range(0..divisor) == 0 {
                divisor += tuning.divisor_step;
                let mut budget = tuning.rotation_budget;
                for axis in 0..3 {
                    let change = rng.gen::<f32>() * budget;
                    budget -= change;
                    angles[axis] += rng.gen::<f32>() * change - change / 2.0;
                }
                rotation = rotation_xyz(angles);
                root += offset;
                segment = 0;
                sample.bends += 1;
            }
            divisor = divisor.saturating_sub(1).max(1);

            let along = segment as f32;
            sample.path.push(root + rotation * Vec3::new(along, 0.0, 0.0));

            for (stage, min_radius, max_radius, count) in &stages {
                for _ in 0..*count {
                    let radius = rng.gen_range(*min_radius..=*max_radius) as f32;
                    let angle = rng.gen::<f32>() * TAU;
                    offset = rotation * Vec3::new(along, angle.sin() * radius, angle.cos() * radius);
                    sample
                        .ores
                        .insert(block_at(root + offset), stage.replacers.clone());
                }
            }

            for pebble in &config.pebbles {
                if rng.gen::<f32>() < pebble.density {
                    let (x, z) = pebble_column(root + offset);
                    sample.pebbles.push((x, z, pebble.state));
                }
            }

            segment += 1;
        }

        sample
    }

    /// Sample a vein, write what lands in existing chunks and defer the rest.
    #[instrument(skip_all, fields(start = %start))]
    pub fn grow<W: WorldAccess + ?Sized, R: Rng + ?Sized>(
        &self,
        world: &mut W,
        store: &SharedDeferredStore,
        start: BlockPos,
        config: &VeinConfig,
        rng: &mut R,
    ) -> VeinOutcome {
        let sample = self.sample(start, config, rng);

        let mut outcome = VeinOutcome {
            length: sample.length,
            candidates: sample.ores.len(),
            ..VeinOutcome::default()
        };
        let mut immediate_ores = BTreeMap::new();
        let mut immediate_pebbles = BTreeMap::new();

        {
            let mut guard = store.lock();
            for (pos, replacers) in &sample.ores {
                match self.router.route_ore(&*world, &mut guard, *pos, replacers) {
                    Routed::Immediate => {
                        immediate_ores.insert(*pos, replacers.clone());
                    }
                    Routed::Deferred => outcome.deferred_ores += 1,
                    Routed::Dropped => outcome.dropped_ores += 1,
                }
            }
            for &(x, z, pebble) in &sample.pebbles {
                match self.router.route_pebble(&*world, &mut guard, x, z, pebble) {
                    Routed::Immediate => {
                        if let Some(pos) = resolve_surface(&*world, x, z, pebble) {
                            immediate_pebbles.insert(pos, pebble);
                        }
                    }
                    Routed::Deferred => outcome.deferred_pebbles += 1,
                    Routed::Dropped => {}
                }
            }
        }

        let committed = commit(
            world,
            &immediate_ores,
            &immediate_pebbles,
            config.tuning.acceptance_threshold,
        );
        outcome.placed_ores = committed.placed_ores;
        outcome.placed_pebbles = committed.placed_pebbles;
        outcome.accepted = committed.accepted;

        debug!(
            length = outcome.length,
            bends = sample.bends,
            candidates = outcome.candidates,
            immediate = immediate_ores.len(),
            placed = outcome.placed_ores.len(),
            deferred = outcome.deferred_ores,
            dropped = outcome.dropped_ores,
            accepted = outcome.accepted,
            "grew vein"
        );
        if !outcome.accepted && !immediate_pebbles.is_empty() {
            debug!(
                pebbles = immediate_pebbles.len(),
                "vein rejected, discarding pebbles"
            );
        }
        outcome
    }
}

/// Write every ore whose first matching replacer accepts the live block, then
/// write `pebbles` only if the placed fraction reaches `threshold`.
///
/// An empty ore set is never accepted.
pub fn commit<W: WorldAccess + ?Sized>(
    world: &mut W,
    ores: &BTreeMap<BlockPos, ReplacerList>,
    pebbles: &BTreeMap<BlockPos, BlockState>,
    threshold: f32,
) -> Commit {
    let mut placed_ores = BTreeMap::new();
    for (pos, replacers) in ores {
        let existing = world.block_state(*pos);
        if let Some(replacer) = first_match(replacers, &*world, existing) {
            let place = replacer.place();
            world.set_block_state(*pos, place);
            placed_ores.insert(*pos, place);
        }
    }

    let accepted = !ores.is_empty() && placed_ores.len() as f32 / ores.len() as f32 >= threshold;
    let mut placed_pebbles = BTreeMap::new();
    if accepted {
        for (pos, pebble) in pebbles {
            world.set_block_state(*pos, *pebble);
            placed_pebbles.insert(*pos, *pebble);
        }
    }

    Commit {
        placed_ores,
        placed_pebbles,
        accepted,
    }
}

/// Find where a pebble dropped onto column `(x, z)` comes to rest.
///
/// Scans down from the surface scan start through replaceable blocks and logs,
/// steps back up one, and returns that position if `pebble` may sit there.
pub fn resolve_surface<W: WorldAccess + ?Sized>(
    world: &W,
    x: i32,
    z: i32,
    pebble: BlockState,
) -> Option<BlockPos> {
    let bounds = world.bounds();
    let logs = logs_tag();
    let mut pos = BlockPos::new(x, bounds.surface_scan_start, z);
    while pos.y > bounds.min_y {
        let state = world.block_state(pos);
        if !(world.is_replaceable(state) || world.state_has_tag(state, logs)) {
            break;
        }
        pos = pos.down();
    }
    let pos = pos.up();
    world.is_valid_placement(pebble, pos).then_some(pos)
}

/// Column under `point`, truncated toward zero (unlike ore positions, which floor).
fn pebble_column(point: Vec3) -> (i32, i32) {
    (point.x as i32, point.z as i32)
}

fn logs_tag() -> &'static RegistryKey {
    static TAG: OnceLock<RegistryKey> = OnceLock::new();
    TAG.get_or_init(|| tags::key(tags::LOGS))
}

/// Intrinsic X, then Y, then Z rotation.
fn rotation_xyz(angles: Vec3) -> Mat3 {
    Mat3::from_rotation_x(angles.x) * Mat3::from_rotation_y(angles.y) * Mat3::from_rotation_z(angles.z)
}

fn block_at(point: Vec3) -> BlockPos {
    let floored = point.floor();
    BlockPos::new(floored.x as i32, floored.y as i32, floored.z as i32)
}
