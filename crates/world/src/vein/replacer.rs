//! Replacement rules: which existing block an ore may overwrite, and with what.

use std::sync::Arc;

use terra_core::RegistryKey;

use crate::access::WorldAccess;
use crate::blocks::tags;
use crate::chunk::BlockState;

/// A match predicate paired with the state written when it matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Replacer {
    /// Matches any block carrying `tag`.
    Tag { tag: RegistryKey, place: BlockState },
    /// Matches blocks equal to `target` (equality as defined by the host).
    State { target: BlockState, place: BlockState },
}

/// Ordered replacer list shared by every candidate a stage produces.
pub type ReplacerList = Arc<[Replacer]>;

impl Replacer {
    pub fn tag(tag: RegistryKey, place: BlockState) -> Self {
        Self::Tag { tag, place }
    }

    pub fn state(target: BlockState, place: BlockState) -> Self {
        Self::State { target, place }
    }

    /// Replace stone-class blocks and gravel.
    pub fn ore(place: BlockState) -> Self {
        Self::Tag {
            tag: tags::key(tags::ORE_REPLACEABLES),
            place,
        }
    }

    /// State written when this rule matches.
    pub fn place(&self) -> BlockState {
        match self {
            Self::Tag { place, .. } | Self::State { place, .. } => *place,
        }
    }

    /// Persisted discriminant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tag { .. } => "tag",
            Self::State { .. } => "state",
        }
    }

    pub fn matches<W: WorldAccess + ?Sized>(&self, world: &W, existing: BlockState) -> bool {
        match self {
            Self::Tag { tag, .. } => world.state_has_tag(existing, tag),
            Self::State { target, .. } => world.states_match(existing, *target),
        }
    }
}

/// First rule in `replacers` matching `existing`, if any.
pub fn first_match<'a, W: WorldAccess + ?Sized>(
    replacers: &'a [Replacer],
    world: &W,
    existing: BlockState,
) -> Option<&'a Replacer> {
    replacers.iter().find(|replacer| replacer.matches(world, existing))
}
