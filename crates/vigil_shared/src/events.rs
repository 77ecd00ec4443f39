//! Inbound event shapes.
//!
//! The host's event source adapter translates its own callbacks into these
//! and hands them to the engine in arrival order per actor.

use serde::{Deserialize, Serialize};

use crate::ids::{ActorId, Timestamp};
use crate::math::Vec3;
use crate::world::{ActorStatus, BlockPos, Material, Terrain};

/// Event type discriminator
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Actor joined the session
    Join = 0,
    /// Actor left the session
    Quit = 1,
    /// Actor was moved by the host
    Teleport = 2,
    /// Actor moved or turned
    PositionUpdate = 3,
    /// Actor hit another entity
    CombatHit = 4,
    /// Actor broke a block
    BlockBreak = 5,
    /// Actor placed a block
    BlockPlace = 6,
    /// Actor manipulated an inventory
    InventoryAction = 7,
    /// Actor finished consuming an item
    ItemConsume = 8,
    /// Actor swung or used an item
    Interact = 9,
    /// Actor took damage
    DamageTaken = 10,
}

/// Set of event kinds a detector wants to see.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EventMask(u16);

impl EventMask {
    /// No events.
    pub const EMPTY: Self = Self(0);

    /// Mask containing exactly the given kinds.
    #[must_use]
    pub const fn of(kinds: &[EventKind]) -> Self {
        let mut bits = 0u16;
        let mut i = 0;
        while i < kinds.len() {
            bits |= 1 << (kinds[i] as u8);
            i += 1;
        }
        Self(bits)
    }

    /// True if `kind` is in the set.
    #[must_use]
    pub const fn contains(self, kind: EventKind) -> bool {
        self.0 & (1 << (kind as u8)) != 0
    }
}

/// Why the host moved the actor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeleportCause {
    /// Command or plugin.
    #[default]
    Command,
    /// Ender pearl or similar item.
    Item,
    /// Portal travel.
    Portal,
    /// Rubber-banding after a rejected action.
    Correction,
    /// Anything else.
    Unknown,
}

/// A position update.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    /// Position before the move.
    pub from: Vec3,
    /// Position after the move.
    pub to: Vec3,
    /// Host considers the actor grounded.
    pub on_ground: bool,
    /// Mode, effects and look of the actor.
    pub status: ActorStatus,
    /// Surroundings at `to`.
    pub terrain: Terrain,
    /// Accumulated fall distance tracked by the host.
    pub fall_distance: f32,
    /// Current velocity in blocks per tick.
    pub velocity: Vec3,
}

impl Movement {
    /// False for rotation-only updates.
    #[must_use]
    pub fn has_displacement(&self) -> bool {
        self.from != self.to
    }
}

/// A block placement.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Placed block.
    pub block: BlockPos,
    /// Placed material.
    pub material: Material,
    /// Actor feet position at placement time.
    pub feet: Vec3,
    /// Actor eye position at placement time.
    pub eye: Vec3,
    /// Block directly above the placed one is solid.
    pub above_solid: bool,
    /// Mode, effects and look of the actor.
    pub status: ActorStatus,
}

/// A melee hit, seen from the attacker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatHit {
    /// Entity that was hit.
    pub victim: ActorId,
    /// Victim feet position.
    pub victim_position: Vec3,
    /// Damage dealt.
    pub damage: f32,
    /// Host flagged the hit as critical.
    pub is_critical: bool,
    /// Attacker eye position.
    pub attacker_eye: Vec3,
    /// Attacker grounded.
    pub attacker_on_ground: bool,
    /// Attacker accumulated fall distance.
    pub attacker_fall_distance: f32,
    /// Attacker surroundings.
    pub attacker_terrain: Terrain,
    /// Attacker mode, effects and look.
    pub status: ActorStatus,
}

/// Kind of inventory manipulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryActionKind {
    /// Dropped items out of the inventory.
    Drop {
        /// An inventory or container screen was open.
        screen_open: bool,
    },
    /// Moved items out of an open container.
    TakeFromContainer,
    /// Closed a container screen.
    CloseContainer,
    /// Any other click.
    Other,
}

/// Arm action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractAction {
    /// Left swing into the air.
    Swing,
    /// Right-click use of the held item.
    Use {
        /// Held item.
        item: Material,
    },
}

/// Source of damage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageCause {
    /// Landing from a fall.
    Fall,
    /// Hit by an entity.
    Entity,
    /// Below the bottom of the world.
    Void,
    /// Anything else.
    Other,
}

/// Event payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// Actor joined at a position.
    Join {
        /// Spawn position.
        position: Vec3,
    },
    /// Actor left.
    Quit,
    /// Host moved the actor.
    Teleport {
        /// Origin.
        from: Vec3,
        /// Destination.
        to: Vec3,
        /// Reason.
        cause: TeleportCause,
    },
    /// Actor moved or turned.
    PositionUpdate(Movement),
    /// Actor hit something.
    CombatHit(CombatHit),
    /// Actor broke a block.
    BlockBreak {
        /// Broken block.
        block: BlockPos,
        /// Its material.
        material: Material,
        /// Actor feet position.
        position: Vec3,
        /// Actor condition.
        status: ActorStatus,
    },
    /// Actor placed a block.
    BlockPlace(Placement),
    /// Actor manipulated an inventory.
    InventoryAction {
        /// What happened.
        kind: InventoryActionKind,
        /// Item count moved.
        items_affected: u32,
        /// Actor condition.
        status: ActorStatus,
    },
    /// Actor finished consuming an item.
    ItemConsume {
        /// Consumed item.
        item: Material,
        /// Actor condition.
        status: ActorStatus,
    },
    /// Actor swung or used an item.
    Interact {
        /// The action.
        action: InteractAction,
        /// Actor condition.
        status: ActorStatus,
    },
    /// Actor took damage.
    DamageTaken {
        /// Source.
        cause: DamageCause,
        /// Amount.
        amount: f32,
    },
}

/// An event about one actor at one instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Actor the event is about (the attacker for combat).
    pub actor: ActorId,
    /// Host clock reading.
    pub at: Timestamp,
    /// What happened.
    pub payload: EventPayload,
}

impl Event {
    /// Creates an event.
    #[must_use]
    pub const fn new(actor: ActorId, at: Timestamp, payload: EventPayload) -> Self {
        Self { actor, at, payload }
    }

    /// Returns the event type
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match &self.payload {
            EventPayload::Join { .. } => EventKind::Join,
            EventPayload::Quit => EventKind::Quit,
            EventPayload::Teleport { .. } => EventKind::Teleport,
            EventPayload::PositionUpdate(_) => EventKind::PositionUpdate,
            EventPayload::CombatHit(_) => EventKind::CombatHit,
            EventPayload::BlockBreak { .. } => EventKind::BlockBreak,
            EventPayload::BlockPlace(_) => EventKind::BlockPlace,
            EventPayload::InventoryAction { .. } => EventKind::InventoryAction,
            EventPayload::ItemConsume { .. } => EventKind::ItemConsume,
            EventPayload::Interact { .. } => EventKind::Interact,
            EventPayload::DamageTaken { .. } => EventKind::DamageTaken,
        }
    }

    /// Actor condition, for events that carry one.
    #[must_use]
    pub fn status(&self) -> Option<&ActorStatus> {
        match &self.payload {
            EventPayload::PositionUpdate(m) => Some(&m.status),
            EventPayload::CombatHit(h) => Some(&h.status),
            EventPayload::BlockPlace(p) => Some(&p.status),
            EventPayload::BlockBreak { status, .. }
            | EventPayload::InventoryAction { status, .. }
            | EventPayload::ItemConsume { status, .. }
            | EventPayload::Interact { status, .. } => Some(status),
            EventPayload::Join { .. }
            | EventPayload::Quit
            | EventPayload::Teleport { .. }
            | EventPayload::DamageTaken { .. } => None,
        }
    }

    /// False when a coordinate, angle or amount is NaN or infinite.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let look_ok = self.status().map_or(true, |s| s.look.is_finite());
        look_ok
            && match &self.payload {
                EventPayload::Join { position } => position.is_finite(),
                EventPayload::Teleport { from, to, .. } => from.is_finite() && to.is_finite(),
                EventPayload::PositionUpdate(m) => {
                    m.from.is_finite()
                        && m.to.is_finite()
                        && m.velocity.is_finite()
                        && m.fall_distance.is_finite()
                }
                EventPayload::CombatHit(h) => {
                    h.victim_position.is_finite()
                        && h.attacker_eye.is_finite()
                        && h.damage.is_finite()
                        && h.attacker_fall_distance.is_finite()
                }
                EventPayload::BlockPlace(p) => p.feet.is_finite() && p.eye.is_finite(),
                EventPayload::BlockBreak { position, .. } => position.is_finite(),
                EventPayload::DamageTaken { amount, .. } => amount.is_finite(),
                EventPayload::Quit
                | EventPayload::InventoryAction { .. }
                | EventPayload::ItemConsume { .. }
                | EventPayload::Interact { .. } => true,
            }
    }
}
