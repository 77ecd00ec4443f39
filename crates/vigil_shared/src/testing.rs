//! Fluent event builders for tests.
//!
//! Available to this crate's tests and to downstream crates that enable the
//! `testing` feature.

use crate::events::{
    CombatHit, DamageCause, Event, EventPayload, InteractAction, InventoryActionKind, Movement,
    Placement, TeleportCause,
};
use crate::ids::{ActorId, Timestamp};
use crate::math::{Look, Vec3};
use crate::world::{
    ActorStatus, BlockPos, GameMode, Material, MovementMode, StatusEffect, Surface, Terrain,
};

/// Shorthand for a millisecond timestamp.
#[must_use]
pub const fn ms(value: u64) -> Timestamp {
    Timestamp::from_millis(value)
}

/// Look along +X, the direction the builders move and hit in.
pub const FACING_EAST: Look = Look::new(-90.0, 0.0);

/// Builder for a `PositionUpdate`.
#[derive(Clone, Debug)]
pub struct MoveBuilder {
    actor: ActorId,
    at: Timestamp,
    movement: Movement,
}

impl MoveBuilder {
    /// Grounded walk from the origin to the origin, facing +X.
    #[must_use]
    pub fn new(actor: ActorId, at: Timestamp) -> Self {
        Self {
            actor,
            at,
            movement: Movement {
                on_ground: true,
                status: ActorStatus {
                    look: FACING_EAST,
                    ..ActorStatus::default()
                },
                ..Movement::default()
            },
        }
    }

    /// Sets both endpoints.
    #[must_use]
    pub fn between(mut self, from: Vec3, to: Vec3) -> Self {
        self.movement.from = from;
        self.movement.to = to;
        self
    }

    /// Moves `distance` blocks along +X starting at `from`.
    #[must_use]
    pub fn step_x(self, from: Vec3, distance: f64) -> Self {
        self.between(from, from + Vec3::new(distance, 0.0, 0.0))
    }

    /// Sets grounded flag.
    #[must_use]
    pub fn on_ground(mut self, on_ground: bool) -> Self {
        self.movement.on_ground = on_ground;
        self
    }

    /// Sets the movement mode.
    #[must_use]
    pub fn mode(mut self, mode: MovementMode) -> Self {
        self.movement.status.movement = mode;
        self
    }

    /// Sprinting.
    #[must_use]
    pub fn sprinting(self) -> Self {
        self.mode(MovementMode::Sprinting)
    }

    /// Sets the game mode.
    #[must_use]
    pub fn game_mode(mut self, mode: GameMode) -> Self {
        self.movement.status.game_mode = mode;
        self
    }

    /// Grants flight.
    #[must_use]
    pub fn allow_flight(mut self) -> Self {
        self.movement.status.allow_flight = true;
        self
    }

    /// Adds a status effect.
    #[must_use]
    pub fn effect(mut self, effect: StatusEffect) -> Self {
        self.movement.status.effects.push(effect);
        self
    }

    /// Sets the surface below the feet.
    #[must_use]
    pub fn below(mut self, surface: Surface) -> Self {
        self.movement.terrain.below = surface;
        self
    }

    /// Sets the full terrain record.
    #[must_use]
    pub fn terrain(mut self, terrain: Terrain) -> Self {
        self.movement.terrain = terrain;
        self
    }

    /// Sets fall distance.
    #[must_use]
    pub fn fall_distance(mut self, fall_distance: f32) -> Self {
        self.movement.fall_distance = fall_distance;
        self
    }

    /// Sets velocity.
    #[must_use]
    pub fn velocity(mut self, velocity: Vec3) -> Self {
        self.movement.velocity = velocity;
        self
    }

    /// Sets look.
    #[must_use]
    pub fn look(mut self, look: Look) -> Self {
        self.movement.status.look = look;
        self
    }

    /// Finishes the event.
    #[must_use]
    pub fn build(self) -> Event {
        Event::new(self.actor, self.at, EventPayload::PositionUpdate(self.movement))
    }
}

/// Builder for a `BlockPlace`.
#[derive(Clone, Debug)]
pub struct PlaceBuilder {
    actor: ActorId,
    at: Timestamp,
    placement: Placement,
}

impl PlaceBuilder {
    /// A bridging placement: actor stands at y=65 and places the block
    /// directly under their feet, nothing above it.
    #[must_use]
    pub fn new(actor: ActorId, at: Timestamp) -> Self {
        let feet = Vec3::new(0.5, 65.0, 0.5);
        Self {
            actor,
            at,
            placement: Placement {
                block: BlockPos::new(0, 64, 0),
                material: Material::new("cobblestone"),
                feet,
                eye: feet + Vec3::new(0.0, crate::constants::EYE_HEIGHT, 0.0),
                above_solid: false,
                status: ActorStatus::default(),
            },
        }
    }

    /// Sets the placed block.
    #[must_use]
    pub fn block(mut self, block: BlockPos) -> Self {
        self.placement.block = block;
        self
    }

    /// Sets the actor feet position; eye follows at standing height.
    #[must_use]
    pub fn feet(mut self, feet: Vec3) -> Self {
        self.placement.feet = feet;
        self.placement.eye = feet + Vec3::new(0.0, crate::constants::EYE_HEIGHT, 0.0);
        self
    }

    /// Sets look.
    #[must_use]
    pub fn look(mut self, look: Look) -> Self {
        self.placement.status.look = look;
        self
    }

    /// Sprinting.
    #[must_use]
    pub fn sprinting(mut self) -> Self {
        self.placement.status.movement = MovementMode::Sprinting;
        self
    }

    /// Sets the game mode.
    #[must_use]
    pub fn game_mode(mut self, mode: GameMode) -> Self {
        self.placement.status.game_mode = mode;
        self
    }

    /// Marks the space above the block as solid.
    #[must_use]
    pub fn above_solid(mut self) -> Self {
        self.placement.above_solid = true;
        self
    }

    /// Finishes the event.
    #[must_use]
    pub fn build(self) -> Event {
        Event::new(self.actor, self.at, EventPayload::BlockPlace(self.placement))
    }
}

/// Builder for a `CombatHit`.
#[derive(Clone, Debug)]
pub struct HitBuilder {
    actor: ActorId,
    at: Timestamp,
    hit: CombatHit,
}

impl HitBuilder {
    /// A plain grounded hit on a victim two blocks away along +X, facing it.
    #[must_use]
    pub fn new(attacker: ActorId, victim: ActorId, at: Timestamp) -> Self {
        Self {
            actor: attacker,
            at,
            hit: CombatHit {
                victim,
                victim_position: Vec3::new(2.0, 64.0, 0.0),
                damage: 1.0,
                is_critical: false,
                attacker_eye: Vec3::new(0.0, 64.0 + crate::constants::EYE_HEIGHT, 0.0),
                attacker_on_ground: true,
                attacker_fall_distance: 0.0,
                attacker_terrain: Terrain::default(),
                status: ActorStatus {
                    look: FACING_EAST,
                    ..ActorStatus::default()
                },
            },
        }
    }

    /// Sets the victim position.
    #[must_use]
    pub fn victim_at(mut self, position: Vec3) -> Self {
        self.hit.victim_position = position;
        self
    }

    /// Marks the hit critical with the given attacker fall state.
    #[must_use]
    pub fn critical(mut self, on_ground: bool, fall_distance: f32) -> Self {
        self.hit.is_critical = true;
        self.hit.attacker_on_ground = on_ground;
        self.hit.attacker_fall_distance = fall_distance;
        self
    }

    /// Sets the attacker terrain.
    #[must_use]
    pub fn terrain(mut self, terrain: Terrain) -> Self {
        self.hit.attacker_terrain = terrain;
        self
    }

    /// Sets the attacker game mode.
    #[must_use]
    pub fn game_mode(mut self, mode: GameMode) -> Self {
        self.hit.status.game_mode = mode;
        self
    }

    /// Sets the attacker look.
    #[must_use]
    pub fn look(mut self, look: Look) -> Self {
        self.hit.status.look = look;
        self
    }

    /// Finishes the event.
    #[must_use]
    pub fn build(self) -> Event {
        Event::new(self.actor, self.at, EventPayload::CombatHit(self.hit))
    }
}

/// Join at the origin.
#[must_use]
pub fn join(actor: ActorId, at: Timestamp) -> Event {
    Event::new(actor, at, EventPayload::Join { position: Vec3::ZERO })
}

/// Quit.
#[must_use]
pub fn quit(actor: ActorId, at: Timestamp) -> Event {
    Event::new(actor, at, EventPayload::Quit)
}

/// Command teleport.
#[must_use]
pub fn teleport(actor: ActorId, at: Timestamp, to: Vec3) -> Event {
    Event::new(
        actor,
        at,
        EventPayload::Teleport {
            from: Vec3::ZERO,
            to,
            cause: TeleportCause::Command,
        },
    )
}

/// Break of `material` under the feet of a survival actor.
#[must_use]
pub fn block_break(actor: ActorId, at: Timestamp, material: &str) -> Event {
    block_break_at(actor, at, BlockPos::new(0, 64, 0), material)
}

/// Break of `material` at `block` by a survival actor standing at (0.5, 65, 0.5).
#[must_use]
pub fn block_break_at(actor: ActorId, at: Timestamp, block: BlockPos, material: &str) -> Event {
    Event::new(
        actor,
        at,
        EventPayload::BlockBreak {
            block,
            material: Material::new(material),
            position: Vec3::new(0.5, 65.0, 0.5),
            status: ActorStatus::default(),
        },
    )
}

/// Inventory action by a survival actor.
#[must_use]
pub fn inventory(actor: ActorId, at: Timestamp, kind: InventoryActionKind, items: u32) -> Event {
    Event::new(
        actor,
        at,
        EventPayload::InventoryAction {
            kind,
            items_affected: items,
            status: ActorStatus::default(),
        },
    )
}

/// Consumption of `item`.
#[must_use]
pub fn consume(actor: ActorId, at: Timestamp, item: &str) -> Event {
    Event::new(
        actor,
        at,
        EventPayload::ItemConsume {
            item: Material::new(item),
            status: ActorStatus::default(),
        },
    )
}

/// Left swing.
#[must_use]
pub fn swing(actor: ActorId, at: Timestamp) -> Event {
    Event::new(
        actor,
        at,
        EventPayload::Interact {
            action: InteractAction::Swing,
            status: ActorStatus::default(),
        },
    )
}

/// Right-click use of `item`.
#[must_use]
pub fn use_item(actor: ActorId, at: Timestamp, item: &str) -> Event {
    Event::new(
        actor,
        at,
        EventPayload::Interact {
            action: InteractAction::Use {
                item: Material::new(item),
            },
            status: ActorStatus::default(),
        },
    )
}

/// Damage taken.
#[must_use]
pub fn damage(actor: ActorId, at: Timestamp, cause: DamageCause, amount: f32) -> Event {
    Event::new(actor, at, EventPayload::DamageTaken { cause, amount })
}
