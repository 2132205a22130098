//! The per-tick NPC decision controller.
//!
//! Orchestrates the full decision loop each engine tick:
//! 1. Gate: decide whether this tick warrants a decision at all
//! 2. Fast-path: continue an autonomous movement sequence without the LLM
//! 3. Build the observation of the world around the NPC
//! 4. Call the LLM client (with retry and timeout)
//! 5. Parse the reply into a validated action
//! 6. Execute the action against the engine
//! 7. Store the outcome as `last_result` for the next prompt
//!
//! Error handling never reaches the host: LLM-side failures become
//! `invalid`/`parse_error`/`request_failed` outcomes, three in a row halt
//! new LLM calls for a two-second backoff, and engine refusals
//! (`cooldown`, `blocked:*`, `no_path`) are ordinary feedback the model is
//! expected to react to.

use std::time::Instant;

use chrono::{DateTime, Utc};
use hamlet_nav::{HierarchicalNavigator, PathQuery, WAYPOINT_TOLERANCE, next_waypoint};
use hamlet_types::{
    Action, ActionOutcome, BlockReason, CooldownSnapshot, Direction, TILE_SIZE, WorldRect,
    distance_between, tile_center,
};
use hamlet_world::{Character, ItemCatalog, WorldEntity, WorldView, build_observation};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dialogue::DialogueHistory;
use crate::llm::LlmClient;
use crate::parse::parse_action;

/// Milliseconds between autonomous movement continuation steps.
const MOVEMENT_CONTINUATION_INTERVAL_MS: u64 = 200;

/// Movement cooldown applied after a successful step.
const MOVE_COOLDOWN_MS: u64 = 200;

/// Interaction cooldown.
const INTERACT_COOLDOWN_MS: u64 = 1000;

/// Maximum reach for `interact` and `transfer_item`, in pixels.
const INTERACTION_RANGE_PX: f64 = 64.0;

/// Distance at which a `move_to` target counts as reached (half a tile).
const ARRIVAL_TOLERANCE_PX: f64 = 16.0;

/// Base interval between decisions; the idle gate fires at eight times
/// this.
const DEFAULT_DECISION_INTERVAL_MS: u64 = 4000;

/// Player proximity that allows idle decisions (about six tiles).
const PLAYER_NEARBY_RANGE_PX: f64 = 200.0;

/// LLM-side failures in a row before the controller backs off.
const MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// How long the controller halts new LLM calls after repeated failures.
const ERROR_BACKOFF_MS: u64 = 2000;

/// Hard cap on a `move_to` step budget.
const MOVE_TO_STEP_CAP: u32 = 200;

/// Raw LLM responses are truncated to this length in decision records.
const MAX_RAW_RESPONSE_LEN: usize = 4000;

// ---------------------------------------------------------------------------
// Host-facing input
// ---------------------------------------------------------------------------

/// The slice of engine state handed to the controller each tick.
#[derive(Debug)]
pub struct EngineTick<'a> {
    /// Wall-clock time in milliseconds (host-supplied, monotonic).
    pub current_time_ms: u64,
    /// Current engine tick number.
    pub tick: u64,
    /// True exactly on the tick the player's utterance was freshly heard.
    pub player_spoke: bool,
    /// Wall rectangles, read-only.
    pub walls: &'a [WorldRect],
    /// Interactive entities, read-only.
    pub entities: &'a [WorldEntity],
    /// Every other character on the map beyond this NPC and the player
    /// (fellow NPCs, companions). They block movement and are valid
    /// `transfer_item` targets, which is why the slice is mutable.
    pub characters: &'a mut [Character],
}

// ---------------------------------------------------------------------------
// Decision records
// ---------------------------------------------------------------------------

/// Where a decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DecisionSource {
    /// The LLM chose the action.
    Llm,
    /// An autonomous movement continuation, no LLM involved.
    Continuation,
}

impl DecisionSource {
    /// Name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Continuation => "continuation",
        }
    }
}

/// Debug record of the most recent decision, retained for the host.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRecord {
    /// Where the decision came from.
    pub source: DecisionSource,
    /// Wire name of the executed action, when one parsed.
    pub action: Option<String>,
    /// String form of the outcome.
    pub outcome: String,
    /// The raw LLM reply, truncated.
    pub raw_response: Option<String>,
    /// Wall-clock latency of the LLM call.
    pub latency_ms: Option<u64>,
    /// When the decision completed.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Movement state
// ---------------------------------------------------------------------------

/// An in-progress autonomous movement sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveMovement {
    /// No movement in progress.
    None,
    /// Walking a fixed number of steps in one direction.
    MoveDir {
        /// The direction being walked.
        direction: Direction,
        /// Steps left after the current one.
        steps_remaining: u32,
    },
    /// Walking toward a world-space target, waypoint by waypoint.
    MoveTo {
        /// Final world-space target.
        target: (f64, f64),
        /// Step budget left; the sequence ends when it runs out.
        steps_remaining: u32,
        /// Navigator waypoints, empty when walking a straight line.
        waypoints: Vec<(f64, f64)>,
    },
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Drives one NPC: owns its dialogue memory, cooldowns, movement
/// sequencing, error backoff, and the LLM client.
pub struct NpcController {
    llm: LlmClient,
    navigator: Option<HierarchicalNavigator>,
    catalog: ItemCatalog,
    goals: Vec<String>,
    memory: String,
    dialogue: DialogueHistory,
    cooldowns: CooldownSnapshot,
    last_result: Option<ActionOutcome>,
    consecutive_errors: u32,
    last_decision_time_ms: u64,
    decision_interval_ms: u64,
    idle_behavior_enabled: bool,
    movement: ActiveMovement,
    last_decision: Option<DecisionRecord>,
}

impl NpcController {
    /// Create a controller for one NPC.
    pub fn new(llm: LlmClient, catalog: ItemCatalog) -> Self {
        Self {
            llm,
            navigator: None,
            catalog,
            goals: vec!["greet player".to_owned()],
            memory: String::new(),
            dialogue: DialogueHistory::new(),
            cooldowns: CooldownSnapshot::default(),
            last_result: None,
            consecutive_errors: 0,
            last_decision_time_ms: 0,
            decision_interval_ms: DEFAULT_DECISION_INTERVAL_MS,
            idle_behavior_enabled: false,
            movement: ActiveMovement::None,
            last_decision: None,
        }
    }

    // -------------------------------------------------------------------
    // Host hooks
    // -------------------------------------------------------------------

    /// Replace the NPC's goal list.
    pub fn set_goals(&mut self, goals: Vec<String>) {
        self.goals = goals;
    }

    /// Current goals.
    pub fn goals(&self) -> &[String] {
        &self.goals
    }

    /// Append a line of host-supplied context, keeping the last five
    /// lines.
    pub fn add_memory(&mut self, text: &str) {
        if !self.memory.is_empty() {
            self.memory.push('\n');
        }
        self.memory.push_str(text);

        let lines: Vec<&str> = self.memory.lines().collect();
        if lines.len() > 5 {
            let keep = lines.len().saturating_sub(5);
            self.memory = lines
                .get(keep..)
                .unwrap_or_default()
                .join("\n");
        }
    }

    /// Enable or disable idle decisions (acting without being spoken to).
    pub fn enable_idle_behavior(&mut self, enabled: bool) {
        self.idle_behavior_enabled = enabled;
        if enabled {
            info!("idle behavior enabled");
        } else {
            info!("idle behavior disabled, NPC only responds when spoken to");
        }
    }

    /// Whether idle decisions are enabled.
    pub const fn idle_behavior_enabled(&self) -> bool {
        self.idle_behavior_enabled
    }

    /// Build the hierarchical navigator from the world's walls.
    pub fn initialize_navigation(&mut self, grid_width: i32, grid_height: i32, walls: &[WorldRect]) {
        self.navigator = Some(HierarchicalNavigator::from_walls(
            grid_width,
            grid_height,
            walls,
        ));
    }

    /// Open or close a door portal; no-op without a navigator.
    pub fn set_portal_open(&mut self, portal_id: &str, open: bool) {
        if let Some(navigator) = &mut self.navigator {
            navigator.set_portal_open(portal_id, open);
        }
    }

    /// The navigator, once initialized.
    pub const fn navigator(&self) -> Option<&HierarchicalNavigator> {
        self.navigator.as_ref()
    }

    /// Verify the LLM endpoint answers in the configured wire mode.
    pub async fn test_connection(&self) -> bool {
        self.llm.test_connection().await
    }

    // -------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------

    /// Outcome of the most recent decision.
    pub const fn last_result(&self) -> Option<&ActionOutcome> {
        self.last_result.as_ref()
    }

    /// Consecutive LLM-side failures so far.
    pub const fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Remaining cooldowns.
    pub const fn cooldowns(&self) -> CooldownSnapshot {
        self.cooldowns
    }

    /// The in-progress movement sequence.
    pub const fn active_movement(&self) -> &ActiveMovement {
        &self.movement
    }

    /// Whether a movement sequence is currently running.
    pub const fn is_moving_autonomously(&self) -> bool {
        !matches!(self.movement, ActiveMovement::None)
    }

    /// Debug record of the most recent decision.
    pub const fn last_decision(&self) -> Option<&DecisionRecord> {
        self.last_decision.as_ref()
    }

    /// The dialogue history.
    pub const fn dialogue(&self) -> &DialogueHistory {
        &self.dialogue
    }

    // -------------------------------------------------------------------
    // Tick entry
    // -------------------------------------------------------------------

    /// Run one decision tick. Returns `None` when no decision was due.
    ///
    /// At most one action executes per call. The player's fresh utterance
    /// (if any) is consumed here, exposed to the LLM exactly once, and
    /// appended to the dialogue history before the prompt is built.
    /// Characters in `tick.characters` block movement and can receive
    /// items; the NPC itself must not appear in that slice.
    pub async fn npc_decision_tick(
        &mut self,
        npc: &mut Character,
        player: &mut Character,
        tick: &mut EngineTick<'_>,
    ) -> Option<ActionOutcome> {
        let now = tick.current_time_ms;

        let player_nearby = {
            let (nx, ny) = npc.center();
            let (px, py) = player.center();
            distance_between(nx, ny, px, py) < PLAYER_NEARBY_RANGE_PX
        };

        if !self.should_decide(now, tick.player_spoke, player_nearby) {
            return None;
        }

        // Error backoff: after repeated LLM failures, go quiet until the
        // backoff elapses, then start fresh.
        if self.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
            if now.saturating_sub(self.last_decision_time_ms) < ERROR_BACKOFF_MS {
                return None;
            }
            self.consecutive_errors = 0;
        }

        let elapsed = if self.last_decision_time_ms > 0 {
            now.saturating_sub(self.last_decision_time_ms)
        } else {
            0
        };
        self.cooldowns.movement = self.cooldowns.movement.saturating_sub(elapsed);
        self.cooldowns.interact = self.cooldowns.interact.saturating_sub(elapsed);

        let blockers = collision_boxes(player, &*tick.characters);

        // Movement continuation: no LLM consultation between steps.
        if self.is_moving_autonomously() {
            let outcome = self.continue_movement(npc, tick.walls, &blockers);
            self.finish_decision(now, &outcome, DecisionSource::Continuation, None, None, None);
            return Some(outcome);
        }

        // Full LLM pipeline.
        let heard = player.take_last_said();
        if let Some(text) = heard.as_deref() {
            self.dialogue.push("Player", text);
        }

        let last_result = self.last_result.as_ref().map(ToString::to_string);
        let view = WorldView {
            walls: tick.walls,
            entities: tick.entities,
            tick: tick.tick,
            goals: &self.goals,
            cooldowns: self.cooldowns,
            last_result: last_result.as_deref(),
            catalog: &self.catalog,
        };
        let observation = build_observation(npc, player, heard.as_deref(), &view);

        let memory = self.memory_block();
        let started = Instant::now();
        let raw = match self.llm.decide(&observation, memory.as_deref()).await {
            Ok(raw) => raw,
            Err(error) => {
                let outcome = ActionOutcome::RequestFailed(error.to_string());
                self.finish_decision(now, &outcome, DecisionSource::Llm, None, None, None);
                return Some(outcome);
            }
        };
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let action = match parse_action(&raw) {
            Ok(action) => action,
            Err(error) => {
                let outcome = error.into_outcome();
                self.finish_decision(
                    now,
                    &outcome,
                    DecisionSource::Llm,
                    None,
                    Some(&raw),
                    Some(latency_ms),
                );
                return Some(outcome);
            }
        };

        let outcome = self.execute(&action, npc, player, tick, &blockers);

        // The NPC's own spoken line joins the dialogue after execution.
        if matches!(outcome, ActionOutcome::Ok)
            && let Some(text) = action.spoken_text()
        {
            self.dialogue.push(npc.name.clone(), text);
        }

        self.finish_decision(
            now,
            &outcome,
            DecisionSource::Llm,
            Some(action.name()),
            Some(&raw),
            Some(latency_ms),
        );
        Some(outcome)
    }

    /// Whether this tick warrants a decision.
    fn should_decide(&self, now: u64, player_spoke: bool, player_nearby: bool) -> bool {
        if player_spoke {
            return true;
        }
        if self.is_moving_autonomously() {
            return now.saturating_sub(self.last_decision_time_ms)
                >= MOVEMENT_CONTINUATION_INTERVAL_MS;
        }
        if !self.idle_behavior_enabled {
            return false;
        }
        if player_nearby {
            return now.saturating_sub(self.last_decision_time_ms)
                >= self.decision_interval_ms.saturating_mul(8);
        }
        false
    }

    // -------------------------------------------------------------------
    // Movement continuation
    // -------------------------------------------------------------------

    /// Advance the active movement sequence by one step.
    fn continue_movement(
        &mut self,
        npc: &mut Character,
        walls: &[WorldRect],
        blockers: &[WorldRect],
    ) -> ActionOutcome {
        let movement = std::mem::replace(&mut self.movement, ActiveMovement::None);
        match movement {
            ActiveMovement::None => ActionOutcome::Ok,
            ActiveMovement::MoveDir {
                direction,
                steps_remaining,
            } => {
                if self.cooldowns.movement > 0 {
                    self.movement = ActiveMovement::MoveDir {
                        direction,
                        steps_remaining,
                    };
                    return ActionOutcome::Cooldown;
                }

                let (dx, dy) = direction.delta(npc.speed);
                let moved = npc.step(f64::from(dx), f64::from(dy), walls, blockers);
                if moved {
                    self.cooldowns.movement = MOVE_COOLDOWN_MS;
                    let remaining = steps_remaining.saturating_sub(1);
                    if remaining > 0 {
                        self.movement = ActiveMovement::MoveDir {
                            direction,
                            steps_remaining: remaining,
                        };
                    } else {
                        debug!("movement sequence completed");
                    }
                    ActionOutcome::Ok
                } else {
                    // Blocked mid-sequence: abort the whole sequence.
                    ActionOutcome::Blocked(BlockReason::Wall)
                }
            }
            ActiveMovement::MoveTo {
                target,
                steps_remaining,
                waypoints,
            } => self.step_toward(npc, walls, blockers, target, steps_remaining, waypoints),
        }
    }

    /// Take one pathfollowing step toward the target. On success the
    /// movement state is re-armed with the decremented budget; any other
    /// outcome leaves it cleared.
    fn step_toward(
        &mut self,
        npc: &mut Character,
        walls: &[WorldRect],
        blockers: &[WorldRect],
        target: (f64, f64),
        steps_remaining: u32,
        waypoints: Vec<(f64, f64)>,
    ) -> ActionOutcome {
        let (cx, cy) = npc.center();
        if distance_between(cx, cy, target.0, target.1) < ARRIVAL_TOLERANCE_PX {
            debug!(x = target.0, y = target.1, "move_to target reached");
            return ActionOutcome::Ok;
        }

        let step_target = if waypoints.is_empty() {
            target
        } else {
            next_waypoint(cx, cy, &waypoints, WAYPOINT_TOLERANCE).unwrap_or(target)
        };

        let span = distance_between(cx, cy, step_target.0, step_target.1);
        if span <= f64::EPSILON {
            return ActionOutcome::Ok;
        }

        let speed = f64::from(npc.speed);
        let dx = (step_target.0 - cx) / span * speed;
        let dy = (step_target.1 - cy) / span * speed;
        let moved = npc.step(dx, dy, walls, blockers);

        if moved {
            let remaining = steps_remaining.saturating_sub(1);
            if remaining > 0 {
                self.movement = ActiveMovement::MoveTo {
                    target,
                    steps_remaining: remaining,
                    waypoints,
                };
            } else {
                debug!("move_to step budget exhausted");
            }
            ActionOutcome::Ok
        } else {
            ActionOutcome::Blocked(BlockReason::Obstacle)
        }
    }

    // -------------------------------------------------------------------
    // Action execution
    // -------------------------------------------------------------------

    /// Execute a validated action. Exactly one engine mutation happens
    /// per call.
    fn execute(
        &mut self,
        action: &Action,
        npc: &mut Character,
        player: &mut Character,
        tick: &mut EngineTick<'_>,
        blockers: &[WorldRect],
    ) -> ActionOutcome {
        match action {
            Action::Say { text } => {
                npc.say(text.clone());
                ActionOutcome::Ok
            }
            Action::Move {
                direction,
                distance,
            } => self.execute_move_dir(npc, tick.walls, blockers, *direction, *distance),
            Action::MoveTo { x, y } => self.execute_move_to(npc, tick.walls, blockers, *x, *y),
            Action::Interact { entity_id } => self.execute_interact(npc, tick.entities, entity_id),
            Action::TransferItem { entity_id, item_id } => {
                self.execute_transfer(npc, player, tick.characters, entity_id, item_id)
            }
        }
    }

    fn execute_move_dir(
        &mut self,
        npc: &mut Character,
        walls: &[WorldRect],
        blockers: &[WorldRect],
        direction: Direction,
        distance_tiles: f64,
    ) -> ActionOutcome {
        if self.cooldowns.movement > 0 {
            return ActionOutcome::Cooldown;
        }

        let (dx, dy) = direction.delta(npc.speed);
        let moved = npc.step(f64::from(dx), f64::from(dy), walls, blockers);
        if moved {
            self.cooldowns.movement = MOVE_COOLDOWN_MS;
            let total = steps_for_distance(distance_tiles, npc.speed);
            let remaining = total.saturating_sub(1);
            if remaining > 0 {
                self.movement = ActiveMovement::MoveDir {
                    direction,
                    steps_remaining: remaining,
                };
                debug!(
                    direction = direction.as_letter(),
                    steps = total,
                    "movement sequence started"
                );
            }
            ActionOutcome::Ok
        } else {
            ActionOutcome::Blocked(BlockReason::Wall)
        }
    }

    fn execute_move_to(
        &mut self,
        npc: &mut Character,
        walls: &[WorldRect],
        blockers: &[WorldRect],
        tile_x: i32,
        tile_y: i32,
    ) -> ActionOutcome {
        if self.cooldowns.movement > 0 {
            return ActionOutcome::Cooldown;
        }

        let target = tile_center(tile_x, tile_y);
        let (cx, cy) = npc.center();
        let span = distance_between(cx, cy, target.0, target.1);
        if span < ARRIVAL_TOLERANCE_PX {
            return ActionOutcome::Ok;
        }

        let mut waypoints = Vec::new();
        if let Some(navigator) = &self.navigator {
            let response = navigator.find_path(&PathQuery::new(cx, cy, target.0, target.1));
            if response.ok {
                waypoints = response.waypoints;
            } else {
                debug!(
                    reason = response.reason.as_str(),
                    x = tile_x,
                    y = tile_y,
                    "move_to planning failed"
                );
                return ActionOutcome::NoPath;
            }
        }

        let budget = plan_step_budget(span, npc.speed);
        let outcome = self.step_toward(npc, walls, blockers, target, budget, waypoints);
        if matches!(outcome, ActionOutcome::Ok) {
            self.cooldowns.movement = MOVE_COOLDOWN_MS;
        }
        outcome
    }

    fn execute_interact(
        &mut self,
        npc: &Character,
        entities: &[WorldEntity],
        entity_id: &str,
    ) -> ActionOutcome {
        if self.cooldowns.interact > 0 {
            return ActionOutcome::Cooldown;
        }

        let Some(entity) = entities.iter().find(|entity| entity.id == entity_id) else {
            return ActionOutcome::Invalid("Entity not found".to_owned());
        };

        let (cx, cy) = npc.center();
        let span = distance_between(cx, cy, f64::from(entity.x), f64::from(entity.y));
        if span > INTERACTION_RANGE_PX {
            return ActionOutcome::Blocked(BlockReason::TooFar);
        }

        self.cooldowns.interact = INTERACT_COOLDOWN_MS;
        // Entity-specific behavior is the host's job; the core
        // acknowledges and applies the cooldown.
        debug!(entity = %entity.id, kind = %entity.kind, "interaction acknowledged");
        ActionOutcome::Ok
    }

    fn execute_transfer(
        &mut self,
        npc: &mut Character,
        player: &mut Character,
        characters: &mut [Character],
        entity_id: &str,
        item_id: &str,
    ) -> ActionOutcome {
        // The player answers to both its name and the id the observation
        // advertises; everyone else is matched by name.
        let target = if entity_id == "player" || entity_id == player.name {
            Some(&mut *player)
        } else {
            characters
                .iter_mut()
                .find(|character| character.name == entity_id)
        };
        let Some(target) = target else {
            return ActionOutcome::Invalid("Character not found".to_owned());
        };

        let (nx, ny) = npc.center();
        let (tx, ty) = target.center();
        if distance_between(nx, ny, tx, ty) > INTERACTION_RANGE_PX {
            return ActionOutcome::Blocked(BlockReason::TooFar);
        }

        if !npc.has_item(item_id) {
            return ActionOutcome::Invalid("Item not in inventory".to_owned());
        }
        if npc.remove_item(item_id, 1).is_err() {
            return ActionOutcome::Invalid("Item not in inventory".to_owned());
        }

        match target.add_item(item_id, 1) {
            Ok(()) => ActionOutcome::Ok,
            Err(_) => {
                // Receiver is full: put the item back.
                if npc.add_item(item_id, 1).is_err() {
                    warn!(item = %item_id, "transfer rollback failed");
                }
                ActionOutcome::Blocked(BlockReason::InventoryFull)
            }
        }
    }

    // -------------------------------------------------------------------
    // Bookkeeping
    // -------------------------------------------------------------------

    /// The memory slot of the prompt: the dialogue block plus any
    /// host-supplied notes.
    fn memory_block(&self) -> Option<String> {
        let dialogue = self.dialogue.render();
        if self.memory.is_empty() {
            return dialogue;
        }
        match dialogue {
            Some(block) => Some(format!("{block}\n{}", self.memory)),
            None => Some(self.memory.clone()),
        }
    }

    /// Record the outcome, advance error accounting, and stamp the
    /// decision time.
    fn finish_decision(
        &mut self,
        now: u64,
        outcome: &ActionOutcome,
        source: DecisionSource,
        action: Option<&str>,
        raw_response: Option<&str>,
        latency_ms: Option<u64>,
    ) {
        if outcome.counts_as_error() {
            self.consecutive_errors = self
                .consecutive_errors
                .saturating_add(1)
                .min(MAX_CONSECUTIVE_ERRORS);
        } else {
            self.consecutive_errors = 0;
        }

        self.last_result = Some(outcome.clone());
        self.last_decision_time_ms = now;
        self.last_decision = Some(DecisionRecord {
            source,
            action: action.map(ToOwned::to_owned),
            outcome: outcome.to_string(),
            raw_response: raw_response.map(|raw| truncate_on_char_boundary(raw, MAX_RAW_RESPONSE_LEN)),
            latency_ms,
            created_at: Utc::now(),
        });

        info!(
            source = source.as_str(),
            action = action.unwrap_or("-"),
            outcome = %outcome,
            errors = self.consecutive_errors,
            "decision finished"
        );
    }
}

/// Collision boxes of everyone the NPC can bump into: the player plus
/// every other character on the map.
fn collision_boxes(player: &Character, characters: &[Character]) -> Vec<WorldRect> {
    let mut boxes = Vec::with_capacity(characters.len().saturating_add(1));
    boxes.push(player.collision_box());
    boxes.extend(characters.iter().map(Character::collision_box));
    boxes
}

/// Steps needed to cover a tile distance at a given speed, at least one.
fn steps_for_distance(distance_tiles: f64, speed: i32) -> u32 {
    let pixels = distance_tiles * f64::from(TILE_SIZE);
    let speed = f64::from(speed.max(1));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = (pixels / speed).ceil() as u32;
    steps.max(1)
}

/// Step budget for a `move_to`: the straight-line estimate plus a buffer,
/// capped.
fn plan_step_budget(distance_px: f64, speed: i32) -> u32 {
    let speed = f64::from(speed.max(1));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = (distance_px / speed).ceil() as u32;
    steps.saturating_add(10).min(MOVE_TO_STEP_CAP)
}

/// Truncate to at most `max_len` bytes on a valid UTF-8 boundary.
fn truncate_on_char_boundary(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_owned();
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    let mut truncated = s.get(..end).unwrap_or_default().to_owned();
    truncated.push_str("...");
    truncated
}
