//! Characters: the NPC and the player as the decision core sees them.
//!
//! A character is a named collision box with a walking speed, health, a
//! fixed-size slot inventory, and a speech bubble with a display timer.
//! Movement is axis-separated and collision-tested against walls and other
//! characters; the caller learns whether the position actually changed,
//! which is how blocked moves are detected.

use hamlet_types::{WorldRect, world_to_tile};
use tracing::debug;

use crate::error::InventoryError;
use crate::item::{ItemCatalog, ItemStack};

/// Collision box side length in pixels (one tile).
pub const CHARACTER_SIZE: i32 = hamlet_types::TILE_SIZE;

/// How long a spoken line stays on screen, in milliseconds.
pub const DEFAULT_SPEECH_DURATION_MS: u64 = 3000;

/// Convert a world-space float coordinate to pixels.
///
/// World coordinates stay far inside the i32 range for any playable map.
fn to_pixel(value: f64) -> i32 {
    #[allow(clippy::cast_possible_truncation)]
    {
        value.round() as i32
    }
}

/// An NPC or player character.
#[derive(Debug, Clone)]
pub struct Character {
    /// Display name, also used as the transfer-target id for characters.
    pub name: String,
    /// Role label, e.g. `"shopkeeper"`. Drives appearance host-side.
    pub role: String,
    x: f64,
    y: f64,
    /// Walking speed in pixels per step.
    pub speed: i32,
    /// Current health.
    pub health: u32,
    inventory: Vec<Option<ItemStack>>,
    speech_text: String,
    speech_timer_ms: u64,
    speech_duration_ms: u64,
    /// Whether the last `step` call changed the position.
    pub is_moving: bool,
    /// Whether the character is walking a scripted patrol route.
    pub patrolling: bool,
    last_said: Option<String>,
}

impl Character {
    /// Create a character at a world position (top-left corner of its
    /// collision box) with an empty inventory of `inventory_size` slots.
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        x: f64,
        y: f64,
        speed: i32,
        inventory_size: usize,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            x,
            y,
            speed,
            health: 100,
            inventory: vec![None; inventory_size],
            speech_text: String::new(),
            speech_timer_ms: 0,
            speech_duration_ms: DEFAULT_SPEECH_DURATION_MS,
            is_moving: false,
            patrolling: false,
            last_said: None,
        }
    }

    // -------------------------------------------------------------------
    // Position
    // -------------------------------------------------------------------

    /// Top-left corner of the collision box in world coordinates.
    pub const fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Place the character at a world position. Host-side teleport; no
    /// collision test.
    pub const fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Centre of the collision box in world coordinates.
    pub fn center(&self) -> (f64, f64) {
        let half = f64::from(CHARACTER_SIZE) / 2.0;
        (self.x + half, self.y + half)
    }

    /// The tile the character's centre is on.
    pub fn tile_pos(&self) -> (i32, i32) {
        let (cx, cy) = self.center();
        world_to_tile(to_pixel(cx), to_pixel(cy))
    }

    /// The character's collision box, rounded to pixels.
    pub fn collision_box(&self) -> WorldRect {
        WorldRect::new(
            to_pixel(self.x),
            to_pixel(self.y),
            CHARACTER_SIZE,
            CHARACTER_SIZE,
        )
    }

    /// Attempt to move by `(dx, dy)` pixels, colliding against walls and
    /// other characters' boxes. Each axis is tried independently so the
    /// character can slide along an obstruction.
    ///
    /// Returns `true` when the position changed on at least one axis.
    pub fn step(&mut self, dx: f64, dy: f64, walls: &[WorldRect], others: &[WorldRect]) -> bool {
        let mut moved = false;

        let candidate_x = self.x + dx;
        if dx != 0.0 && !Self::collides(candidate_x, self.y, walls, others) {
            self.x = candidate_x;
            moved = true;
        }

        let candidate_y = self.y + dy;
        if dy != 0.0 && !Self::collides(self.x, candidate_y, walls, others) {
            self.y = candidate_y;
            moved = true;
        }

        self.is_moving = moved;
        if moved {
            debug!(name = %self.name, x = self.x, y = self.y, "character moved");
        }
        moved
    }

    fn collides(x: f64, y: f64, walls: &[WorldRect], others: &[WorldRect]) -> bool {
        let footprint = WorldRect::new(to_pixel(x), to_pixel(y), CHARACTER_SIZE, CHARACTER_SIZE);
        walls.iter().any(|w| footprint.overlaps(w)) || others.iter().any(|o| footprint.overlaps(o))
    }

    // -------------------------------------------------------------------
    // Speech
    // -------------------------------------------------------------------

    /// Put a line in the speech bubble and restart its display timer.
    pub fn say(&mut self, text: impl Into<String>) {
        self.speech_text = text.into();
        self.speech_timer_ms = 0;
        debug!(name = %self.name, text = %self.speech_text, "character speaks");
    }

    /// The currently displayed line, if the bubble is visible.
    pub fn speech(&self) -> Option<&str> {
        if self.speech_text.is_empty() {
            None
        } else {
            Some(self.speech_text.as_str())
        }
    }

    /// Advance timers by `dt_ms`. Clears the speech bubble once its
    /// display duration has elapsed.
    pub fn update(&mut self, dt_ms: u64) {
        if !self.speech_text.is_empty() {
            self.speech_timer_ms = self.speech_timer_ms.saturating_add(dt_ms);
            if self.speech_timer_ms >= self.speech_duration_ms {
                self.speech_text.clear();
                self.speech_timer_ms = 0;
            }
        }
    }

    /// Record a fresh utterance for the decision core to consume.
    pub fn set_last_said(&mut self, text: impl Into<String>) {
        self.last_said = Some(text.into());
    }

    /// Take the fresh utterance, leaving `None`. The controller calls this
    /// once per utterance, which is what keeps it from being replayed to
    /// the LLM on later ticks.
    pub fn take_last_said(&mut self) -> Option<String> {
        self.last_said.take()
    }

    // -------------------------------------------------------------------
    // Inventory
    // -------------------------------------------------------------------

    /// Number of inventory slots.
    pub const fn inventory_size(&self) -> usize {
        self.inventory.len()
    }

    /// The slots in order, empty slots included.
    pub fn inventory_slots(&self) -> &[Option<ItemStack>] {
        &self.inventory
    }

    /// Units of `item_id` held across all slots.
    pub fn item_quantity(&self, item_id: &str) -> u32 {
        self.inventory
            .iter()
            .flatten()
            .filter(|stack| stack.item_id == item_id)
            .fold(0, |total, stack| total.saturating_add(stack.quantity))
    }

    /// Whether at least one unit of `item_id` is held.
    pub fn has_item(&self, item_id: &str) -> bool {
        self.item_quantity(item_id) > 0
    }

    /// Add `quantity` units of an item, stacking onto an existing slot or
    /// taking the first empty slot.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Full`] when no slot can take the item, or
    /// [`InventoryError::Overflow`] if the stack counter would overflow.
    /// The inventory is unchanged on error.
    pub fn add_item(&mut self, item_id: &str, quantity: u32) -> Result<(), InventoryError> {
        if let Some(stack) = self
            .inventory
            .iter_mut()
            .flatten()
            .find(|stack| stack.item_id == item_id)
        {
            stack.quantity =
                stack
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| InventoryError::Overflow {
                        item_id: item_id.to_owned(),
                    })?;
            return Ok(());
        }

        let empty = self
            .inventory
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or_else(|| InventoryError::Full {
                item_id: item_id.to_owned(),
            })?;
        *empty = Some(ItemStack::new(item_id.to_owned(), quantity));
        Ok(())
    }

    /// Remove `quantity` units of an item. The slot empties (stays in
    /// place as `None`) when its count reaches zero.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Insufficient`] when fewer units are held
    /// than requested. The inventory is unchanged on error.
    pub fn remove_item(&mut self, item_id: &str, quantity: u32) -> Result<(), InventoryError> {
        let held = self.item_quantity(item_id);
        if held < quantity {
            return Err(InventoryError::Insufficient {
                item_id: item_id.to_owned(),
                requested: quantity,
                held,
            });
        }

        let mut remaining = quantity;
        for slot in &mut self.inventory {
            if remaining == 0 {
                break;
            }
            if let Some(stack) = slot
                && stack.item_id == item_id
            {
                let taken = stack.quantity.min(remaining);
                stack.quantity = stack.quantity.saturating_sub(taken);
                remaining = remaining.saturating_sub(taken);
                if stack.quantity == 0 {
                    *slot = None;
                }
            }
        }
        Ok(())
    }

    /// Inventory rendered for the observation: one `"<qty>x <Name>"` line
    /// per occupied slot, or `["Empty"]` when nothing is held.
    pub fn inventory_lines(&self, catalog: &ItemCatalog) -> Vec<String> {
        let lines: Vec<String> = self
            .inventory
            .iter()
            .flatten()
            .map(|stack| {
                format!(
                    "{}x {}",
                    stack.quantity,
                    catalog.display_name(&stack.item_id)
                )
            })
            .collect();

        if lines.is_empty() {
            vec!["Empty".to_owned()]
        } else {
            lines
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_character() -> Character {
        Character::new("Garruk Ironhand", "shopkeeper", 320.0, 160.0, 4, 8)
    }

    #[test]
    fn center_and_tile_position() {
        let npc = test_character();
        assert_eq!(npc.center(), (336.0, 176.0));
        assert_eq!(npc.tile_pos(), (10, 5));
    }

    #[test]
    fn step_moves_when_clear() {
        let mut npc = test_character();
        let moved = npc.step(4.0, 0.0, &[], &[]);
        assert!(moved);
        assert_eq!(npc.position(), (324.0, 160.0));
        assert!(npc.is_moving);
    }

    #[test]
    fn step_blocked_by_wall() {
        let mut npc = test_character();
        // Wall immediately to the east.
        let wall = WorldRect::new(352, 160, 32, 32);
        let moved = npc.step(4.0, 0.0, &[wall], &[]);
        assert!(!moved);
        assert_eq!(npc.position(), (320.0, 160.0));
        assert!(!npc.is_moving);
    }

    #[test]
    fn step_slides_along_wall() {
        let mut npc = test_character();
        let wall = WorldRect::new(352, 160, 32, 32);
        // Diagonal into the wall: x axis blocked, y axis free.
        let moved = npc.step(4.0, 4.0, &[wall], &[]);
        assert!(moved);
        assert_eq!(npc.position(), (320.0, 164.0));
    }

    #[test]
    fn step_blocked_by_other_character() {
        let mut npc = test_character();
        let other = WorldRect::new(352, 160, 32, 32);
        assert!(!npc.step(4.0, 0.0, &[], &[other]));
    }

    #[test]
    fn speech_expires_after_duration() {
        let mut npc = test_character();
        npc.say("Welcome!");
        assert_eq!(npc.speech(), Some("Welcome!"));

        npc.update(DEFAULT_SPEECH_DURATION_MS - 1);
        assert_eq!(npc.speech(), Some("Welcome!"));

        npc.update(1);
        assert_eq!(npc.speech(), None);
    }

    #[test]
    fn say_restarts_display_timer() {
        let mut npc = test_character();
        npc.say("First");
        npc.update(DEFAULT_SPEECH_DURATION_MS - 100);
        npc.say("Second");
        npc.update(DEFAULT_SPEECH_DURATION_MS - 100);
        // Timer was reset by the second line, so it is still visible.
        assert_eq!(npc.speech(), Some("Second"));
    }

    #[test]
    fn last_said_consumed_once() {
        let mut player = test_character();
        player.set_last_said("hello");
        assert_eq!(player.take_last_said().as_deref(), Some("hello"));
        assert_eq!(player.take_last_said(), None);
    }

    #[test]
    fn add_item_stacks_and_fills_slots() {
        let mut npc = Character::new("npc", "villager", 0.0, 0.0, 4, 2);
        assert!(npc.add_item("health_potion", 3).is_ok());
        assert!(npc.add_item("health_potion", 2).is_ok());
        assert_eq!(npc.item_quantity("health_potion"), 5);
        // Stacking used one slot; a second item takes the other.
        assert!(npc.add_item("iron_sword", 1).is_ok());
        assert_eq!(
            npc.add_item("mana_potion", 1),
            Err(InventoryError::Full {
                item_id: "mana_potion".to_owned()
            })
        );
    }

    #[test]
    fn remove_item_clears_slot_at_zero() {
        let mut npc = Character::new("npc", "villager", 0.0, 0.0, 4, 2);
        assert!(npc.add_item("iron_sword", 2).is_ok());
        assert!(npc.remove_item("iron_sword", 2).is_ok());
        assert!(!npc.has_item("iron_sword"));
        // The slot is empty, not gone.
        assert_eq!(npc.inventory_size(), 2);
        assert!(npc.inventory_slots().iter().all(Option::is_none));
    }

    #[test]
    fn remove_more_than_held_fails_without_change() {
        let mut npc = Character::new("npc", "villager", 0.0, 0.0, 4, 2);
        assert!(npc.add_item("iron_sword", 1).is_ok());
        let result = npc.remove_item("iron_sword", 2);
        assert_eq!(
            result,
            Err(InventoryError::Insufficient {
                item_id: "iron_sword".to_owned(),
                requested: 2,
                held: 1,
            })
        );
        assert_eq!(npc.item_quantity("iron_sword"), 1);
    }

    #[test]
    fn inventory_lines_render_with_catalog() {
        let mut catalog = ItemCatalog::new();
        catalog.register("health_potion", "Health Potion");

        let mut npc = Character::new("npc", "villager", 0.0, 0.0, 4, 4);
        assert!(npc.add_item("health_potion", 5).is_ok());
        assert!(npc.add_item("iron_sword", 2).is_ok());

        assert_eq!(
            npc.inventory_lines(&catalog),
            vec!["5x Health Potion".to_owned(), "2x iron_sword".to_owned()]
        );
    }

    #[test]
    fn empty_inventory_renders_empty_marker() {
        let npc = test_character();
        assert_eq!(
            npc.inventory_lines(&ItemCatalog::new()),
            vec!["Empty".to_owned()]
        );
    }
}
