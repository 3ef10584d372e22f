use crate::domain::traits::PlayerContext;
use parking_lot::RwLock;

/// Player context fixed from the command line instead of a live game client.
///
/// The tool always behaves as if the player were inside a match.
#[derive(Debug, Default)]
pub struct StaticPlayer {
    character: Option<String>,
    map_id: RwLock<Option<i32>>,
}

impl StaticPlayer {
    pub fn new(character: Option<String>) -> Self {
        Self {
            character: character.filter(|c| !c.trim().is_empty()),
            map_id: RwLock::new(None),
        }
    }

    pub fn set_map(&self, map_id: Option<i32>) {
        *self.map_id.write() = map_id;
    }
}

impl PlayerContext for StaticPlayer {
    fn is_in_match(&self) -> bool {
        true
    }

    fn character_name(&self) -> Option<String> {
        self.character.clone()
    }

    fn current_map_id(&self) -> Option<i32> {
        *self.map_id.read()
    }
}
