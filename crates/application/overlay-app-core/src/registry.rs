use overlay_core::Action;

/// Actions of the active profile. Replaced wholesale on every reload.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: Vec<Action>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every current action and installs `actions`, even if unchanged.
    pub fn replace(&mut self, actions: Vec<Action>) {
        self.actions = actions;
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn lookup(&self, id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lookup(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
