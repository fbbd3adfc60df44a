use std::collections::HashMap;

/// Incoming document ids mapped to the ids the store assigned during one apply.
#[derive(Debug, Clone, Default)]
pub struct IdentityRemapper {
    categories: HashMap<i32, i32>,
    stories: HashMap<i32, i32>,
    parts: HashMap<i32, i32>,
}

impl IdentityRemapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_category(&mut self, incoming: i32, stored: i32) {
        self.categories.insert(incoming, stored);
    }

    pub fn record_story(&mut self, incoming: i32, stored: i32) {
        self.stories.insert(incoming, stored);
    }

    pub fn record_part(&mut self, incoming: i32, stored: i32) {
        self.parts.insert(incoming, stored);
    }

    pub fn category(&self, incoming: i32) -> Option<i32> {
        self.categories.get(&incoming).copied()
    }

    pub fn story(&self, incoming: i32) -> Option<i32> {
        self.stories.get(&incoming).copied()
    }

    pub fn part(&self, incoming: i32) -> Option<i32> {
        self.parts.get(&incoming).copied()
    }

    /// Resolve a list of incoming category ids, dropping unknown ones and repeats.
    pub fn categories_for(&self, incoming: &[i32]) -> Vec<i32> {
        let mut resolved = Vec::with_capacity(incoming.len());
        for id in incoming.iter().filter_map(|id| self.category(*id)) {
            if !resolved.contains(&id) {
                resolved.push(id);
            }
        }
        resolved
    }

    pub fn story_count(&self) -> usize {
        self.stories.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_are_unmapped() {
        let mut remapper = IdentityRemapper::new();
        remapper.record_story(10, 1);
        remapper.record_part(20, 2);

        assert_eq!(remapper.story(10), Some(1));
        assert_eq!(remapper.story(11), None);
        assert_eq!(remapper.part(20), Some(2));
        assert_eq!(remapper.category(10), None);
    }

    #[test]
    fn category_lists_are_resolved_in_order_without_repeats() {
        let mut remapper = IdentityRemapper::new();
        remapper.record_category(1, 100);
        remapper.record_category(2, 200);
        // two incoming categories resolved onto the same stored one
        remapper.record_category(3, 100);

        assert_eq!(remapper.categories_for(&[2, 9, 1, 3, 2]), vec![200, 100]);
        assert!(remapper.categories_for(&[]).is_empty());
    }
}
