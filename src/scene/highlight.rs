use std::collections::BTreeSet;

/// Every prop the look ray has hit so far. A highlight is never taken back.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Highlights {
    ids: BTreeSet<u32>,
}

impl Highlights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a look hit. Returns the id if the prop was not highlighted
    /// before, which is when its material has to be swapped.
    pub fn hit(&mut self, target: Option<u32>) -> Option<u32> {
        let id = target?;
        self.ids.insert(id).then_some(id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.ids.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::layout::{GROUND_ID, SHED_ID};

    #[test]
    fn looked_at_props_stay_highlighted() {
        let mut highlights = Highlights::new();
        assert_eq!(highlights.hit(Some(SHED_ID)), Some(SHED_ID));
        assert_eq!(highlights.hit(Some(GROUND_ID)), Some(GROUND_ID));
        assert!(highlights.contains(SHED_ID));
        assert!(highlights.contains(GROUND_ID));
        assert_eq!(highlights.iter().collect::<Vec<_>>(), vec![GROUND_ID, SHED_ID]);
    }

    #[test]
    fn repeated_hits_and_misses_change_nothing() {
        let mut highlights = Highlights::new();
        highlights.hit(Some(SHED_ID));
        assert_eq!(highlights.hit(Some(SHED_ID)), None);
        assert_eq!(highlights.hit(None), None);
        assert_eq!(highlights.len(), 1);
        assert!(!highlights.contains(GROUND_ID));
    }
}
