//! Local group-monitoring selection over a fetched group list.

use crate::types::{GroupPreference, WhatsAppGroup};

/// Editable copy of the group list. Toggles stay local until saved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupSelection {
    groups: Vec<WhatsAppGroup>,
}

impl GroupSelection {
    pub fn new(groups: Vec<WhatsAppGroup>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[WhatsAppGroup] {
        &self.groups
    }

    /// Set the enabled flag of one group. Returns false for an unknown id.
    pub fn toggle(&mut self, group_id: &str, enabled: bool) -> bool {
        match self.groups.iter_mut().find(|g| g.group_id == group_id) {
            Some(group) => {
                group.is_enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Enable exactly the given ids and disable the rest.
    /// Returns the ids that matched no group.
    pub fn enable_only<'a>(&mut self, ids: &[&'a str]) -> Vec<&'a str> {
        for group in &mut self.groups {
            group.is_enabled = ids.contains(&group.group_id.as_str());
        }
        ids.iter()
            .copied()
            .filter(|id| !self.groups.iter().any(|g| g.group_id == *id))
            .collect()
    }

    pub fn enabled_count(&self) -> usize {
        self.groups.iter().filter(|g| g.is_enabled).count()
    }

    /// Preferences to save: only enabled groups are sent.
    pub fn preferences(&self) -> Vec<GroupPreference> {
        self.groups
            .iter()
            .filter(|g| g.is_enabled)
            .map(|g| GroupPreference {
                group_id: g.group_id.clone(),
                group_name: g.group_name.clone(),
                is_enabled: true,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: &str, enabled: bool) -> WhatsAppGroup {
        WhatsAppGroup {
            group_id: id.into(),
            group_name: format!("Group {id}"),
            is_enabled: enabled,
        }
    }

    #[test]
    fn toggle_known_and_unknown() {
        let mut sel = GroupSelection::new(vec![group("a", false), group("b", false)]);
        assert!(sel.toggle("a", true));
        assert!(!sel.toggle("zzz", true));
        assert_eq!(sel.enabled_count(), 1);
    }

    #[test]
    fn preferences_only_enabled() {
        let sel = GroupSelection::new(vec![group("a", true), group("b", false), group("c", true)]);
        let prefs = sel.preferences();
        assert_eq!(prefs.len(), 2);
        assert!(prefs.iter().all(|p| p.is_enabled));
        assert_eq!(prefs[0].group_id, "a");
        assert_eq!(prefs[1].group_name, "Group c");
    }

    #[test]
    fn enable_only_reports_unknown_ids() {
        let mut sel = GroupSelection::new(vec![group("a", true), group("b", false)]);
        let unknown = sel.enable_only(&["b", "nope"]);
        assert_eq!(unknown, vec!["nope"]);
        assert_eq!(sel.enabled_count(), 1);
        assert!(sel.groups()[1].is_enabled);
        assert!(!sel.groups()[0].is_enabled);
    }

    #[test]
    fn empty_selection_saves_nothing() {
        let sel = GroupSelection::default();
        assert!(sel.preferences().is_empty());
        assert_eq!(sel.enabled_count(), 0);
    }
}
