// State module - Preference-backed lists the panel remembers between runs

use crate::error::Result;
use crate::process::{is_builtin_ignored, SignalAction};
use crate::settings::{
    SettingsStore, AUTO_TOGGLE_KEY, LAST_SELECTION_KEY, LAST_SIGNAL_KEY, PREVIOUS_SELECTIONS_KEY,
};
use serde_json::Value;

/// How many recently used process names are kept
pub const MAX_PREVIOUS_SELECTIONS: usize = 5;

/// Most-recently-used process names, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviousSelections {
    names: Vec<String>,
}

impl PreviousSelections {
    /// Build from raw names, dropping duplicates and anything past the bound
    pub fn from_names<I: IntoIterator<Item = String>>(names: I) -> Self {
        let mut result = Vec::with_capacity(MAX_PREVIOUS_SELECTIONS);
        for name in names {
            if !name.is_empty() && !result.contains(&name) {
                result.push(name);
            }
            if result.len() == MAX_PREVIOUS_SELECTIONS {
                break;
            }
        }
        Self { names: result }
    }

    pub fn load(store: &dyn SettingsStore) -> Self {
        Self::from_names(store.get_string_list(PREVIOUS_SELECTIONS_KEY))
    }

    pub fn save(&self, store: &mut dyn SettingsStore) -> Result<()> {
        store.set_string_list(PREVIOUS_SELECTIONS_KEY, &self.names)
    }

    /// Move `name` to the front. Empty and ignored names are not recorded.
    pub fn record(&mut self, name: &str) -> bool {
        if name.is_empty() || is_builtin_ignored(name) {
            return false;
        }

        self.names.retain(|n| n != name);
        self.names.insert(0, name.to_string());
        self.names.truncate(MAX_PREVIOUS_SELECTIONS);
        true
    }

    /// Sort key: position in the list, unknown names after every known one
    pub fn rank(&self, name: &str) -> usize {
        self.names
            .iter()
            .position(|n| n == name)
            .unwrap_or(self.names.len() + 1)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Process names flagged for suspend/resume on desktop switch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoToggleList {
    names: Vec<String>,
}

impl AutoToggleList {
    pub fn load(store: &dyn SettingsStore) -> Self {
        let mut list = Self::default();
        for name in store.get_string_list(AUTO_TOGGLE_KEY) {
            list.add(&name);
        }
        list
    }

    pub fn save(&self, store: &mut dyn SettingsStore) -> Result<()> {
        store.set_string_list(AUTO_TOGGLE_KEY, &self.names)
    }

    /// Returns false if the name was already present
    pub fn add(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.contains(name) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    /// Returns false if the name was not present
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.names.len();
        self.names.retain(|n| n != name.trim());
        self.names.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Last signal used, or `fallback` if nothing valid was stored
pub fn last_signal(store: &dyn SettingsStore, fallback: SignalAction) -> SignalAction {
    store
        .get_string(LAST_SIGNAL_KEY, fallback.as_str())
        .parse()
        .unwrap_or(fallback)
}

/// Last selected process name, empty when none
pub fn last_selection(store: &dyn SettingsStore) -> String {
    store.get_string(LAST_SELECTION_KEY, "")
}

/// Remember a send: the signal, the first selected name, and the MRU list.
pub fn record_send(
    store: &mut dyn SettingsStore,
    signal: SignalAction,
    names: &[String],
) -> Result<()> {
    store.set(LAST_SIGNAL_KEY, Value::String(signal.as_str().to_string()))?;

    let first = names.first().cloned().unwrap_or_default();
    store.set(LAST_SELECTION_KEY, Value::String(first.clone()))?;

    if !first.is_empty() {
        let mut previous = PreviousSelections::load(store);
        if previous.record(&first) {
            previous.save(store)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettingsStore;
    use serde_json::json;

    #[test]
    fn test_record_moves_to_front() {
        let mut previous = PreviousSelections::default();
        previous.record("firefox");
        previous.record("kate");
        previous.record("firefox");

        assert_eq!(previous.names(), &["firefox", "kate"]);
    }

    #[test]
    fn test_sixth_insert_drops_oldest() {
        let mut previous = PreviousSelections::default();
        for name in ["a", "b", "c", "d", "e", "f"] {
            assert!(previous.record(name));
        }

        assert_eq!(previous.names().len(), MAX_PREVIOUS_SELECTIONS);
        assert_eq!(previous.names(), &["f", "e", "d", "c", "b"]);
    }

    #[test]
    fn test_record_skips_empty_and_ignored() {
        let mut previous = PreviousSelections::default();
        assert!(!previous.record(""));
        assert!(!previous.record("plasmashell"));
        assert!(previous.is_empty());
    }

    #[test]
    fn test_rank_orders_known_before_unknown() {
        let previous = PreviousSelections::from_names(vec!["kate".to_string(), "vlc".to_string()]);
        assert_eq!(previous.rank("kate"), 0);
        assert_eq!(previous.rank("vlc"), 1);
        assert_eq!(previous.rank("firefox"), 3);
    }

    #[test]
    fn test_from_names_dedupes_and_bounds() {
        let names = ["a", "a", "b", "c", "", "d", "e", "f", "g"]
            .iter()
            .map(|s| s.to_string());
        let previous = PreviousSelections::from_names(names);
        assert_eq!(previous.names(), &["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_previous_selections_round_trip_through_store() {
        let mut store = MemorySettingsStore::new();
        let mut previous = PreviousSelections::default();
        previous.record("kate");
        previous.save(&mut store).unwrap();

        assert_eq!(PreviousSelections::load(&store), previous);
    }

    #[test]
    fn test_auto_toggle_add_remove() {
        let mut list = AutoToggleList::default();
        assert!(list.add("steam"));
        assert!(!list.add("steam"));
        assert!(!list.add("  "));
        assert!(list.contains("steam"));
        assert!(list.remove("steam"));
        assert!(!list.remove("steam"));
    }

    #[test]
    fn test_last_signal_falls_back_on_garbage() {
        let mut store = MemorySettingsStore::new();
        store.set(LAST_SIGNAL_KEY, json!("nope")).unwrap();
        assert_eq!(last_signal(&store, SignalAction::Toggle), SignalAction::Toggle);

        store.set(LAST_SIGNAL_KEY, json!("USR1")).unwrap();
        assert_eq!(last_signal(&store, SignalAction::Toggle), SignalAction::Usr1);
    }

    #[test]
    fn test_record_send_updates_everything() {
        let mut store = MemorySettingsStore::new();
        let names = vec!["vlc".to_string(), "kate".to_string()];
        record_send(&mut store, SignalAction::Stop, &names).unwrap();

        assert_eq!(last_signal(&store, SignalAction::Toggle), SignalAction::Stop);
        assert_eq!(last_selection(&store), "vlc");
        assert_eq!(PreviousSelections::load(&store).names(), &["vlc"]);
    }

    #[test]
    fn test_record_send_with_no_names_clears_last_selection() {
        let mut store = MemorySettingsStore::new();
        store.set(LAST_SELECTION_KEY, json!("vlc")).unwrap();
        record_send(&mut store, SignalAction::Toggle, &[]).unwrap();

        assert_eq!(last_selection(&store), "");
        assert!(PreviousSelections::load(&store).is_empty());
    }
}
