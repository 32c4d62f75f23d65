use crate::inventory::RemovableUnit;
use std::collections::HashSet;

pub fn toggle_selection(selected: &mut HashSet<String>, focused: Option<&RemovableUnit>) {
    if let Some(unit) = focused {
        if !selected.remove(&unit.name) {
            selected.insert(unit.name.clone());
        }
    }
}

pub fn select_all(selected: &mut HashSet<String>, units: &[RemovableUnit]) {
    for unit in units {
        selected.insert(unit.name.clone());
    }
}

pub fn deselect_all(selected: &mut HashSet<String>) {
    selected.clear();
}
