use crate::inventory::RemovableUnit;
use crate::tui::state::SortMode;

/// Display order for `units`. Sizes still being computed sort as zero.
pub fn sorted_indices(units: &[RemovableUnit], sort_mode: SortMode) -> Vec<usize> {
    let mut order: Vec<usize> = (0..units.len()).collect();
    let size = |i: &usize| units[*i].known_size().unwrap_or(0);
    let name = |i: &usize| units[*i].name.to_lowercase();

    match sort_mode {
        SortMode::NameAsc => order.sort_by_key(name),
        SortMode::NameDesc => order.sort_by(|a, b| name(b).cmp(&name(a))),
        SortMode::SizeDesc => order.sort_by(|a, b| size(b).cmp(&size(a))),
        SortMode::SizeAsc => order.sort_by_key(size),
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreRoot;

    #[test]
    fn test_sort_by_size_and_name() {
        let units = vec![
            RemovableUnit::new("b", "", StoreRoot::Primary, "b"),
            RemovableUnit::new("A", "", StoreRoot::Primary, "A"),
            RemovableUnit::new("c", "", StoreRoot::Primary, "c"),
        ];
        units[0].set_size_on_disk(10);
        units[2].set_size_on_disk(30);

        assert_eq!(sorted_indices(&units, SortMode::NameAsc), vec![1, 0, 2]);
        assert_eq!(sorted_indices(&units, SortMode::NameDesc), vec![2, 0, 1]);
        assert_eq!(sorted_indices(&units, SortMode::SizeDesc), vec![2, 0, 1]);
        assert_eq!(sorted_indices(&units, SortMode::SizeAsc), vec![1, 0, 2]);
    }
}
