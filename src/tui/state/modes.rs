#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppMode {
    LibraryList,
    ConfirmRemoval,
    Removing,
    RemovalResult,
    Help,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum SortMode {
    #[default]
    NameAsc,
    NameDesc,
    SizeDesc,
    SizeAsc,
}

impl SortMode {
    pub fn next(self) -> Self {
        match self {
            SortMode::NameAsc => SortMode::NameDesc,
            SortMode::NameDesc => SortMode::SizeDesc,
            SortMode::SizeDesc => SortMode::SizeAsc,
            SortMode::SizeAsc => SortMode::NameAsc,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortMode::NameAsc => "Name A-Z",
            SortMode::NameDesc => "Name Z-A",
            SortMode::SizeDesc => "Size ↓",
            SortMode::SizeAsc => "Size ↑",
        }
    }
}
