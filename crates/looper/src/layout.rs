//! Where injected elements go in the host's column below the player.
//!
//! Order is fixed regardless of which element is built first:
//! download row, loop panel, then the host's own metadata block.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotItem {
    DownloadRow,
    LoopPanel,
    /// The host's metadata block (title, channel, description).
    Metadata,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedRole {
    DownloadRow,
    LoopPanel,
}

impl From<InjectedRole> for SlotItem {
    fn from(role: InjectedRole) -> Self {
        match role {
            InjectedRole::DownloadRow => SlotItem::DownloadRow,
            InjectedRole::LoopPanel => SlotItem::LoopPanel,
        }
    }
}

/// Index at which `role` should be inserted into `items`.
pub fn insertion_index(items: &[SlotItem], role: InjectedRole) -> usize {
    let position = |wanted: SlotItem| items.iter().position(|&item| item == wanted);
    match role {
        InjectedRole::DownloadRow => position(SlotItem::LoopPanel)
            .or_else(|| position(SlotItem::Metadata))
            .unwrap_or(0),
        InjectedRole::LoopPanel => position(SlotItem::DownloadRow)
            .map(|i| i + 1)
            .or_else(|| position(SlotItem::Metadata))
            .unwrap_or(0),
    }
}

/// Insert `role` into `items`, replacing an existing copy.
pub fn inject(items: &mut Vec<SlotItem>, role: InjectedRole) {
    let slot = SlotItem::from(role);
    items.retain(|&item| item != slot);
    let index = insertion_index(items, role);
    items.insert(index, slot);
}
