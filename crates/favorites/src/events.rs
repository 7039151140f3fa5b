use std::fmt;

use crate::tree::FavoriteId;

/// Handle returned by the `subscribe_*` methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Notification produced by a store change.
/// 收藏庫變動時產生的通知。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// Content changed below `folder`; `None` means re-read from the root.
    ContentChanged { folder: Option<FavoriteId> },
    VisibilityChanged { visible: bool },
}

type ContentListener = Box<dyn FnMut(Option<FavoriteId>)>;
type VisibilityListener = Box<dyn FnMut(bool)>;

/// Registered content and visibility listeners.
#[derive(Default)]
pub(crate) struct Listeners {
    content: Vec<(SubscriptionId, ContentListener)>,
    visibility: Vec<(SubscriptionId, VisibilityListener)>,
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("content", &self.content.len())
            .field("visibility", &self.visibility.len())
            .finish()
    }
}

impl Listeners {
    pub(crate) fn add_content(&mut self, id: SubscriptionId, listener: ContentListener) {
        self.content.push((id, listener));
    }

    pub(crate) fn add_visibility(&mut self, id: SubscriptionId, listener: VisibilityListener) {
        self.visibility.push((id, listener));
    }

    pub(crate) fn remove(&mut self, subscription: SubscriptionId) -> bool {
        let before = self.len();
        self.content.retain(|(id, _)| *id != subscription);
        self.visibility.retain(|(id, _)| *id != subscription);
        before != self.len()
    }

    pub(crate) fn dispatch(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::ContentChanged { folder } => {
                for (_, listener) in &mut self.content {
                    listener(folder);
                }
            }
            StoreEvent::VisibilityChanged { visible } => {
                for (_, listener) in &mut self.visibility {
                    listener(visible);
                }
            }
        }
    }

    /// Appends listeners registered while this set was checked out.
    pub(crate) fn append(&mut self, mut later: Listeners) {
        self.content.append(&mut later.content);
        self.visibility.append(&mut later.visibility);
    }

    pub(crate) fn ids(&self) -> Vec<SubscriptionId> {
        self.content
            .iter()
            .map(|(id, _)| *id)
            .chain(self.visibility.iter().map(|(id, _)| *id))
            .collect()
    }

    fn len(&self) -> usize {
        self.content.len() + self.visibility.len()
    }
}
