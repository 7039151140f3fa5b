//! Shared ownership of one store by the host's collaborators.
//! 由多個元件共用同一個收藏庫。

use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

use crate::store::FavoritesStore;

/// Store shared between the host's collaborators for the lifetime of a
/// session window.
/// 在工作階段視窗期間共用的收藏庫。
///
/// Mutations go through [`update`](Self::update). Events raised by the
/// mutation are delivered after the store borrow is released, so a listener
/// holding a [`WeakFavoritesStore`] can call [`read`](Self::read) or even
/// `update` again.
#[derive(Debug, Clone)]
pub struct SharedFavoritesStore {
    inner: Rc<RefCell<FavoritesStore>>,
}

/// Non-owning handle, typically captured by listeners.
#[derive(Debug, Clone)]
pub struct WeakFavoritesStore {
    inner: Weak<RefCell<FavoritesStore>>,
}

impl SharedFavoritesStore {
    pub fn new(mut store: FavoritesStore) -> Self {
        store.defer_events();
        Self {
            inner: Rc::new(RefCell::new(store)),
        }
    }

    /// Borrows the store for queries.
    ///
    /// # Panics
    /// Panics when called from inside an [`update`](Self::update) closure.
    pub fn read(&self) -> Ref<'_, FavoritesStore> {
        self.inner.borrow()
    }

    /// Runs `op` against the store, then delivers the events it raised.
    /// 執行變更後再通知監聽者。
    pub fn update<R>(&self, op: impl FnOnce(&mut FavoritesStore) -> R) -> R {
        let result = op(&mut self.inner.borrow_mut());
        self.flush();
        result
    }

    pub fn downgrade(&self) -> WeakFavoritesStore {
        WeakFavoritesStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether both handles point at the same store.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // A nested flush (listener calling `update`) finds the listeners checked
    // out and returns; the outer loop picks up what it queued.
    fn flush(&self) {
        loop {
            let Some((events, mut listeners)) = self.inner.borrow_mut().take_pending() else {
                return;
            };
            for event in events {
                listeners.dispatch(event);
            }
            self.inner.borrow_mut().restore_listeners(listeners);
        }
    }
}

impl WeakFavoritesStore {
    pub fn upgrade(&self) -> Option<SharedFavoritesStore> {
        self.inner.upgrade().map(|inner| SharedFavoritesStore { inner })
    }
}
