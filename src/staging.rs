//! Off-screen staging of laid-out surfaces.
//!
//! A surface has to be attached to the shared layout tree before it can be
//! rasterized.  Staged nodes sit far outside the viewport but keep their full
//! size, and every node is detached again when its [`StagingGuard`] drops.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::template::layout::Layout;

/// Horizontal offset that keeps staged nodes out of view.
pub const OFFSCREEN_LEFT_PX: i32 = -10_000;

const ID_PREFIX: &str = "uxreport-staging";

/// Position of a staged node relative to the viewport origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

/// A layout attached to the staging tree.
#[derive(Clone, Debug, PartialEq)]
pub struct StagedSurface {
    pub id: String,
    pub placement: Placement,
    pub layout: Layout,
}

#[derive(Default)]
struct StagingTree {
    next_id: AtomicU64,
    nodes: Mutex<BTreeMap<String, Placement>>,
}

/// Shared tree that staged nodes are attached to.
///
/// Clones share the same tree.  Concurrent exports each get their own id, so
/// they never collide on a node.
#[derive(Clone, Default)]
pub struct StagingArea {
    tree: Arc<StagingTree>,
}

impl StagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `layout` off-screen and returns the guard owning the node.
    pub fn stage(&self, layout: Layout) -> StagingGuard {
        let serial = self.tree.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("{}-{}", ID_PREFIX, serial);
        let placement = Placement {
            left: OFFSCREEN_LEFT_PX,
            top: 0,
            width: layout.width,
            height: layout.height,
        };
        self.tree.nodes.lock().insert(id.clone(), placement);
        debug!(
            "Staged {} at {}x{} px off-screen",
            id, placement.width, placement.height
        );

        StagingGuard {
            tree: Arc::clone(&self.tree),
            surface: StagedSurface {
                id,
                placement,
                layout,
            },
        }
    }

    /// Whether a node with `id` is still attached.
    pub fn contains(&self, id: &str) -> bool {
        self.tree.nodes.lock().contains_key(id)
    }

    /// Number of attached nodes.
    pub fn len(&self) -> usize {
        self.tree.nodes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of every attached node, in id order.
    pub fn staged_ids(&self) -> Vec<String> {
        self.tree.nodes.lock().keys().cloned().collect()
    }
}

impl fmt::Debug for StagingArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagingArea")
            .field("nodes", &self.staged_ids())
            .finish()
    }
}

/// Owns one staged node and detaches it on drop.
pub struct StagingGuard {
    tree: Arc<StagingTree>,
    surface: StagedSurface,
}

impl StagingGuard {
    pub fn id(&self) -> &str {
        &self.surface.id
    }

    pub fn surface(&self) -> &StagedSurface {
        &self.surface
    }
}

impl fmt::Debug for StagingGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagingGuard")
            .field("id", &self.surface.id)
            .finish()
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if self.tree.nodes.lock().remove(&self.surface.id).is_some() {
            debug!("Detached {}", self.surface.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::layout::LayoutCursor;
    use std::thread;

    fn layout(height: u32) -> Layout {
        let mut cursor = LayoutCursor::new(100, 0, 0.0);
        cursor.advance(height);
        cursor.finish([255, 255, 255])
    }

    #[test]
    fn guard_detaches_on_drop() {
        let area = StagingArea::new();
        let guard = area.stage(layout(40));
        let id = guard.id().to_owned();

        assert!(area.contains(&id));
        assert_eq!(guard.surface().placement.left, OFFSCREEN_LEFT_PX);
        assert_eq!(guard.surface().placement.height, 40);

        drop(guard);
        assert!(!area.contains(&id));
        assert!(area.is_empty());
    }

    #[test]
    fn ids_are_unique_per_call() {
        let area = StagingArea::new();
        let first = area.stage(layout(1));
        let second = area.stage(layout(1));
        assert_ne!(first.id(), second.id());
        assert_eq!(area.len(), 2);
    }

    #[test]
    fn concurrent_stagings_do_not_collide() {
        let area = StagingArea::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let area = area.clone();
                thread::spawn(move || area.stage(layout(10)).id().to_owned())
            })
            .collect();

        let mut ids: Vec<String> = handles
            .into_iter()
            .map(|handle| handle.join().expect("staging thread"))
            .collect();
        ids.sort();
        ids.dedup();

        assert_eq!(ids.len(), 8);
        assert!(area.is_empty());
    }
}
