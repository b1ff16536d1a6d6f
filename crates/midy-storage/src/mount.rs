//! Mount table.
//!
//! Binds logical roots to physical directories. The table always holds a
//! binding for `/`; other mounts graft independently rooted directories into
//! the same logical tree:
//!
//! ```text
//! /       -> /srv/site/content
//! /admin  -> /srv/admin/pages
//! ```

use std::collections::BTreeMap;

use crate::path::{LogicalPath, PhysicalPath};

/// Ordered logical root → physical root bindings.
///
/// The `/` binding is held apart from the others so it can be replaced but
/// never removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountTable {
    root: (LogicalPath, PhysicalPath),
    mounts: BTreeMap<LogicalPath, PhysicalPath>,
}

impl MountTable {
    /// Create a table with `root` mounted at `/`.
    #[must_use]
    pub fn new(root: PhysicalPath) -> Self {
        Self {
            root: (LogicalPath::root(), root),
            mounts: BTreeMap::new(),
        }
    }

    /// Bind `physical` at `logical`, returning the previous binding.
    ///
    /// Mounting at `/` replaces the primary root.
    pub fn mount(&mut self, logical: LogicalPath, physical: PhysicalPath) -> Option<PhysicalPath> {
        if logical.is_root() {
            return Some(std::mem::replace(&mut self.root.1, physical));
        }
        self.mounts.insert(logical, physical)
    }

    /// Physical root mounted exactly at `logical`.
    #[must_use]
    pub fn get(&self, logical: &LogicalPath) -> Option<&PhysicalPath> {
        if logical.is_root() {
            return Some(&self.root.1);
        }
        self.mounts.get(logical)
    }

    /// Physical root mounted at `/`.
    #[must_use]
    pub fn root(&self) -> &PhysicalPath {
        &self.root.1
    }

    /// Check whether `logical` is a mount root (including `/`).
    #[must_use]
    pub fn is_mount_root(&self, logical: &LogicalPath) -> bool {
        logical.is_root() || self.mounts.contains_key(logical)
    }

    /// Most specific mount containing `logical`.
    #[must_use]
    pub fn mount_for(&self, logical: &LogicalPath) -> (&LogicalPath, &PhysicalPath) {
        self.mounts
            .iter()
            .filter(|(root, _)| *root == logical || logical.is_descendant_of(root))
            .max_by_key(|(root, _)| root.depth())
            .unwrap_or((&self.root.0, &self.root.1))
    }

    /// Logical root of the mount whose physical root is `physical`.
    #[must_use]
    pub fn logical_for(&self, physical: &PhysicalPath) -> Option<&LogicalPath> {
        self.iter()
            .find(|(_, root)| *root == physical)
            .map(|(logical, _)| logical)
    }

    /// Mounts whose logical root is an immediate child of `logical`.
    pub fn children_of<'a>(
        &'a self,
        logical: &'a LogicalPath,
    ) -> impl Iterator<Item = (&'a LogicalPath, &'a PhysicalPath)> + 'a {
        self.mounts
            .iter()
            .filter(move |(root, _)| root.parent().as_ref() == Some(logical))
    }

    /// Immediate logical children of `logical` that lead to a mount.
    ///
    /// `/docs/api` mounted below `/` yields `/docs` for `/`; these children
    /// must survive a reindex of `logical` even without a physical directory.
    #[must_use]
    pub fn preserved_under(&self, logical: &LogicalPath) -> Vec<LogicalPath> {
        let depth = logical.depth();
        let mut preserved: Vec<LogicalPath> = self
            .mounts
            .keys()
            .filter(|root| root.is_descendant_of(logical))
            .filter_map(|root| {
                let mut chain = root.ancestors();
                chain.push(root.clone());
                chain.into_iter().nth(depth + 1)
            })
            .collect();
        preserved.sort();
        preserved.dedup();
        preserved
    }

    /// All bindings, `/` first, then ordered by logical path.
    pub fn iter(&self) -> impl Iterator<Item = (&LogicalPath, &PhysicalPath)> {
        std::iter::once((&self.root.0, &self.root.1)).chain(self.mounts.iter())
    }

    /// Number of mounts, including `/`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mounts.len() + 1
    }

    /// Always false; the root mount cannot be removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn lp(raw: &str) -> LogicalPath {
        LogicalPath::parse(raw).unwrap()
    }

    fn table() -> MountTable {
        let mut mounts = MountTable::new(PhysicalPath::new("/site"));
        mounts.mount(lp("/admin"), PhysicalPath::new("/srv/admin"));
        mounts.mount(lp("/docs/api"), PhysicalPath::new("/srv/api"));
        mounts
    }

    #[test]
    fn test_root_always_present() {
        let mounts = MountTable::new(PhysicalPath::new("/site"));
        assert_eq!(mounts.root(), &PhysicalPath::new("/site"));
        assert!(mounts.is_mount_root(&LogicalPath::root()));
        assert_eq!(mounts.len(), 1);
    }

    #[test]
    fn test_mount_for_most_specific() {
        let mounts = table();

        assert_eq!(mounts.mount_for(&lp("/admin/users")).0, &lp("/admin"));
        assert_eq!(mounts.mount_for(&lp("/admin")).0, &lp("/admin"));
        assert_eq!(mounts.mount_for(&lp("/administrator")).0, &lp("/"));
        assert_eq!(mounts.mount_for(&lp("/docs/api/v1")).0, &lp("/docs/api"));
        assert_eq!(mounts.mount_for(&lp("/docs")).0, &lp("/"));
    }

    #[test]
    fn test_logical_for_physical() {
        let mounts = table();
        assert_eq!(
            mounts.logical_for(&PhysicalPath::new("/srv/admin")),
            Some(&lp("/admin"))
        );
        assert_eq!(mounts.logical_for(&PhysicalPath::new("/srv/other")), None);
    }

    #[test]
    fn test_children_of() {
        let mounts = table();
        let root = LogicalPath::root();
        let children: Vec<_> = mounts.children_of(&root).map(|(l, _)| l.as_str()).collect();
        assert_eq!(children, vec!["/admin"]);

        let docs = lp("/docs");
        let children: Vec<_> = mounts.children_of(&docs).map(|(l, _)| l.as_str()).collect();
        assert_eq!(children, vec!["/docs/api"]);
    }

    #[test]
    fn test_preserved_under() {
        let mounts = table();
        assert_eq!(
            mounts.preserved_under(&LogicalPath::root()),
            vec![lp("/admin"), lp("/docs")]
        );
        assert_eq!(mounts.preserved_under(&lp("/docs")), vec![lp("/docs/api")]);
        assert!(mounts.preserved_under(&lp("/admin")).is_empty());
    }

    #[test]
    fn test_remount_root() {
        let mut mounts = table();
        let previous = mounts.mount(LogicalPath::root(), PhysicalPath::new("/other"));
        assert_eq!(previous, Some(PhysicalPath::new("/site")));
        assert_eq!(mounts.root(), &PhysicalPath::new("/other"));
    }
}
