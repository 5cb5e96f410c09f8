//! Navigation collaborators: the route registry fed by the menu, and the
//! navigator the session gate redirects through.

use std::sync::Mutex;

use adsplat_shared::MenuNode;
use tracing::{debug, info};

/// Makes menu paths navigable.
pub trait RouteRegistry: Send + Sync {
    fn register_paths(&self, nodes: &[MenuNode]);
}

/// Current location and redirects.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;

    fn navigate(&self, path: &str);
}

/// In-process route table. Registering the same path again is a no-op.
#[derive(Debug, Default)]
pub struct RouteTable {
    paths: Mutex<Vec<String>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths
            .lock()
            .map(|p| p.iter().any(|known| known == path))
            .unwrap_or(false)
    }
}

impl RouteRegistry for RouteTable {
    fn register_paths(&self, nodes: &[MenuNode]) {
        let Ok(mut paths) = self.paths.lock() else {
            return;
        };

        let mut added = 0usize;
        for node in nodes.iter().flat_map(MenuNode::walk) {
            if paths.contains(&node.index) {
                continue;
            }
            paths.push(node.index.clone());
            added += 1;
        }

        debug!(added, total = paths.len(), "registered menu routes");
    }
}

/// Navigator for headless use: remembers the path and logs redirects.
#[derive(Debug)]
pub struct PathNavigator {
    current: Mutex<String>,
    history: Mutex<Vec<String>>,
}

impl PathNavigator {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            current: Mutex::new(start.into()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Every path navigated to, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }
}

impl Navigator for PathNavigator {
    fn current_path(&self) -> String {
        self.current.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn navigate(&self, path: &str) {
        info!(path, "navigating");
        if let Ok(mut current) = self.current.lock() {
            *current = path.to_string();
        }
        if let Ok(mut history) = self.history.lock() {
            history.push(path.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_node() -> MenuNode {
        MenuNode::leaf("s1", "Alpha", "/project/s1").with_children(vec![
            MenuNode::leaf("p1", "Site", "/project/s1/p1"),
            MenuNode::leaf("add_s1", "Add project", "/project_form/s1"),
        ])
    }

    #[test]
    fn test_registers_nested_paths() {
        let table = RouteTable::new();
        table.register_paths(&[server_node()]);

        assert_eq!(
            table.paths(),
            vec!["/project/s1", "/project/s1/p1", "/project_form/s1"]
        );
    }

    #[test]
    fn test_registration_is_idempotent() {
        let table = RouteTable::new();
        table.register_paths(&[server_node()]);
        table.register_paths(&[server_node()]);

        assert_eq!(table.paths().len(), 3);
        assert!(table.contains("/project/s1/p1"));
    }

    #[test]
    fn test_path_navigator() {
        let nav = PathNavigator::new("/welcome");
        assert_eq!(nav.current_path(), "/welcome");

        nav.navigate("/lock");
        assert_eq!(nav.current_path(), "/lock");
        assert_eq!(nav.history(), vec!["/lock"]);
    }
}
