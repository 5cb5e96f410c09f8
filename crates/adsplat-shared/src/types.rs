use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::CODE_OK;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The `{code, msg, data}` wrapper around non-list backend replies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.code == CODE_OK
    }

    /// The message to show for a failed call.
    pub fn error_message(&self) -> String {
        if self.msg.trim().is_empty() {
            format!("Request failed ({})", self.code)
        } else {
            self.msg.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A deployed project on a provisioned server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectRecord {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub project_name: String,
    /// Any further fields the backend sends, kept so the cache mirror round-trips.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProjectRecord {
    pub fn new(project_id: impl Into<String>, project_name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            project_name: project_name.into(),
            extra: Map::new(),
        }
    }

    /// Both identity fields are present.
    pub fn is_complete(&self) -> bool {
        !self.project_id.is_empty() && !self.project_name.is_empty()
    }
}

/// A provisioned server and its projects, in backend order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerRecord {
    #[serde(default)]
    pub server_id: String,
    #[serde(default)]
    pub server_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub project_list: Vec<ProjectRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServerRecord {
    pub fn new(server_id: impl Into<String>, server_name: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            server_name: server_name.into(),
            project_list: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_project(mut self, project: ProjectRecord) -> Self {
        self.project_list.push(project);
        self
    }

    pub fn is_complete(&self) -> bool {
        !self.server_id.is_empty() && !self.server_name.is_empty()
    }

    pub fn project(&self, project_id: &str) -> Option<&ProjectRecord> {
        self.project_list.iter().find(|p| p.project_id == project_id)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ProjectRecord>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<ProjectRecord>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Menu
// ---------------------------------------------------------------------------

/// One entry in the navigation tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuNode {
    pub id: String,
    pub title: String,
    /// Navigation path.
    pub index: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Parent node id, set on children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<MenuNode>>,
}

impl MenuNode {
    pub fn leaf(id: impl Into<String>, title: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            index: index.into(),
            icon: None,
            pid: None,
            children: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_parent(mut self, pid: impl Into<String>) -> Self {
        self.pid = Some(pid.into());
        self
    }

    pub fn with_children(mut self, children: Vec<MenuNode>) -> Self {
        self.children = Some(children);
        self
    }

    /// Pre-order walk over this node and its descendants.
    pub fn walk(&self) -> Vec<&MenuNode> {
        let mut out = vec![self];
        for child in self.children.iter().flatten() {
            out.extend(child.walk());
        }
        out
    }
}
