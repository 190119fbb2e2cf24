//! Tool registry - name to descriptor mapping built by discovery

use std::collections::BTreeMap;

use crate::error::{Result, ToolboxError};

use super::descriptor::ToolDescriptor;

/// Registry of discovered tools, ordered by name
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool; a second tool with the same name is an error
    pub fn insert(&mut self, tool: ToolDescriptor) -> Result<()> {
        if let Some(existing) = self.tools.get(tool.name()) {
            return Err(ToolboxError::DuplicateTool {
                name: tool.name().to_string(),
                first: existing.location().to_path_buf(),
                second: tool.location().to_path_buf(),
            });
        }
        self.tools.insert(tool.name().to_string(), tool);
        Ok(())
    }

    /// Get a tool by exact, case-sensitive name
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// Get a tool or fail with the list of known names
    pub fn lookup(&self, name: &str) -> Result<&ToolDescriptor> {
        self.get(name).ok_or_else(|| ToolboxError::UnknownTool {
            name: name.to_string(),
            available: self.names().into_iter().map(String::from).collect(),
        })
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Sorted tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// All tools in name order
    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    /// Get number of tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
