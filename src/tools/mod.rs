//! Tool System - descriptors, header extraction, registry and discovery

mod descriptor;
mod discovery;
mod header;
mod registry;

pub use descriptor::{ToolDescriptor, ToolSummary};
pub use discovery::{DiscoveryOptions, discover};
pub use header::extract_description;
pub use registry::ToolRegistry;
