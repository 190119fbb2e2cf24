//! Scaffolder - create a new tool skeleton from a template
//!
//! Produces `<root>/<name>/<name>.<ext>` plus an empty dependency manifest.
//! The registry is not refreshed here; callers rediscover to see the tool.

use std::fs;
use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use log::info;
use serde::Serialize;

use crate::error::{Result, ToolboxError};
use crate::tools::ToolRegistry;

/// Longest accepted tool name
pub const MAX_NAME_LEN: usize = 64;

const PYTHON_TEMPLATE: &str = r#"#!/usr/bin/env python3
"""
{{name}} Tool

[Description of what the tool does]

Arguments:
    --arg1: Description

Example:
    {{interpreter}} {{entry}} --arg1 value
"""
import argparse
import logging

# Configure logging
logging.basicConfig(level=logging.INFO, format="%(message)s")


def setup_args():
    parser = argparse.ArgumentParser(description="{{name}} Tool")
    parser.add_argument("--arg1", help="Example argument")
    return parser.parse_args()


def main():
    args = setup_args()
    logging.info("Starting {{name}}...")

    # Your logic here
    if args.arg1:
        logging.info("Argument received: %s", args.arg1)

    logging.info("Done.")


if __name__ == "__main__":
    main()
"#;

const SHELL_TEMPLATE: &str = r#"#!/bin/sh
# {{name}} Tool
#
# [Description of what the tool does]
#
# Example:
#   {{interpreter}} {{entry}} --arg1 value

set -eu

log() {
    printf '%s\n' "$*" >&2
}

main() {
    log "Starting {{name}}..."

    # Your logic here
    if [ "$#" -gt 0 ]; then
        log "Arguments received: $*"
    fi

    log "Done."
}

# only run when executed directly, not when sourced
case "${0##*/}" in
    {{file_name}}) main "$@" ;;
esac
"#;

const MANIFEST_TEMPLATE: &str = "# Dependencies for {{name}}, one per line (e.g. requests==2.31.0)\n";

#[derive(Serialize)]
struct TemplateContext<'a> {
    name: &'a str,
    file_name: &'a str,
    entry: String,
    interpreter: &'a str,
}

/// Files written by a successful scaffold
#[derive(Debug, Clone)]
pub struct ScaffoldResult {
    pub directory: PathBuf,
    pub entry: PathBuf,
    pub manifest: PathBuf,
}

/// Creates new tools under a tools root
pub struct Scaffolder {
    tools_root: PathBuf,
    extension: String,
    interpreter: String,
    manifest_name: String,
    handlebars: Handlebars<'static>,
}

impl Scaffolder {
    /// Create a scaffolder writing `.<extension>` entries run by `interpreter`
    pub fn new(
        tools_root: impl Into<PathBuf>,
        extension: impl Into<String>,
        interpreter: impl Into<String>,
        manifest_name: impl Into<String>,
    ) -> Result<Self> {
        let extension = extension.into();
        let template = template_for(&extension)
            .ok_or_else(|| ToolboxError::Template(format!("no entry template for '.{}' files", extension)))?;

        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        // Don't escape HTML entities in output
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string("entry", template)
            .map_err(|e| ToolboxError::Template(format!("Failed to register entry template: {}", e)))?;
        handlebars
            .register_template_string("manifest", MANIFEST_TEMPLATE)
            .map_err(|e| ToolboxError::Template(format!("Failed to register manifest template: {}", e)))?;

        Ok(Self {
            tools_root: tools_root.into(),
            extension,
            interpreter: interpreter.into(),
            manifest_name: manifest_name.into(),
            handlebars,
        })
    }

    /// Materialise a new tool named `name`
    ///
    /// Fails if the name is invalid, already registered, or its directory
    /// exists. Nothing is written unless every check passes.
    pub fn create(&self, name: &str, registry: &ToolRegistry) -> Result<ScaffoldResult> {
        validate_name(name)?;

        let directory = self.tools_root.join(name);
        if let Some(existing) = registry.get(name) {
            return Err(ToolboxError::ToolExists {
                name: name.to_string(),
                path: existing.location().to_path_buf(),
            });
        }
        if directory.exists() {
            return Err(ToolboxError::ToolExists {
                name: name.to_string(),
                path: directory,
            });
        }

        let file_name = format!("{}.{}", name, self.extension);
        let entry = directory.join(&file_name);
        let manifest = directory.join(&self.manifest_name);
        let context = TemplateContext {
            name,
            file_name: &file_name,
            entry: entry.display().to_string(),
            interpreter: &self.interpreter,
        };
        let entry_text = self.render("entry", &context)?;
        let manifest_text = self.render("manifest", &context)?;

        fs::create_dir_all(&directory)?;
        fs::write(&entry, entry_text)?;
        fs::write(&manifest, manifest_text)?;
        make_executable(&entry)?;

        info!("Scaffolded tool {} at {}", name, entry.display());
        Ok(ScaffoldResult {
            directory,
            entry,
            manifest,
        })
    }

    fn render(&self, template: &str, context: &TemplateContext<'_>) -> Result<String> {
        self.handlebars
            .render(template, context)
            .map_err(|e| ToolboxError::Template(format!("Failed to render {} template: {}", template, e)))
    }
}

fn template_for(extension: &str) -> Option<&'static str> {
    match extension {
        "py" => Some(PYTHON_TEMPLATE),
        "sh" => Some(SHELL_TEMPLATE),
        _ => None,
    }
}

/// Check that `name` is a usable, filesystem-safe tool identifier
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(ToolboxError::InvalidToolName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.is_empty() {
        return invalid("name must not be empty");
    }
    if name.len() > MAX_NAME_LEN {
        return invalid(&format!("name must be at most {} characters", MAX_NAME_LEN));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return invalid("name must start with a letter");
    }
    if let Some(c) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))) {
        return invalid(&format!("character '{}' is not allowed; use letters, digits, '_' or '-'", c));
    }
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{DiscoveryOptions, discover, extract_description};
    use tempfile::TempDir;

    fn scaffolder(root: &Path, extension: &str) -> Scaffolder {
        let interpreter = if extension == "sh" { "sh" } else { "python3" };
        Scaffolder::new(root, extension, interpreter, "requirements.txt").unwrap()
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("disk_usage").is_ok());
        assert!(validate_name("web-scraper2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("2fast").is_err());
        assert!(validate_name("_private").is_err());
        assert!(validate_name("../escape").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name(&"a".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_unknown_extension_has_no_template() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Scaffolder::new(dir.path(), "rb", "ruby", "requirements.txt"),
            Err(ToolboxError::Template(_))
        ));
    }

    #[test]
    fn test_create_python_tool() {
        let dir = TempDir::new().unwrap();
        let result = scaffolder(dir.path(), "py")
            .create("my_tool", &ToolRegistry::new())
            .unwrap();

        assert_eq!(result.entry, dir.path().join("my_tool/my_tool.py"));
        let entry = fs::read_to_string(&result.entry).unwrap();
        assert!(entry.starts_with("#!/usr/bin/env python3"));
        assert!(entry.contains("if __name__ == \"__main__\":"));
        assert!(entry.contains("logging.basicConfig"));
        assert_eq!(extract_description(&entry), "my_tool Tool");

        let manifest = fs::read_to_string(&result.manifest).unwrap();
        assert!(manifest.starts_with('#'));
    }

    #[cfg(unix)]
    #[test]
    fn test_entry_is_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let result = scaffolder(dir.path(), "py").create("exec", &ToolRegistry::new()).unwrap();
        let mode = fs::metadata(&result.entry).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_created_tool_is_discoverable() {
        let dir = TempDir::new().unwrap();
        let options = DiscoveryOptions::default();
        let scaffolder = scaffolder(dir.path(), "py");

        let before = discover(dir.path(), &options).unwrap();
        scaffolder.create("fresh", &before).unwrap();
        assert!(!before.contains("fresh"));

        let after = discover(dir.path(), &options).unwrap();
        let tool = after.get("fresh").unwrap();
        assert!(tool.dependencies().is_empty());
        assert_eq!(tool.description(), "fresh Tool");
    }

    #[test]
    fn test_create_twice_fails_without_overwrite() {
        let dir = TempDir::new().unwrap();
        let options = DiscoveryOptions::default();
        let scaffolder = scaffolder(dir.path(), "py");

        let first = scaffolder.create("dup", &discover(dir.path(), &options).unwrap()).unwrap();
        fs::write(&first.entry, "# edited\n").unwrap();

        let err = scaffolder
            .create("dup", &discover(dir.path(), &options).unwrap())
            .unwrap_err();
        assert!(matches!(err, ToolboxError::ToolExists { .. }));
        assert_eq!(fs::read_to_string(&first.entry).unwrap(), "# edited\n");
    }

    #[test]
    fn test_existing_directory_blocks_create() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        let err = scaffolder(dir.path(), "py")
            .create("assets", &ToolRegistry::new())
            .unwrap_err();
        assert!(matches!(err, ToolboxError::ToolExists { .. }));
    }

    #[test]
    fn test_shell_template_runs_only_when_executed() {
        let dir = TempDir::new().unwrap();
        let result = scaffolder(dir.path(), "sh").create("greet", &ToolRegistry::new()).unwrap();
        let entry = fs::read_to_string(&result.entry).unwrap();
        assert!(entry.contains("greet.sh) main \"$@\" ;;"));
        assert_eq!(extract_description(&entry), "greet Tool");

        let status = std::process::Command::new("sh").arg(&result.entry).status().unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_invalid_name_writes_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(scaffolder(dir.path(), "py").create("bad name", &ToolRegistry::new()).is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
