//! Configuration module for package loading.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! Settings are an explicit value handed to the source locator and the
//! toolchain; nothing in the crate reads process-wide mutable defaults.
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `SRCPKG_` and use double
//! underscores to separate nested levels:
//! - `SRCPKG_CONTEXT__GOROOT=/opt/go` sets `context.goroot`
//! - `SRCPKG_PARSE__INCLUDE_TESTS=false` sets `parse.include_tests`
//! - `SRCPKG_LOGGING__LEVEL=debug` sets `logging.level`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding the workspace configuration file.
pub const CONFIG_DIR: &str = ".srcpkg";
/// Name of the configuration file inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Global debug mode
    #[serde(default = "default_false")]
    pub debug: bool,

    /// Where packages are searched for
    #[serde(default)]
    pub context: ContextConfig,

    /// How package directories are parsed
    #[serde(default)]
    pub parse: ParseConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ContextConfig {
    /// Directory imports are resolved from (defaults to the working directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<PathBuf>,

    /// Library root holding the standard library under `src/`
    #[serde(default = "default_goroot")]
    pub goroot: PathBuf,

    /// Dependency roots, each holding packages under `src/`
    #[serde(default = "default_gopath")]
    pub gopath: Vec<PathBuf>,

    /// Target operating system for build constraints
    #[serde(default = "default_goos")]
    pub goos: String,

    /// Target architecture for build constraints
    #[serde(default = "default_goarch")]
    pub goarch: String,

    /// Extra build tags satisfied by `//go:build` lines
    #[serde(default)]
    pub build_tags: Vec<String>,

    /// Whether files importing "C" are buildable
    #[serde(default = "default_true")]
    pub cgo_enabled: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ParseConfig {
    /// Keep comments in the syntax forest (needed for docs and notes)
    #[serde(default = "default_true")]
    pub retain_comments: bool,

    /// Parse `_test.go` files along with the package sources
    #[serde(default = "default_true")]
    pub include_tests: bool,

    /// Parse only the files the locator classified as buildable
    #[serde(default = "default_true")]
    pub respect_build_constraints: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Maximum level: error, warn, info, debug or trace
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_goroot() -> PathBuf {
    std::env::var_os("GOROOT")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/usr/local/go"))
}
fn default_gopath() -> Vec<PathBuf> {
    if let Some(value) = std::env::var_os("GOPATH").filter(|value| !value.is_empty()) {
        return std::env::split_paths(&value)
            .filter(|path| !path.as_os_str().is_empty())
            .collect();
    }
    dirs::home_dir()
        .map(|home| vec![home.join("go")])
        .unwrap_or_default()
}
fn default_goos() -> String {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
    .to_string()
}
fn default_goarch() -> String {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        other => other,
    }
    .to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            debug: false,
            context: ContextConfig::default(),
            parse: ParseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            goroot: default_goroot(),
            gopath: default_gopath(),
            goos: default_goos(),
            goarch: default_goarch(),
            build_tags: Vec::new(),
            cgo_enabled: true,
        }
    }
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            retain_comments: true,
            include_tests: true,
            respect_build_constraints: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        // Try to find the workspace root by looking for the .srcpkg directory
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        Self::figment(config_path).extract().map_err(Box::new)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref().to_path_buf())
            .extract()
            .map_err(Box::new)
    }

    fn figment(config_path: PathBuf) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Layer in environment variables with SRCPKG_ prefix
            // Use double underscore (__) to separate nested levels
            // Single underscore (_) remains as is within field names
            .merge(Env::prefixed("SRCPKG_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".") // Double underscore becomes dot
                    .into()
            }))
    }

    /// Find the workspace config by looking for a .srcpkg directory
    /// Searches from current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(CONFIG_FILE));
            }
        }

        None
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert!(settings.parse.retain_comments);
        assert!(settings.parse.include_tests);
        assert!(settings.parse.respect_build_constraints);
        assert_eq!(settings.logging.level, "warn");
        assert!(!settings.context.goos.is_empty());
        assert!(!settings.context.goarch.is_empty());
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
version = 2

[context]
goroot = "/opt/go"
gopath = ["/work/go", "/shared/go"]
goos = "windows"
build_tags = ["integration"]

[parse]
include_tests = false
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.context.goroot, PathBuf::from("/opt/go"));
        assert_eq!(settings.context.gopath.len(), 2);
        assert_eq!(settings.context.goos, "windows");
        assert_eq!(settings.context.build_tags, vec!["integration"]);
        assert!(!settings.parse.include_tests);
        // Untouched sections keep their defaults
        assert!(settings.parse.retain_comments);
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.context.goarch = "riscv64".to_string();
        settings.logging.level = "debug".to_string();

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.context.goarch, "riscv64");
        assert_eq!(loaded.logging.level, "debug");
    }

    #[test]
    fn test_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "settings.toml",
                r#"
[logging]
level = "info"
"#,
            )?;
            jail.set_env("SRCPKG_LOGGING__LEVEL", "trace");
            jail.set_env("SRCPKG_PARSE__RETAIN_COMMENTS", "false");

            let settings = Settings::load_from("settings.toml").map_err(|e| e.to_string())?;
            assert_eq!(settings.logging.level, "trace");
            assert!(!settings.parse.retain_comments);
            Ok(())
        });
    }
}
