//! Compiler configuration — loads optional ./opendec.yaml or ~/.opendec/config.yaml.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// Compiler configuration loaded from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CompilerConfig {
    /// Directories searched for imported and played files, after the
    /// working directory.
    #[serde(default = "default_include_dirs")]
    pub include_dirs: Vec<PathBuf>,
    /// Where compiled `.opendec.compiled` files are written.
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,
    /// Source file extension used when discovering sources.
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_include_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("lib")]
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_extension() -> String {
    "opendec".to_string()
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            include_dirs: default_include_dirs(),
            build_dir: default_build_dir(),
            extension: default_extension(),
        }
    }
}

/// Project-local config file, checked first.
pub const LOCAL_CONFIG: &str = "opendec.yaml";

/// Get the user config file path.
fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".opendec").join("config.yaml"))
}

impl CompilerConfig {
    /// Load from ./opendec.yaml, falling back to ~/.opendec/config.yaml.
    /// Returns None if neither exists.
    pub fn load() -> Option<Self> {
        let local = PathBuf::from(LOCAL_CONFIG);
        if local.is_file() {
            return Self::load_from(&local).ok();
        }
        let path = user_config_path()?;
        Self::load_from(&path).ok()
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Name of the compiled file for a source file.
    pub fn compiled_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "out".to_string());
        self.build_dir.join(format!("{stem}.opendec.compiled"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_config() {
        let config = CompilerConfig::default();
        assert_eq!(config.include_dirs, vec![PathBuf::from("lib")]);
        assert_eq!(config.build_dir, PathBuf::from("build"));
        assert_eq!(config.extension, "opendec");
    }

    #[test]
    fn load_does_not_panic() {
        // Depends on the machine's config files; only check it returns.
        let _ = CompilerConfig::load();
    }

    #[test]
    fn parse_yaml_config() {
        let yaml = r#"
include_dirs:
  - lib
  - /usr/share/opendec
build_dir: out
extension: dec
"#;
        let config: CompilerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.include_dirs,
            vec![PathBuf::from("lib"), PathBuf::from("/usr/share/opendec")]
        );
        assert_eq!(config.build_dir, PathBuf::from("out"));
        assert_eq!(config.extension, "dec");
    }

    #[test]
    fn partial_yaml_config() {
        let config: CompilerConfig = serde_yaml::from_str("build_dir: out\n").unwrap();
        assert_eq!(config.build_dir, PathBuf::from("out"));
        assert_eq!(config.extension, "opendec");
        assert_eq!(config.include_dirs, vec![PathBuf::from("lib")]);
    }

    #[test]
    fn explicit_empty_include_list() {
        let config: CompilerConfig = serde_yaml::from_str("include_dirs: []\n").unwrap();
        assert!(config.include_dirs.is_empty());
    }

    #[test]
    fn load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "include_dirs: [sounds]").unwrap();
        let config = CompilerConfig::load_from(file.path()).unwrap();
        assert_eq!(config.include_dirs, vec![PathBuf::from("sounds")]);
    }

    #[test]
    fn load_from_invalid_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "include_dirs: 5").unwrap();
        let err = CompilerConfig::load_from(file.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn compiled_path_uses_stem() {
        let config = CompilerConfig::default();
        assert_eq!(
            config.compiled_path(Path::new("songs/hello.opendec")),
            PathBuf::from("build/hello.opendec.compiled")
        );
    }
}
