use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// CD step settings loaded from a TOML file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdConfig {
    pub files: Vec<PathBuf>,
    pub label: Option<String>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CdToml {
    cd: CdTableToml,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CdTableToml {
    files: Vec<String>,
    label: Option<String>,
    output: Option<String>,
}

/// Load a `[cd]` table from `config_path`.
///
/// Relative `files` and `output` entries resolve against the config file's
/// directory.
pub fn load_cd_config(config_path: &Path) -> Result<CdConfig> {
    let raw = fs::read_to_string(config_path)
        .with_context(|| format!("reading CD config '{}'", config_path.display()))?;
    parse_cd_config(&raw, config_path)
}

fn parse_cd_config(raw: &str, config_path: &Path) -> Result<CdConfig> {
    let parsed: CdToml = toml::from_str(raw)
        .with_context(|| format!("parsing CD config '{}'", config_path.display()))?;
    let base = config_path.parent().unwrap_or(Path::new("."));

    let label = match parsed.cd.label.map(|l| l.trim().to_string()) {
        Some(l) if l.is_empty() => bail!(
            "invalid CD config '{}': label must not be empty",
            config_path.display()
        ),
        other => other,
    };

    let mut files = Vec::with_capacity(parsed.cd.files.len());
    for file in parsed.cd.files {
        if file.trim().is_empty() {
            bail!(
                "invalid CD config '{}': files contains an empty entry",
                config_path.display()
            );
        }
        files.push(base.join(file));
    }

    Ok(CdConfig {
        files,
        label,
        output: parsed.cd.output.map(|o| base.join(o)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relative_entries_resolve_against_config_dir() {
        let config = parse_cd_config(
            "[cd]\nfiles = [\"user-data\", \"/abs/meta-data\"]\nlabel = \"cidata\"\noutput = \"out/seed.iso\"\n",
            Path::new("/etc/builder/cd.toml"),
        )
        .unwrap();

        assert_eq!(
            config.files,
            [
                PathBuf::from("/etc/builder/user-data"),
                PathBuf::from("/abs/meta-data")
            ]
        );
        assert_eq!(config.label.as_deref(), Some("cidata"));
        assert_eq!(
            config.output,
            Some(PathBuf::from("/etc/builder/out/seed.iso"))
        );
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result = parse_cd_config(
            "[cd]\nfiles = []\nvolume = \"x\"\n",
            Path::new("cd.toml"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_label_rejected() {
        let result = parse_cd_config("[cd]\nfiles = []\nlabel = \" \"\n", Path::new("cd.toml"));
        assert!(result.unwrap_err().to_string().contains("label"));
    }

    #[test]
    fn test_load_from_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cd.toml");
        fs::write(&path, "[cd]\nfiles = [\"a.txt\"]\n").unwrap();

        let config = load_cd_config(&path).unwrap();

        assert_eq!(config.files, [temp.path().join("a.txt")]);
        assert_eq!(config.label, None);
        assert_eq!(config.output, None);
    }
}
