//! Native-to-POSIX path translation for tools running under MSYS2/Cygwin.
//!
//! Tools inside a POSIX emulation layer on Windows expect `/c/Windows/Temp`
//! where the host would write `C:\Windows\Temp`. Translation works on the
//! textual form of the path so it behaves identically on every host.

use std::path::PathBuf;

use crate::error::{Result, StepError};
use crate::process::Cmd;

/// Path syntax understood by an external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSyntax {
    /// The host's own path syntax; translation is the identity.
    Native,
    /// Forward slashes with drive letters mapped to `/x`.
    Posix,
}

impl PathSyntax {
    fn name(self) -> &'static str {
        match self {
            PathSyntax::Native => "native",
            PathSyntax::Posix => "POSIX",
        }
    }
}

/// How a translation is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathTranslator {
    /// Pure rewrite of the path text. No process, no filesystem access.
    Syntax,
    /// Ask the layer's own `cygpath` utility. Agrees with [`PathTranslator::Syntax`]
    /// on well-formed absolute paths.
    Utility(PathBuf),
}

impl PathTranslator {
    pub fn translate(&self, native: &str, target: PathSyntax) -> Result<String> {
        if target == PathSyntax::Native {
            return Ok(native.to_string());
        }
        match self {
            PathTranslator::Syntax => to_posix(native),
            PathTranslator::Utility(cygpath) => {
                let result = Cmd::new(cygpath).arg("-u").arg(native).run()?;
                let translated = result.stdout.trim_end_matches(['\r', '\n']);
                if translated.is_empty() {
                    return Err(unsupported(native, target));
                }
                Ok(translated.to_string())
            }
        }
    }
}

fn unsupported(path: &str, syntax: PathSyntax) -> StepError {
    StepError::UnsupportedPath {
        path: path.to_string(),
        syntax: syntax.name(),
    }
}

/// Rewrite a Windows path into MSYS2/Cygwin form.
///
/// `C:\a\b` becomes `/c/a/b` (a trailing separator is kept, so `D:\` is
/// `/d/`), `\\srv\share\x` becomes `//srv/share/x`, and
/// verbatim `\\?\` prefixes are stripped first. Paths without a drive are
/// only re-separated. Drive-relative paths (`C:foo`) are rejected because
/// their meaning depends on per-drive state the layer cannot see.
pub fn to_posix(native: &str) -> Result<String> {
    let path = if let Some(rest) = native.strip_prefix(r"\\?\UNC\") {
        format!(r"\\{}", rest)
    } else if let Some(rest) = native.strip_prefix(r"\\?\") {
        rest.to_string()
    } else {
        native.to_string()
    };

    let mut chars = path.chars();
    let drive = match (chars.next(), chars.next()) {
        (Some(letter), Some(':')) => Some(letter),
        _ => None,
    };

    let Some(letter) = drive else {
        return Ok(path.replace('\\', "/"));
    };

    if !letter.is_ascii_alphabetic() {
        return Err(unsupported(native, PathSyntax::Posix));
    }

    let rest = &path[2..];
    if !rest.is_empty() && !rest.starts_with(['\\', '/']) {
        return Err(unsupported(native, PathSyntax::Posix));
    }

    Ok(format!(
        "/{}{}",
        letter.to_ascii_lowercase(),
        rest.replace('\\', "/")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_paths() {
        assert_eq!(
            to_posix(r"C:\Windows\Temp\test-cd").unwrap(),
            "/c/Windows/Temp/test-cd"
        );
        assert_eq!(to_posix(r"D:\").unwrap(), "/d/");
        assert_eq!(to_posix(r"C:\Windows\Temp\").unwrap(), "/c/Windows/Temp/");
        assert_eq!(to_posix("E:").unwrap(), "/e");
        assert_eq!(to_posix("c:/mixed\\seps").unwrap(), "/c/mixed/seps");
    }

    #[test]
    fn test_unc_and_verbatim_prefixes() {
        assert_eq!(to_posix(r"\\srv\share\dir").unwrap(), "//srv/share/dir");
        assert_eq!(
            to_posix(r"\\?\C:\Users\me\cd.iso").unwrap(),
            "/c/Users/me/cd.iso"
        );
        assert_eq!(
            to_posix(r"\\?\UNC\srv\share\x").unwrap(),
            "//srv/share/x"
        );
    }

    #[test]
    fn test_paths_without_drive_are_reseparated() {
        assert_eq!(to_posix("/tmp/already").unwrap(), "/tmp/already");
        assert_eq!(to_posix(r"rel\dir").unwrap(), "rel/dir");
    }

    #[test]
    fn test_unrepresentable_paths() {
        assert!(matches!(
            to_posix("C:relative"),
            Err(StepError::UnsupportedPath { .. })
        ));
        assert!(to_posix(r"1:\nope").is_err());
    }

    #[test]
    fn test_native_target_is_identity() {
        let native = r"C:\Windows\Temp";
        assert_eq!(
            PathTranslator::Syntax
                .translate(native, PathSyntax::Native)
                .unwrap(),
            native
        );
    }

    #[test]
    fn test_utility_agrees_with_syntax_rule() {
        let Ok(cygpath) = which::which("cygpath") else {
            return;
        };
        let utility = PathTranslator::Utility(cygpath);
        for path in [
            r"C:\Windows\Temp\test-cd",
            r"C:\Windows\Temp\test-cd.iso",
            r"C:\Windows\Temp\",
            r"D:\",
        ] {
            assert_eq!(
                utility.translate(path, PathSyntax::Posix).unwrap(),
                PathTranslator::Syntax
                    .translate(path, PathSyntax::Posix)
                    .unwrap()
            );
        }
    }
}
