//! ISO image command resolution.
//!
//! Picks one external ISO authoring tool for a host and builds its exact
//! argument vector. Nothing here touches the filesystem or spawns a process:
//! [`resolve`] is a pure function of the target paths and a
//! [`HostEnvironment`] snapshot, and [`crate::process::execute`] runs the
//! result.
//!
//! Resolution order (first available wins):
//! 1. `oscdimg` on Windows
//! 2. `xorriso.exe` from an MSYS2/Cygwin layer on Windows (POSIX paths)
//! 3. `hdiutil makehybrid` on macOS
//! 4. `xorriso`, `mkisofs` or `genisoimage` on `PATH`

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::artifact::posix_path::{PathSyntax, PathTranslator};
use crate::error::Result;
use crate::preflight::{tool_not_found, HostEnvironment, HostOs};

/// Volume label used when the caller does not set one.
pub const DEFAULT_LABEL: &str = "CDROM";

/// Flags making `xorriso` behave like `genisoimage` with Rock Ridge and Joliet.
const XORRISO_GENISO_FLAGS: &[&str] = &["-as", "genisoimage", "-rock", "-joliet"];

/// Options for building a CD image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoOptions {
    /// Volume label written into the image.
    pub label: String,
}

impl Default for IsoOptions {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
        }
    }
}

/// A fully built tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

/// Supported ISO creation tools, each carrying its located executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolKind {
    /// Windows ADK `oscdimg`.
    Oscdimg(PathBuf),
    /// `xorriso` inside an MSYS2/Cygwin installation.
    PosixLayerXorriso(PathBuf),
    /// macOS `hdiutil`.
    Hdiutil(PathBuf),
    /// `xorriso` running in genisoimage emulation mode.
    Xorriso(PathBuf),
    /// `mkisofs` or its fork `genisoimage`; both take the same flags.
    Mkisofs(PathBuf),
}

impl ToolKind {
    /// Pick the first tool available on `host`.
    pub fn select(host: &HostEnvironment) -> Option<Self> {
        if host.os == HostOs::Windows {
            if let Some(path) = host.tool("oscdimg") {
                return Some(ToolKind::Oscdimg(path.to_path_buf()));
            }
            if let Some(layer) = &host.posix_layer {
                return Some(ToolKind::PosixLayerXorriso(layer.xorriso()));
            }
        }

        if host.os == HostOs::MacOs {
            if let Some(path) = host.tool("hdiutil") {
                return Some(ToolKind::Hdiutil(path.to_path_buf()));
            }
        }

        if let Some(path) = host.tool("xorriso") {
            return Some(ToolKind::Xorriso(path.to_path_buf()));
        }

        ["mkisofs", "genisoimage"]
            .iter()
            .find_map(|tool| host.tool(tool))
            .map(|path| ToolKind::Mkisofs(path.to_path_buf()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Oscdimg(_) => "oscdimg",
            ToolKind::PosixLayerXorriso(_) => "xorriso (POSIX layer)",
            ToolKind::Hdiutil(_) => "hdiutil",
            ToolKind::Xorriso(_) => "xorriso",
            ToolKind::Mkisofs(_) => "mkisofs",
        }
    }

    pub fn program(&self) -> &Path {
        match self {
            ToolKind::Oscdimg(p)
            | ToolKind::PosixLayerXorriso(p)
            | ToolKind::Hdiutil(p)
            | ToolKind::Xorriso(p)
            | ToolKind::Mkisofs(p) => p,
        }
    }

    /// Path syntax the tool expects for its file arguments.
    pub fn path_syntax(&self) -> PathSyntax {
        match self {
            ToolKind::PosixLayerXorriso(_) => PathSyntax::Posix,
            _ => PathSyntax::Native,
        }
    }

    /// Build the invocation that packs `staging` into `output`.
    pub fn command(
        &self,
        output: &Path,
        staging: &Path,
        options: &IsoOptions,
    ) -> Result<ResolvedCommand> {
        let label = options.label.as_str();
        let args: Vec<OsString> = match self {
            ToolKind::Oscdimg(_) => vec![
                "-j1".into(),
                "-o".into(),
                "-m".into(),
                format!("-l{}", label).into(),
                staging.into(),
                output.into(),
            ],
            ToolKind::PosixLayerXorriso(_) => {
                let translator = PathTranslator::Syntax;
                let output = translator.translate(&output.to_string_lossy(), PathSyntax::Posix)?;
                let staging =
                    translator.translate(&staging.to_string_lossy(), PathSyntax::Posix)?;
                let mut args = os_args(XORRISO_GENISO_FLAGS);
                args.extend(os_args(&["-volid", label, "-output", &output, &staging]));
                args
            }
            ToolKind::Hdiutil(_) => {
                let mut args = os_args(&["makehybrid", "-o"]);
                args.push(output.into());
                args.extend(os_args(&[
                    "-hfs",
                    "-joliet",
                    "-iso",
                    "-default-volume-name",
                    label,
                ]));
                args.push(staging.into());
                args
            }
            ToolKind::Xorriso(_) => {
                let mut args = os_args(XORRISO_GENISO_FLAGS);
                args.extend(os_args(&["-volid", label, "-output"]));
                args.push(output.into());
                args.push(staging.into());
                args
            }
            ToolKind::Mkisofs(_) => {
                let mut args = os_args(&["-rock", "-joliet", "-volid", label, "-o"]);
                args.push(output.into());
                args.push(staging.into());
                args
            }
        };

        Ok(ResolvedCommand {
            program: self.program().to_path_buf(),
            args,
        })
    }
}

fn os_args(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}

/// Resolve the command that creates `output` from the contents of `staging`.
///
/// # Example
///
/// ```rust
/// use cdrom_builder::artifact::iso::{resolve, IsoOptions};
/// use cdrom_builder::preflight::{HostEnvironment, HostOs};
/// use std::path::Path;
///
/// let host = HostEnvironment::new(HostOs::Linux).with_tool("xorriso", "/usr/bin/xorriso");
/// let cmd = resolve(
///     Path::new("/tmp/cd.iso"),
///     Path::new("/tmp/cd"),
///     &host,
///     &IsoOptions::default(),
/// )
/// .unwrap();
/// assert_eq!(cmd.args.last().unwrap(), "/tmp/cd");
/// ```
pub fn resolve(
    output: &Path,
    staging: &Path,
    host: &HostEnvironment,
    options: &IsoOptions,
) -> Result<ResolvedCommand> {
    let tool = ToolKind::select(host).ok_or_else(tool_not_found)?;
    tool.command(output, staging, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepError;
    use crate::preflight::PosixLayer;

    fn args(cmd: &ResolvedCommand) -> Vec<String> {
        cmd.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn windows_msys() -> HostEnvironment {
        HostEnvironment::new(HostOs::Windows).with_posix_layer(PosixLayer::new(r"C:\msys64"))
    }

    #[test]
    fn test_posix_layer_destination_then_source() {
        let cmd = resolve(
            Path::new(r"C:\Windows\Temp\test-cd.iso"),
            Path::new(r"C:\Windows\Temp\test-cd"),
            &windows_msys(),
            &IsoOptions {
                label: "test".into(),
            },
        )
        .unwrap();

        assert!(cmd
            .program
            .to_string_lossy()
            .ends_with(r"\usr\bin\xorriso.exe"));
        let args = args(&cmd);
        assert!(args.len() >= 2);
        assert_eq!(args[args.len() - 2], "/c/Windows/Temp/test-cd.iso");
        assert_eq!(args[args.len() - 1], "/c/Windows/Temp/test-cd");
        assert!(args.windows(2).any(|w| w == ["-volid", "test"]));
    }

    #[test]
    fn test_posix_layer_rejects_drive_relative_paths() {
        let err = resolve(
            Path::new("C:cd.iso"),
            Path::new(r"C:\stage"),
            &windows_msys(),
            &IsoOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, StepError::UnsupportedPath { .. }));
    }

    #[test]
    fn test_oscdimg_preferred_on_windows() {
        let host = windows_msys().with_tool("oscdimg", r"C:\adk\oscdimg.exe");
        let cmd = resolve(
            Path::new(r"C:\out\cd.iso"),
            Path::new(r"C:\stage"),
            &host,
            &IsoOptions::default(),
        )
        .unwrap();
        assert_eq!(cmd.program, PathBuf::from(r"C:\adk\oscdimg.exe"));
        assert_eq!(
            args(&cmd),
            ["-j1", "-o", "-m", "-lCDROM", r"C:\stage", r"C:\out\cd.iso"]
        );
    }

    #[test]
    fn test_hdiutil_on_macos() {
        let host = HostEnvironment::new(HostOs::MacOs)
            .with_tool("hdiutil", "/usr/bin/hdiutil")
            .with_tool("xorriso", "/opt/homebrew/bin/xorriso");
        let cmd = resolve(
            Path::new("/tmp/cd.iso"),
            Path::new("/tmp/cd"),
            &host,
            &IsoOptions::default(),
        )
        .unwrap();
        assert_eq!(
            args(&cmd),
            [
                "makehybrid",
                "-o",
                "/tmp/cd.iso",
                "-hfs",
                "-joliet",
                "-iso",
                "-default-volume-name",
                "CDROM",
                "/tmp/cd"
            ]
        );
    }

    #[test]
    fn test_hdiutil_ignored_off_macos() {
        let host = HostEnvironment::new(HostOs::Linux)
            .with_tool("hdiutil", "/usr/bin/hdiutil")
            .with_tool("genisoimage", "/usr/bin/genisoimage");
        assert_eq!(
            ToolKind::select(&host),
            Some(ToolKind::Mkisofs(PathBuf::from("/usr/bin/genisoimage")))
        );
    }

    #[test]
    fn test_linux_tool_preference() {
        let host = HostEnvironment::new(HostOs::Linux)
            .with_tool("genisoimage", "/usr/bin/genisoimage")
            .with_tool("mkisofs", "/usr/bin/mkisofs");
        assert_eq!(
            ToolKind::select(&host),
            Some(ToolKind::Mkisofs(PathBuf::from("/usr/bin/mkisofs")))
        );

        let host = host.with_tool("xorriso", "/usr/bin/xorriso");
        let cmd = resolve(
            Path::new("/tmp/cd.iso"),
            Path::new("/tmp/cd"),
            &host,
            &IsoOptions::default(),
        )
        .unwrap();
        assert_eq!(cmd.program, PathBuf::from("/usr/bin/xorriso"));
        assert_eq!(
            args(&cmd),
            [
                "-as",
                "genisoimage",
                "-rock",
                "-joliet",
                "-volid",
                "CDROM",
                "-output",
                "/tmp/cd.iso",
                "/tmp/cd"
            ]
        );
    }

    #[test]
    fn test_mkisofs_args() {
        let cmd = ToolKind::Mkisofs(PathBuf::from("/usr/bin/mkisofs"))
            .command(
                Path::new("/tmp/cd.iso"),
                Path::new("/tmp/cd"),
                &IsoOptions {
                    label: "cidata".into(),
                },
            )
            .unwrap();
        assert_eq!(
            args(&cmd),
            ["-rock", "-joliet", "-volid", "cidata", "-o", "/tmp/cd.iso", "/tmp/cd"]
        );
    }

    #[test]
    fn test_no_tool_found() {
        let host = HostEnvironment::new(HostOs::Windows);
        let err = resolve(
            Path::new(r"C:\cd.iso"),
            Path::new(r"C:\cd"),
            &host,
            &IsoOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, StepError::ToolNotFound { .. }));
    }
}
