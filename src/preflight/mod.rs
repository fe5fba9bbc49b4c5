//! Host probing for ISO creation tools.
//!
//! [`HostEnvironment::probe`] is the only place that looks at the real host:
//! it searches `PATH` once and records what it found. Everything downstream
//! (command resolution in particular) is a pure function of the snapshot, so
//! tests build a [`HostEnvironment`] by hand instead of installing tools.
//!
//! # Example
//!
//! ```rust,no_run
//! use cdrom_builder::preflight::{check_image_tool, HostEnvironment};
//!
//! let host = HostEnvironment::probe();
//! if let Err(e) = check_image_tool(&host) {
//!     eprintln!("{}", e);
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::artifact::iso::ToolKind;
use crate::error::{Result, StepError};
use crate::process::Cmd;

/// Host operating system families that select different tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Windows,
    MacOs,
    Linux,
    Other,
}

impl HostOs {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => HostOs::Windows,
            "macos" => HostOs::MacOs,
            "linux" => HostOs::Linux,
            _ => HostOs::Other,
        }
    }
}

/// Image creation tools looked up on `PATH`.
///
/// Each tuple is (command_name, install_hint).
pub const IMAGE_TOOLS: &[(&str, &str)] = &[
    ("oscdimg", "Windows ADK Deployment Tools"),
    ("hdiutil", "ships with macOS"),
    ("xorriso", "xorriso"),
    ("mkisofs", "cdrtools"),
    ("genisoimage", "cdrkit"),
];

/// Utility whose presence on `PATH` marks an MSYS2/Cygwin installation.
pub const POSIX_LAYER_PROBE: &str = "cygpath";

/// An MSYS2/Cygwin installation on a Windows host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosixLayer {
    /// Native path of the layer's root, e.g. `C:\msys64`.
    pub root: String,
}

impl PosixLayer {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    /// Native path of the layer's `xorriso.exe`.
    pub fn xorriso(&self) -> PathBuf {
        let root = self.root.trim_end_matches(['\\', '/']);
        PathBuf::from(format!(r"{}\usr\bin\xorriso.exe", root))
    }
}

/// Snapshot of the tool-relevant state of a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    pub os: HostOs,
    tools: BTreeMap<String, PathBuf>,
    pub posix_layer: Option<PosixLayer>,
}

impl HostEnvironment {
    /// An empty snapshot: no tools, no emulation layer.
    pub fn new(os: HostOs) -> Self {
        Self {
            os,
            tools: BTreeMap::new(),
            posix_layer: None,
        }
    }

    pub fn with_tool(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.tools.insert(name.to_string(), path.into());
        self
    }

    pub fn with_posix_layer(mut self, layer: PosixLayer) -> Self {
        self.posix_layer = Some(layer);
        self
    }

    /// Located path of a tool found on `PATH`.
    pub fn tool(&self, name: &str) -> Option<&Path> {
        self.tools.get(name).map(PathBuf::as_path)
    }

    /// Probe the current host.
    pub fn probe() -> Self {
        let mut host = HostEnvironment::new(HostOs::current());

        for (tool, _) in IMAGE_TOOLS {
            if let Ok(path) = which::which(tool) {
                debug!(tool, path = %path.display(), "found image tool");
                host.tools.insert(tool.to_string(), path);
            }
        }

        if host.os == HostOs::Windows {
            host.posix_layer = probe_posix_layer();
        }

        host
    }
}

fn probe_posix_layer() -> Option<PosixLayer> {
    let cygpath = which::which(POSIX_LAYER_PROBE).ok()?;

    // cygpath lives in <root>\usr\bin; use that when the utility itself misbehaves.
    let root = match Cmd::new(&cygpath).args(["-w", "/"]).run() {
        Ok(result) if !result.stdout.trim().is_empty() => result.stdout.trim().to_string(),
        _ => cygpath
            .parent()?
            .parent()?
            .parent()?
            .to_string_lossy()
            .into_owned(),
    };

    let layer = PosixLayer::new(root);
    if !layer.xorriso().is_file() {
        debug!(root = %layer.root, "POSIX layer has no xorriso, ignoring");
        return None;
    }
    Some(layer)
}

/// Check that some supported image tool is available.
///
/// # Returns
///
/// * `Ok(ToolKind)` for the tool that will be used
/// * `Err(StepError::ToolNotFound)` listing every candidate and how to install it
pub fn check_image_tool(host: &HostEnvironment) -> Result<ToolKind> {
    ToolKind::select(host).ok_or_else(tool_not_found)
}

pub(crate) fn tool_not_found() -> StepError {
    let candidates = IMAGE_TOOLS
        .iter()
        .map(|(t, hint)| format!("  {} ({})", t, hint))
        .collect::<Vec<_>>()
        .join("\n");
    StepError::ToolNotFound { candidates }
}
