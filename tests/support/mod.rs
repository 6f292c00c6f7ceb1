#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use nkllon::{Cli, ErrorCode};
use tempfile::{TempDir, tempdir};

pub const ONTOLOGY: &str = include_str!("../../ontology/hardware_ontology.ttl");
pub const SHAPES: &str = include_str!("../../ontology/system_constraints.shacl.ttl");
pub const DEPLOYMENT: &str = include_str!("../../data/physical_deployment.ttl");
pub const DEV_DEPLOYMENT: &str = include_str!("../../data/deployments/dev.ttl");
pub const STAGING_DEPLOYMENT: &str = include_str!("../../data/deployments/staging.ttl");

/// Path of a file shipped with the crate.
pub fn shipped(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(relative)
}

/// A throwaway project directory laid out like the shipped one.
pub struct ScratchProject {
    dir: TempDir,
}

impl ScratchProject {
    /// Project holding the shipped ontology, shapes and production data.
    pub fn shipped() -> Result<Self> {
        Self::with_deployment(DEPLOYMENT)
    }

    pub fn with_deployment(deployment: &str) -> Result<Self> {
        let project = Self { dir: tempdir()? };
        project.write("ontology/hardware_ontology.ttl", ONTOLOGY)?;
        project.write("ontology/system_constraints.shacl.ttl", SHAPES)?;
        project.write("data/physical_deployment.ttl", deployment)?;
        Ok(project)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Run the CLI against this project and capture stdout.
    pub fn run(&self, args: &[&str]) -> Result<(ErrorCode, String)> {
        let root = self.root().to_string_lossy().into_owned();
        let mut argv = vec!["nkllon", "--project-root", root.as_str()];
        argv.extend_from_slice(args);
        run_cli(&argv)
    }
}

/// Parse `argv` and run it, capturing stdout.
pub fn run_cli(argv: &[&str]) -> Result<(ErrorCode, String)> {
    let cli = Cli::try_parse_from(argv)?;
    let mut out = Vec::new();
    let code = nkllon::run(&cli, &mut out);
    Ok((code, String::from_utf8(out)?))
}

/// The production deployment with `from` replaced by `to`; panics if `from`
/// is absent so a stale fixture cannot pass silently.
pub fn deployment_with(from: &str, to: &str) -> String {
    assert!(DEPLOYMENT.contains(from), "fixture text not found: {from}");
    DEPLOYMENT.replacen(from, to, 1)
}
