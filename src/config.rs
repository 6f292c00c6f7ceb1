use crate::error::{Result, TopologyError};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};

pub const PROJECT_ROOT_ENV: &str = "NKLLON_PROJECT_ROOT";

const ONTOLOGY_DIR: &str = "ontology";
const DATA_DIR: &str = "data";
const DEPLOYMENTS_DIR: &str = "deployments";
const DEFAULT_ONTOLOGY_FILE: &str = "hardware_ontology.ttl";
const DEFAULT_SHACL_FILE: &str = "system_constraints.shacl.ttl";
const DEFAULT_DEPLOYMENT_FILE: &str = "physical_deployment.ttl";

/// Deployment environment selecting which topology snapshot is used
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    ValueEnum,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Staging,
    #[default]
    Prod,
}

/// Resolved locations of the ontology, shapes and deployment files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub project_root: PathBuf,
    ontology_file: PathBuf,
    shacl_file: PathBuf,
    deployment_file: PathBuf,
}

impl ProjectConfig {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ontology_file: PathBuf::from(DEFAULT_ONTOLOGY_FILE),
            shacl_file: PathBuf::from(DEFAULT_SHACL_FILE),
            deployment_file: PathBuf::from(DEFAULT_DEPLOYMENT_FILE),
        }
    }

    /// Resolve the project configuration.
    ///
    /// `cli_root` already carries the `NKLLON_PROJECT_ROOT` fallback because
    /// clap reads the environment variable for the flag. The config file is
    /// consulted next, then the working directory, then the crate directory.
    pub fn resolve(cli_root: Option<PathBuf>, config_file: Option<&Path>) -> Result<Self> {
        let file_config = match config_file {
            Some(path) => load_config_file(path)?,
            None => PartialConfig::default(),
        };

        let PartialConfig {
            project_root: file_root,
            ontology: file_ontology,
            shapes: file_shapes,
            deployment: file_deployment,
        } = file_config;

        let file_root = file_root.map(|root| match config_file.and_then(Path::parent) {
            Some(base) if root.is_relative() => base.join(root),
            _ => root,
        });

        let project_root = cli_root
            .or(file_root)
            .unwrap_or_else(default_project_root);

        let mut config = Self::new(project_root);
        if let Some(ontology) = file_ontology {
            config.ontology_file = ontology;
        }
        if let Some(shapes) = file_shapes {
            config.shacl_file = shapes;
        }
        if let Some(deployment) = file_deployment {
            config.deployment_file = deployment;
        }

        config.ensure_project_root()?;
        tracing::debug!(root = %config.project_root.display(), "resolved project root");
        Ok(config)
    }

    pub fn ensure_project_root(&self) -> Result<()> {
        if !self.project_root.exists() {
            return Err(TopologyError::configuration(format!(
                "project root {:?} does not exist",
                self.project_root
            )));
        }
        if !self.project_root.is_dir() {
            return Err(TopologyError::configuration(format!(
                "project root {:?} is not a directory",
                self.project_root
            )));
        }
        Ok(())
    }

    pub fn ontology_dir(&self) -> PathBuf {
        self.project_root.join(ONTOLOGY_DIR)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.project_root.join(DATA_DIR)
    }

    pub fn ontology_path(&self) -> PathBuf {
        self.resolve_in(&self.ontology_dir(), &self.ontology_file)
    }

    pub fn shacl_path(&self) -> PathBuf {
        self.resolve_in(&self.ontology_dir(), &self.shacl_file)
    }

    pub fn deployment_path(&self) -> PathBuf {
        self.resolve_in(&self.data_dir(), &self.deployment_file)
    }

    /// Deployment file for an environment, falling back to production when
    /// no per-environment snapshot exists.
    pub fn get_deployment_path(&self, environment: Environment) -> PathBuf {
        if environment == Environment::Prod {
            return self.deployment_path();
        }

        let env_file = self
            .data_dir()
            .join(DEPLOYMENTS_DIR)
            .join(format!("{environment}.ttl"));
        if env_file.exists() {
            return env_file;
        }

        tracing::warn!(
            %environment,
            missing = %env_file.display(),
            "no deployment snapshot for environment, using production data"
        );
        self.deployment_path()
    }

    fn resolve_in(&self, dir: &Path, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else if file.components().count() > 1 {
            self.project_root.join(file)
        } else {
            dir.join(file)
        }
    }
}

fn default_project_root() -> PathBuf {
    if let Ok(cwd) = std::env::current_dir()
        && cwd.join(ONTOLOGY_DIR).join(DEFAULT_ONTOLOGY_FILE).exists()
    {
        return cwd;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    project_root: Option<PathBuf>,
    ontology: Option<PathBuf>,
    shapes: Option<PathBuf>,
    deployment: Option<PathBuf>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        return Err(TopologyError::configuration(format!(
            "config file {:?} does not exist",
            path
        )));
    }
    let contents = fs::read_to_string(path).map_err(|e| {
        TopologyError::configuration(format!("failed to read config file {:?}: {e}", path))
    })?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
            TopologyError::configuration(format!("failed to parse YAML config {:?}: {e}", path))
        }),
        "json" => serde_json::from_str(&contents).map_err(|e| {
            TopologyError::configuration(format!("failed to parse JSON config {:?}: {e}", path))
        }),
        other => Err(TopologyError::configuration(format!(
            "unsupported config extension: {other}"
        ))),
    }
}
