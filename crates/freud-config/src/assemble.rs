//! The layered assembly pipeline turning a descriptor into a [`Config`].
//!
//! Layers are merged in a fixed order: built-in defaults, the descriptor's
//! top-level keys, the selected stage overlay and finally the computed
//! overrides. The merged tree is validated before any interpolation happens.
//! Variables are then seeded from the environment snapshot held by the
//! [`AssemblyContext`], so assembly never reads ambient process state once
//! the context exists.

use std::collections::BTreeMap;
use std::env;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::Config;
use crate::defaults::{DEFAULT_STAGE, defaults, overrides};
use crate::descriptor::load_descriptor;
use crate::errors::ConfigError;
use crate::merge::{deep_merge, snakify_keys};
use crate::paths::expand_path;
use crate::pidfile::Pidfile;
use crate::validate::validate;
use crate::variables::{VariableStore, unescape};

const CONFIG_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::assemble");
const LAUNCHER_FALLBACK: &str = "freud";

/// Inputs to assembly besides the descriptor tree itself.
#[derive(Debug, Clone)]
pub struct AssemblyContext {
    descriptor: Utf8PathBuf,
    stage: String,
    environment: BTreeMap<String, String>,
    launcher: Utf8PathBuf,
    working_dir: Utf8PathBuf,
}

impl AssemblyContext {
    /// Builds a context for `descriptor` and `stage`.
    ///
    /// The working directory and launcher path are captured from the running
    /// process. The environment snapshot starts empty; supply one with
    /// [`Self::with_environment`].
    #[must_use]
    pub fn new(descriptor: impl Into<Utf8PathBuf>, stage: impl Into<String>) -> Self {
        let working_dir = env::current_dir()
            .ok()
            .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
            .unwrap_or_else(|| Utf8PathBuf::from("/"));
        let launcher = env::current_exe()
            .ok()
            .and_then(|exe| Utf8PathBuf::from_path_buf(exe).ok())
            .unwrap_or_else(|| Utf8PathBuf::from(LAUNCHER_FALLBACK));
        Self {
            descriptor: descriptor.into(),
            stage: stage.into(),
            environment: BTreeMap::new(),
            launcher,
            working_dir,
        }
    }

    /// Replaces the environment snapshot used to seed variables.
    #[must_use]
    pub fn with_environment<I, K, V>(mut self, environment: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.environment = environment
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        self
    }

    /// Overrides the path bound to `%self`.
    #[must_use]
    pub fn with_launcher(mut self, launcher: impl Into<Utf8PathBuf>) -> Self {
        self.launcher = launcher.into();
        self
    }

    /// Overrides the directory relative descriptor paths resolve against.
    #[must_use]
    pub fn with_working_dir(mut self, working_dir: impl Into<Utf8PathBuf>) -> Self {
        self.working_dir = working_dir.into();
        self
    }

    /// Absolute descriptor path.
    #[must_use]
    pub fn descriptor(&self) -> Utf8PathBuf {
        expand_path(self.descriptor.as_str(), &self.working_dir)
    }

    /// Selected stage.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Environment snapshot.
    #[must_use]
    pub const fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }
}

impl Default for AssemblyContext {
    fn default() -> Self {
        Self::new(Utf8PathBuf::new(), DEFAULT_STAGE)
    }
}

/// Reads the descriptor named by `context` and assembles it.
///
/// # Errors
///
/// Returns any [`ConfigError`] raised while reading or assembling.
pub fn load(context: &AssemblyContext) -> Result<Config, ConfigError> {
    let descriptor = load_descriptor(&context.descriptor())?;
    assemble(descriptor, context)
}

/// Assembles a parsed descriptor into a resolved configuration.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownStage`] when the stage is not declared,
/// [`ConfigError::Validation`] for mistyped fields and
/// [`ConfigError::Interpolation`] when a template cannot be expanded.
pub fn assemble(
    descriptor: Map<String, Value>,
    context: &AssemblyContext,
) -> Result<Config, ConfigError> {
    let descriptor_path = context.descriptor();
    let descriptor_dir = descriptor_path
        .parent()
        .map_or_else(|| context.working_dir.clone(), Utf8Path::to_path_buf);

    let mut base = deep_merge(
        defaults(&descriptor_path, &descriptor_dir),
        snakify_keys(descriptor),
    );
    let overlay = select_stage(&mut base, &context.stage)?;
    let staged = deep_merge(base, overlay);
    let tree = deep_merge(staged, overrides(&context.stage, &descriptor_path));
    validate(&tree)?;

    let name = text(&tree, "name").unwrap_or_default();
    let mut variables = VariableStore::new();
    variables
        .bind(context.environment.clone())
        .set("name", name.clone())
        .set("self", context.launcher.as_str())
        .bind(string_map(&tree, "vars"));

    let root = expand_path(&text(&tree, "root").unwrap_or_default(), &descriptor_dir);
    variables.set("root", root.as_str());

    let pidfile_path = expand_path(&interpolate(&variables, "pidfile", &tree)?, &root);
    variables.set("pidfile", pidfile_path.as_str());
    let pidfile = Pidfile::new(pidfile_path);

    let sudo_user = match tree.get("sudo_user") {
        Some(_) => {
            let user = interpolate(&variables, "sudo_user", &tree)?;
            variables.set("sudo_user", user.as_str());
            Some(user).filter(|login| !login.is_empty())
        }
        None => None,
    };

    let logfile = match tree.get("logfile") {
        Some(_) => {
            let path = expand_path(&interpolate(&variables, "logfile", &tree)?, &root);
            variables.set("logfile", path.as_str());
            Some(path)
        }
        None => None,
    };

    if let Some(pid) = pidfile.read() {
        variables.set("pid", pid.to_string());
    }

    let env = interpolate_map(&variables, "env", &tree)?;
    let commands = interpolate_map(&variables, "commands", &tree)?;

    let config = Config {
        name,
        stage: context.stage.clone(),
        descriptor: descriptor_path,
        root,
        background: flag(&tree, "background"),
        create_pidfile: flag(&tree, "create_pidfile"),
        reset_env: flag(&tree, "reset_env"),
        pidfile,
        logfile,
        sudo_user,
        env,
        commands,
        variables,
    };
    debug!(
        target: CONFIG_TARGET,
        name = config.name(),
        stage = config.stage(),
        root = %config.root(),
        pidfile = %config.pidfile(),
        "configuration assembled"
    );
    Ok(config)
}

/// Removes `stages` from the tree and returns the normalised overlay for
/// `stage`.
fn select_stage(tree: &mut Map<String, Value>, stage: &str) -> Result<Map<String, Value>, ConfigError> {
    let mut stages = match tree.remove("stages") {
        Some(Value::Object(stages)) => snakify_keys(stages),
        Some(_) => {
            return Err(ConfigError::Validation {
                key: "stages".to_owned(),
                expected: "a mapping",
            });
        }
        None => Map::new(),
    };
    match stages.remove(stage) {
        Some(Value::Object(overlay)) => Ok(snakify_keys(overlay)),
        Some(_) => Err(ConfigError::Validation {
            key: format!("stages.{stage}"),
            expected: "a mapping",
        }),
        None => Err(ConfigError::UnknownStage {
            stage: stage.to_owned(),
            available: stages.keys().cloned().collect(),
        }),
    }
}

fn text(tree: &Map<String, Value>, key: &str) -> Option<String> {
    tree.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn flag(tree: &Map<String, Value>, key: &str) -> bool {
    tree.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn string_map(tree: &Map<String, Value>, key: &str) -> BTreeMap<String, String> {
    tree.get(key)
        .and_then(Value::as_object)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(name, value)| value.as_str().map(|text| (name.clone(), text.to_owned())))
                .collect()
        })
        .unwrap_or_default()
}

fn interpolate(
    variables: &VariableStore,
    key: &str,
    tree: &Map<String, Value>,
) -> Result<String, ConfigError> {
    let template = text(tree, key).unwrap_or_default();
    variables
        .apply(&template)
        .map_err(|source| ConfigError::Interpolation {
            key: key.to_owned(),
            source,
        })
}

fn interpolate_map(
    variables: &VariableStore,
    key: &str,
    tree: &Map<String, Value>,
) -> Result<BTreeMap<String, String>, ConfigError> {
    string_map(tree, key)
        .into_iter()
        .map(|(name, template)| {
            if !variables.test(&template) {
                return Ok((name, unescape(&template)));
            }
            let value = variables
                .apply(&template)
                .map_err(|source| ConfigError::Interpolation {
                    key: format!("{key}.{name}"),
                    source,
                })?;
            Ok((name, value))
        })
        .collect()
}
