//! Locates the descriptor named on the command line or in the environment.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use freud_config::defaults::{CONFIG_ENV_VAR, DEFAULT_SERVICE_PATH, SERVICE_PATH_ENV_VAR};

use crate::errors::AppError;

const DESCRIPTOR_EXTENSION: &str = ".json";

/// Resolves the descriptor path.
///
/// The explicit `file` wins over `FREUD_CONFIG`. Each candidate gains a
/// `.json` suffix when missing and is used when it exists relative to
/// `working_dir`; a bare name is then looked up in the service directory.
pub(crate) fn resolve_descriptor(
    file: Option<&str>,
    environment: &BTreeMap<String, String>,
    working_dir: &Utf8Path,
) -> Result<Utf8PathBuf, AppError> {
    let candidate = file
        .or_else(|| environment.get(CONFIG_ENV_VAR).map(String::as_str))
        .filter(|candidate| !candidate.is_empty())
        .ok_or(AppError::MissingDescriptor)?;

    let named = with_extension(candidate);
    let local = working_dir.join(&named);
    if local.is_file() {
        return Ok(local);
    }

    if !named.contains('/') {
        let service_dir = environment
            .get(SERVICE_PATH_ENV_VAR)
            .map_or(DEFAULT_SERVICE_PATH, String::as_str);
        let shared = Utf8Path::new(service_dir).join(&named);
        if shared.is_file() {
            return Ok(shared);
        }
    }

    Err(AppError::DescriptorNotFound { path: named })
}

fn with_extension(candidate: &str) -> String {
    if candidate.ends_with(DESCRIPTOR_EXTENSION) {
        candidate.to_owned()
    } else {
        format!("{candidate}{DESCRIPTOR_EXTENSION}")
    }
}
