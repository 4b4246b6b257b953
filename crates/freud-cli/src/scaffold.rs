//! Writes a starter descriptor for a new service.

use std::fs::OpenOptions;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use freud_config::defaults::service_name;

use crate::errors::AppError;

const SCAFFOLD: &str = r#"{
    "name": {name},
    "root": {root},
    "background": false,
    "create_pidfile": false,
    "reset_env": false,
    "pidfile": "tmp/%name.pid",
    "logfile": "log/%name.log",
    "vars": {},
    "env": {},
    "stages": {
        "development": {},
        "production": {}
    },
    "commands": {
        "start": "/bin/false",
        "stop": "%self @signal-term && %self @wait-down",
        "restart": "%self stop && %self start",
        "reload": "%self @signal-hup",
        "kill": "%self @signal-kill",
        "status": "%self @check"
    }
}
"#;

/// Creates a descriptor at `target`, resolved against `working_dir`.
///
/// The service root is the working directory and the name is the file stem.
/// Existing files are never overwritten.
pub(crate) fn generate(target: &str, working_dir: &Utf8Path) -> Result<Utf8PathBuf, AppError> {
    let file = if target.ends_with(".json") {
        target.to_owned()
    } else {
        format!("{target}.json")
    };
    let path = working_dir.join(file);
    let name = service_name(&path);
    let body = SCAFFOLD
        .replacen("{name}", &quote(&name)?, 1)
        .replacen("{root}", &quote(working_dir.as_str())?, 1);

    let mut handle = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|source| match source.kind() {
            io::ErrorKind::AlreadyExists => AppError::ScaffoldExists { path: path.clone() },
            _ => AppError::WriteScaffold {
                path: path.clone(),
                source,
            },
        })?;
    handle
        .write_all(body.as_bytes())
        .map_err(|source| AppError::WriteScaffold {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

fn quote(value: &str) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(AppError::Render)
}

#[cfg(test)]
mod tests {
    use super::*;
    use freud_config::{AssemblyContext, load};
    use rstest::{fixture, rstest};
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    struct Scratch {
        _temp: TempDir,
        root: Utf8PathBuf,
    }

    #[fixture]
    fn scratch() -> Scratch {
        let temp = TempDir::new().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp dir");
        Scratch { _temp: temp, root }
    }

    #[rstest]
    fn writes_parseable_descriptor(scratch: Scratch) {
        let path = generate("monkey", &scratch.root).expect("generate descriptor");
        assert_eq!(path, scratch.root.join("monkey.json"));

        let text = fs::read_to_string(&path).expect("read descriptor");
        let value: Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(value.get("name").and_then(Value::as_str), Some("monkey"));
        assert_eq!(
            value.get("root").and_then(Value::as_str),
            Some(scratch.root.as_str())
        );
    }

    #[rstest]
    fn scaffold_assembles_into_a_config(scratch: Scratch) {
        let path = generate("monkey.json", &scratch.root).expect("generate descriptor");
        let config = load(&AssemblyContext::new(path, "production")).expect("load scaffold");
        assert_eq!(config.pidfile().path(), scratch.root.join("tmp/monkey.pid").as_path());
        assert_eq!(config.command("start"), Some("/bin/false"));
    }

    #[rstest]
    fn refuses_to_overwrite(scratch: Scratch) {
        let existing = scratch.root.join("monkey.json");
        fs::write(&existing, "keep").expect("write file");
        let result = generate("monkey", &scratch.root);
        let Err(AppError::ScaffoldExists { path }) = result else {
            panic!("expected refusal, got {result:?}");
        };
        assert_eq!(path, existing);
        assert_eq!(fs::read_to_string(&existing).expect("read file"), "keep");
    }
}
