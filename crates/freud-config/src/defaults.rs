//! Built-in defaults layered beneath every descriptor.

use camino::Utf8Path;
use serde_json::{Map, Value, json};

/// Stage used when neither the command line nor the environment names one.
pub const DEFAULT_STAGE: &str = "development";

/// Environment variable naming the descriptor when none is given.
pub const CONFIG_ENV_VAR: &str = "FREUD_CONFIG";

/// Environment variable naming the stage when none is given.
pub const STAGE_ENV_VAR: &str = "FREUD_STAGE";

/// Environment variable naming the directory searched for bare service names.
pub const SERVICE_PATH_ENV_VAR: &str = "FREUD_SERVICE_PATH";

/// Directory searched for bare service names when the variable is unset.
pub const DEFAULT_SERVICE_PATH: &str = "/etc/freud";

/// Pidfile template used when the descriptor does not set one.
pub const DEFAULT_PIDFILE: &str = "tmp/%name.pid";

/// Derives the service name from the descriptor file name.
#[must_use]
pub fn service_name(descriptor: &Utf8Path) -> String {
    descriptor
        .file_stem()
        .or_else(|| descriptor.file_name())
        .unwrap_or_default()
        .to_owned()
}

/// Verb templates installed when the descriptor omits them.
///
/// Each template re-enters the launcher through `%self`; the descriptor and
/// stage travel to the child via `FREUD_CONFIG` and `FREUD_STAGE`.
#[must_use]
pub fn default_commands() -> Map<String, Value> {
    let commands = json!({
        "stop": "%self @signal-term && %self @wait-down",
        "restart": "%self stop && %self start",
        "reload": "%self @signal-hup",
        "kill": "%self @signal-kill",
        "status": "%self @check",
    });
    into_map(commands)
}

/// Defaults computed from the descriptor's location.
#[must_use]
pub fn defaults(descriptor: &Utf8Path, descriptor_dir: &Utf8Path) -> Map<String, Value> {
    let tree = json!({
        "name": service_name(descriptor),
        "root": descriptor_dir.as_str(),
        "background": false,
        "create_pidfile": false,
        "reset_env": false,
        "pidfile": DEFAULT_PIDFILE,
        "vars": {},
        "env": {},
        "stages": { "development": {}, "production": {} },
        "commands": default_commands(),
    });
    into_map(tree)
}

/// Values forced on top of the descriptor and the selected stage.
#[must_use]
pub fn overrides(stage: &str, descriptor: &Utf8Path) -> Map<String, Value> {
    let tree = json!({
        "vars": { "stage": stage },
        "env": {
            STAGE_ENV_VAR: "%stage",
            CONFIG_ENV_VAR: descriptor.as_str(),
        },
    });
    into_map(tree)
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::with_extension("/srv/monkey.json", "monkey")]
    #[case::without_extension("/srv/monkey", "monkey")]
    #[case::dotted("/srv/my.app.json", "my.app")]
    fn service_name_strips_last_extension(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(service_name(Utf8Path::new(path)), expected);
    }

    #[test]
    fn defaults_declare_both_stages() {
        let tree = defaults(Utf8Path::new("/srv/monkey.json"), Utf8Path::new("/srv"));
        let stages = tree.get("stages").and_then(Value::as_object);
        let names: Vec<&str> = stages
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default();
        assert_eq!(names, vec!["development", "production"]);
    }

    #[test]
    fn default_commands_cover_lifecycle_verbs() {
        let commands = default_commands();
        for verb in ["stop", "restart", "reload", "kill", "status"] {
            let template = commands.get(verb).and_then(Value::as_str);
            assert!(
                template.is_some_and(|text| text.starts_with("%self ")),
                "missing default for {verb}"
            );
        }
    }
}
