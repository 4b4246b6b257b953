//! Lexical path expansion used for `root`, `pidfile` and `logfile`.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Expands `path` to an absolute path.
///
/// Paths starting with `/` are kept; anything else is joined onto `base`.
/// The result is normalised lexically: `.` segments vanish and `..` removes
/// the preceding segment without touching the filesystem, so paths that do
/// not exist yet (a pidfile before the first start) expand predictably.
#[must_use]
pub fn expand_path(path: &str, base: &Utf8Path) -> Utf8PathBuf {
    let candidate = Utf8Path::new(path);
    if candidate.is_absolute() {
        normalise(candidate)
    } else {
        normalise(&base.join(candidate))
    }
}

/// Removes `.` and resolves `..` components lexically.
#[must_use]
pub fn normalise(path: &Utf8Path) -> Utf8PathBuf {
    let mut output = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match output.components().next_back() {
                Some(Utf8Component::Normal(_)) => {
                    output.pop();
                }
                Some(Utf8Component::RootDir | Utf8Component::Prefix(_)) => {}
                _ => output.push(".."),
            },
            other => output.push(other.as_str()),
        }
    }
    if output.as_str().is_empty() {
        output.push(".");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::current_dir(".", "/tmp", "/tmp")]
    #[case::parent_dir("../root", "/tmp", "/root")]
    #[case::absolute("/root", "/tmp", "/root")]
    #[case::relative("foo", "/tmp", "/tmp/foo")]
    #[case::nested_relative("tmp/./run/../app.pid", "/srv", "/srv/tmp/app.pid")]
    #[case::above_root("../../x", "/", "/x")]
    #[case::absolute_with_dots("/var/./log/../run", "/tmp", "/var/run")]
    fn expand_path_normalises(#[case] path: &str, #[case] base: &str, #[case] expected: &str) {
        assert_eq!(
            expand_path(path, Utf8Path::new(base)),
            Utf8PathBuf::from(expected)
        );
    }

    #[test]
    fn normalise_keeps_leading_parents_of_relative_paths() {
        assert_eq!(
            normalise(Utf8Path::new("../a/./b")),
            Utf8PathBuf::from("../a/b")
        );
        assert_eq!(normalise(Utf8Path::new("../..")), Utf8PathBuf::from("../.."));
    }
}
