//! ## path
//!
//! path utilities

use std::path::{Component, Path, PathBuf};

/// Absolutize `p` against `wrkdir`; `.` and `..` components are resolved
pub fn absolutize(wrkdir: &Path, p: &Path) -> PathBuf {
    let joined = if p.is_absolute() {
        p.to_path_buf()
    } else {
        wrkdir.join(p)
    };
    let mut absolute = PathBuf::from("/");
    for component in joined.components() {
        match component {
            Component::Normal(name) => absolute.push(name),
            Component::ParentDir => {
                absolute.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    absolute
}

/// Convert an absolute path inside a share to the relative path sent to the engine
pub fn to_share_relative(p: &Path) -> String {
    p.components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<String>>()
        .join("/")
}
