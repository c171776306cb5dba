//! Confine untrusted game paths to the games directory.

use std::path::{Component, Path, PathBuf};

use crate::error::ArcadeError;

/// Resolve `relative` against `base_dir`, refusing anything that lands
/// outside it.
///
/// Leading `./` segments are stripped, the remainder is joined onto
/// `base_dir` and normalized lexically (`.` dropped, `..` pops one segment).
/// The result must lie strictly inside `base_dir`; `..` escapes and absolute
/// overrides fail with [`ArcadeError::PathTraversal`]. The filesystem is not
/// touched, so existence is the caller's concern.
pub fn resolve_game_path(base_dir: &Path, relative: &str) -> Result<PathBuf, ArcadeError> {
    let mut cleaned = relative;
    while let Some(rest) = cleaned.strip_prefix("./") {
        cleaned = rest;
    }
    if cleaned.is_empty() {
        return Err(ArcadeError::InvalidRequest("Missing game path".into()));
    }

    let base = normalize(base_dir);
    let full = normalize(&base.join(cleaned));

    if full == base || !full.starts_with(&base) {
        return Err(ArcadeError::PathTraversal(relative.to_string()));
    }
    Ok(full)
}

/// Lexical normalization: no symlink resolution, no filesystem access.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past the root is a no-op, matching path.resolve semantics.
                out.pop();
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PathBuf {
        PathBuf::from("/base")
    }

    #[test]
    fn resolves_dot_slash_prefix() {
        let p = resolve_game_path(&base(), "./games/a.py").expect("inside base");
        assert_eq!(p, PathBuf::from("/base/games/a.py"));
    }

    #[test]
    fn strips_repeated_dot_slash() {
        let p = resolve_game_path(&base(), "././././games/a.py").expect("inside base");
        assert_eq!(p, PathBuf::from("/base/games/a.py"));
    }

    #[test]
    fn rejects_parent_escape() {
        let err = resolve_game_path(&base(), "../../etc/passwd").unwrap_err();
        assert_eq!(err, ArcadeError::PathTraversal("../../etc/passwd".into()));
    }

    #[test]
    fn rejects_absolute_override() {
        let err = resolve_game_path(&base(), "/etc/passwd").unwrap_err();
        assert!(matches!(err, ArcadeError::PathTraversal(_)));
    }

    #[test]
    fn rejects_sibling_with_shared_prefix() {
        let err = resolve_game_path(&base(), "../base2/game.py").unwrap_err();
        assert!(matches!(err, ArcadeError::PathTraversal(_)));
    }

    #[test]
    fn allows_inner_parent_that_stays_inside() {
        let p = resolve_game_path(&base(), "games/sub/../b.py").expect("inside base");
        assert_eq!(p, PathBuf::from("/base/games/b.py"));
    }

    #[test]
    fn rejects_base_itself() {
        let err = resolve_game_path(&base(), "games/..").unwrap_err();
        assert!(matches!(err, ArcadeError::PathTraversal(_)));
    }

    #[test]
    fn rejects_empty_path() {
        let err = resolve_game_path(&base(), "./").unwrap_err();
        assert!(matches!(err, ArcadeError::InvalidRequest(_)));
    }

    #[test]
    fn normalizes_base_dir() {
        let p = resolve_game_path(Path::new("/srv/./arcade/"), "games/a.py").expect("inside");
        assert_eq!(p, PathBuf::from("/srv/arcade/games/a.py"));
    }
}
