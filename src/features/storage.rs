use std::path::{Path, PathBuf};

pub fn parse_file_uri_path(uri: &str) -> Option<PathBuf> {
    if let Some(rest) = uri.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    if uri.starts_with('/') {
        return Some(PathBuf::from(uri));
    }
    None
}

/// Location of the named database. Absolute names are used as-is, matching
/// `Context.getDatabasePath`.
pub fn database_path(database_dir: &Path, db_name: &str) -> Result<PathBuf, String> {
    let name = db_name.trim();
    if name.is_empty() {
        return Err("db_name_empty".into());
    }
    if name.starts_with('/') {
        return Ok(PathBuf::from(name));
    }
    if name.contains('/') {
        return Err("db_name_contains_separator".into());
    }
    Ok(database_dir.join(name))
}

/// Directory under the app's files dir for generated images, created on
/// demand.
pub fn output_dir(files_dir: &Path, sub_dir: &str) -> Result<PathBuf, String> {
    let dir = files_dir.join(sub_dir);
    std::fs::create_dir_all(&dir).map_err(|e| format!("output_dir_create_failed:{e}"))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_uris_and_absolute_paths_parse() {
        assert_eq!(
            parse_file_uri_path("file:///a/b.png"),
            Some(PathBuf::from("/a/b.png"))
        );
        assert_eq!(parse_file_uri_path("/a/b.png"), Some(PathBuf::from("/a/b.png")));
        assert_eq!(parse_file_uri_path("content://media/1"), None);
    }

    #[test]
    fn database_names_resolve_under_dir() {
        let dir = Path::new("/data/user/0/com.ox/databases");
        assert_eq!(database_path(dir, "chat.db").unwrap(), dir.join("chat.db"));
        assert_eq!(
            database_path(dir, "/tmp/other.db").unwrap(),
            PathBuf::from("/tmp/other.db")
        );
        assert!(database_path(dir, " ").is_err());
        assert!(database_path(dir, "../x.db").is_err());
    }

    #[test]
    fn output_dir_is_created() {
        let root = tempdir().unwrap();
        let dir = output_dir(root.path(), "ox_pic").unwrap();
        assert!(dir.is_dir());
        assert_eq!(dir, root.path().join("ox_pic"));
    }
}
