use std::path::PathBuf;

/// The daemon binary is installed next to the CLI.
pub fn to_daemon_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name("typtel-daemon");
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::to_daemon_path;

    #[test]
    fn daemon_lives_next_to_cli() {
        let path = to_daemon_path(PathBuf::from("/usr/local/bin/typtel"));
        assert_eq!(path.parent(), Some(std::path::Path::new("/usr/local/bin")));
        assert!(path
            .file_stem()
            .is_some_and(|name| name == "typtel-daemon"));
    }
}
