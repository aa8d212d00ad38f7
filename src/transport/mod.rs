//! Process transport — command lookup and local execution.

pub mod local;

use std::path::PathBuf;

/// Output from executing a command.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    /// Combined stdout and stderr, byte for byte
    pub output: Vec<u8>,
    /// Set when output capture or stdin delivery failed, or a signal ended the process
    pub error: Option<String>,
}

/// Resolve a command name against `$PATH`. Names containing a slash are
/// checked as paths directly.
pub fn lookup_command(name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    which::which(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_sh() {
        let path = lookup_command("sh").expect("sh on PATH");
        assert!(path.is_absolute() || path.to_string_lossy().contains('/'));
        assert!(path.ends_with("sh"));
    }

    #[test]
    fn test_lookup_missing() {
        assert!(lookup_command("opchain-definitely-not-installed").is_none());
        assert!(lookup_command("").is_none());
    }

    #[test]
    fn test_lookup_explicit_path() {
        let sh = lookup_command("sh").unwrap();
        let found = lookup_command(sh.to_str().unwrap()).unwrap();
        assert_eq!(found, sh);
        assert!(lookup_command("/nonexistent/bin/sh").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_lookup_skips_non_executable() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "data").unwrap();
        assert!(lookup_command(file.to_str().unwrap()).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_lookup_executable_script_by_path() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("provision");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let found = lookup_command(script.to_str().unwrap()).unwrap();
        assert!(found.ends_with("provision"));
    }
}
