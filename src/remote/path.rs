//! Remote path utilities
//!
//! Remote paths always use `/`. The session path may start with `~`, which
//! must stay unquoted in shell commands so the remote shell expands it.

/// Check if a remote path is absolute.
pub fn is_absolute_remote_path(path: &str) -> bool {
    path.starts_with('/')
}

/// Check if a remote path is relative to the login directory (`~`, `~/...`).
pub fn is_home_relative(path: &str) -> bool {
    path == "~" || path.starts_with("~/")
}

/// Join remote path components using `/` separator.
pub fn join_remote_path(base: &str, component: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, component)
    } else {
        format!("{}/{}", base, component)
    }
}

/// Join a user-supplied component onto the session path.
///
/// An absolute or home-relative component replaces the base, the way a shell
/// `cd` would resolve it. Trailing slashes on the component are dropped so
/// `cd logs/` and `cd logs` land on the same session path.
pub fn join_session_path(base: &str, component: &str) -> String {
    let component = match component.trim_end_matches('/') {
        "" if component.starts_with('/') => "/",
        trimmed => trimmed,
    };

    if is_absolute_remote_path(component) || is_home_relative(component) {
        component.to_string()
    } else {
        join_remote_path(base, component)
    }
}

/// Quote a string for a POSIX shell: wrap in single quotes, escape embedded ones.
pub fn shell_escape(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Quote a remote path, leaving a leading `~` or `~/` outside the quotes.
pub fn quote_remote_path(path: &str) -> String {
    if path == "~" {
        return "~".to_string();
    }
    match path.strip_prefix("~/") {
        Some("") => "~/".to_string(),
        Some(rest) => format!("~/{}", shell_escape(rest)),
        None => shell_escape(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_absolute_remote_path() {
        assert!(is_absolute_remote_path("/home/user"));
        assert!(is_absolute_remote_path("/"));
        assert!(!is_absolute_remote_path("relative/path"));
        assert!(!is_absolute_remote_path("~/docs"));
    }

    #[test]
    fn test_join_remote_path() {
        assert_eq!(join_remote_path("/home", "file.txt"), "/home/file.txt");
        assert_eq!(join_remote_path("/home/", "file.txt"), "/home/file.txt");
        assert_eq!(join_remote_path("/", "home"), "/home");
    }

    #[test]
    fn test_join_session_path() {
        assert_eq!(join_session_path("~", "projects"), "~/projects");
        assert_eq!(join_session_path("~/projects", "api/"), "~/projects/api");
        assert_eq!(join_session_path("~/projects", "/var/log"), "/var/log");
        assert_eq!(join_session_path("/srv", "~"), "~");
        assert_eq!(join_session_path("/srv", "/"), "/");
        // No normalisation: `..` is kept and resolved remotely
        assert_eq!(join_session_path("~/a", ".."), "~/a/..");
    }

    #[test]
    fn test_shell_escape() {
        assert_eq!(shell_escape("plain"), "'plain'");
        assert_eq!(shell_escape("it's"), "'it'\\''s'");
        assert_eq!(shell_escape("a; rm -rf /"), "'a; rm -rf /'");
    }

    #[test]
    fn test_quote_remote_path_keeps_tilde_expandable() {
        assert_eq!(quote_remote_path("~"), "~");
        assert_eq!(quote_remote_path("~/"), "~/");
        assert_eq!(quote_remote_path("~/my docs"), "~/'my docs'");
        assert_eq!(quote_remote_path("/tmp/$(id)"), "'/tmp/$(id)'");
        // `~user` is not special-cased
        assert_eq!(quote_remote_path("~root"), "'~root'");
    }
}
