//! POSIX shell helpers used to build the command lines sent to a host.

use crate::error::{Error, Result};
use crate::types::CommandOutput;

/// Exit status the read helper uses for "file does not exist".
pub const MISSING_FILE_EXIT: i32 = 44;

/// Quote a string for safe use as a single POSIX shell word.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Wrap a command with environment assignments and optional `sudo -n`.
///
/// With neither, the command is returned untouched so the login shell runs
/// it as written.
pub fn wrap(command: &str, env: &[(String, String)], sudo: bool) -> String {
    let mut parts: Vec<String> = Vec::new();

    if sudo {
        parts.push("sudo -n".to_string());
    }

    if !env.is_empty() {
        parts.push("env".to_string());
        for (key, value) in env {
            parts.push(format!("{key}={}", quote(value)));
        }
    }

    if parts.is_empty() {
        return command.to_string();
    }

    parts.push("sh -c".to_string());
    parts.push(quote(command));
    parts.join(" ")
}

/// Script that prints a file, exiting [`MISSING_FILE_EXIT`] when it is absent.
pub fn read_script(path: &str) -> String {
    let p = quote(path);
    format!("if [ -e {p} ]; then cat {p}; else exit {MISSING_FILE_EXIT}; fi")
}

/// Script that replaces a file with stdin via a sibling temp file and rename.
///
/// The new file is created with mode 0644, which is what every file under
/// `/etc/apt`, `/etc/tor` and `/lib/systemd/system` ships with.
pub fn write_script(path: &str) -> String {
    let p = quote(path);
    format!(
        "tmp=$(mktemp {p}.XXXXXX) && {{ cat > \"$tmp\" && chmod 0644 \"$tmp\" && mv -f \"$tmp\" {p}; }} \
         || {{ rc=$?; [ -n \"$tmp\" ] && rm -f \"$tmp\"; exit $rc; }}"
    )
}

/// Interpret the output of [`read_script`]: `None` when the file is absent.
pub fn read_result(path: &str, output: CommandOutput) -> Result<Option<String>> {
    match output.exit_code {
        0 => Ok(Some(output.stdout)),
        MISSING_FILE_EXIT => Ok(None),
        code => Err(Error::from_file_op(
            path,
            &format!("read {path}"),
            code,
            &output.stderr,
        )),
    }
}

/// Interpret the output of [`write_script`].
pub fn write_result(path: &str, output: &CommandOutput) -> Result<()> {
    if output.success() {
        return Ok(());
    }
    Err(Error::from_file_op(
        path,
        &format!("write {path}"),
        output.exit_code,
        &output.stderr,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_plain() {
        assert_eq!(quote("/etc/tor/torrc"), "'/etc/tor/torrc'");
    }

    #[test]
    fn test_quote_embedded_single_quote() {
        assert_eq!(quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn test_wrap_passthrough() {
        assert_eq!(wrap("apt-get update", &[], false), "apt-get update");
    }

    #[test]
    fn test_wrap_env() {
        let env = vec![("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string())];
        assert_eq!(
            wrap("apt-get upgrade -y", &env, false),
            "env DEBIAN_FRONTEND='noninteractive' sh -c 'apt-get upgrade -y'"
        );
    }

    #[test]
    fn test_wrap_sudo_and_env() {
        let env = vec![("A".to_string(), "b".to_string())];
        assert_eq!(
            wrap("whoami", &env, true),
            "sudo -n env A='b' sh -c 'whoami'"
        );
    }

    #[test]
    fn test_read_script_mentions_exit_code() {
        let script = read_script("/etc/os-release");
        assert!(script.contains("cat '/etc/os-release'"));
        assert!(script.contains(&format!("exit {MISSING_FILE_EXIT}")));
    }

    #[test]
    fn test_write_script_renames_into_place() {
        let script = write_script("/etc/tor/torrc");
        assert!(script.starts_with("tmp=$(mktemp '/etc/tor/torrc'.XXXXXX)"));
        assert!(script.contains("mv -f \"$tmp\" '/etc/tor/torrc'"));
    }

    #[test]
    fn test_read_result_missing_file_is_none() {
        let output = CommandOutput::failed(MISSING_FILE_EXIT, "");
        assert_eq!(read_result("/etc/tor/torrc", output).unwrap(), None);
    }

    #[test]
    fn test_read_result_returns_content() {
        let output = CommandOutput::ok("ID=debian\n");
        assert_eq!(
            read_result("/etc/os-release", output).unwrap().as_deref(),
            Some("ID=debian\n")
        );
    }

    #[test]
    fn test_read_result_other_status_is_command_failure() {
        let output = CommandOutput::failed(1, "cat: /etc/tor/torrc: Is a directory\n");
        let err = read_result("/etc/tor/torrc", output).unwrap_err();
        assert!(matches!(err, Error::CommandFailed { exit_code: 1, .. }));
    }

    #[test]
    fn test_write_result_permission_denied() {
        let output = CommandOutput::failed(
            1,
            "mktemp: failed to create file via template '/etc/tor/torrc.XXXXXX': Permission denied\n",
        );
        let err = write_result("/etc/tor/torrc", &output).unwrap_err();
        assert!(matches!(&err, Error::Permission { path, .. } if path == "/etc/tor/torrc"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_write_result_sudo_password_required() {
        let output = CommandOutput::failed(1, "sudo: a password is required\n");
        let err = write_result("/etc/tor/torrc", &output).unwrap_err();
        assert!(matches!(err, Error::Permission { .. }));
    }

    #[test]
    fn test_write_result_success() {
        assert!(write_result("/etc/tor/torrc", &CommandOutput::ok("")).is_ok());
    }
}
