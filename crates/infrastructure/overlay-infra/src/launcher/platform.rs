/// Program and arguments that hand `command` to the platform's interpreter,
/// so pipes, redirection and variable expansion keep working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellInvocation {
    pub program: String,
    pub args: Vec<String>,
}

#[cfg(target_os = "windows")]
pub fn shell_invocation(command: &str) -> ShellInvocation {
    const DEFAULT_COMSPEC: &str = r"C:\Windows\System32\cmd.exe";

    let program = std::env::var("ComSpec")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_COMSPEC.to_string());

    ShellInvocation {
        program,
        args: vec!["/C".to_string(), command.to_string()],
    }
}

#[cfg(not(target_os = "windows"))]
pub fn shell_invocation(command: &str) -> ShellInvocation {
    // Login shell so PATH additions from the user's profile apply to actions.
    ShellInvocation {
        program: "/bin/sh".to_string(),
        args: vec!["-lc".to_string(), command.to_string()],
    }
}

/// Sends SIGKILL to every process in the group led by `pgid`.
///
/// Runs are spawned as their own group leader, so this also reaches
/// grandchildren the shell started.
#[cfg(unix)]
pub fn kill_process_group(pgid: u32) -> std::io::Result<()> {
    // SAFETY: kill(2) only takes integers; a negative pid addresses the group.
    let rc = unsafe { libc::kill(-(pgid as libc::pid_t), libc::SIGKILL) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        // Group already gone.
        return Ok(());
    }
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_os = "windows"))]
    fn unix_commands_go_through_sh_unmodified() {
        let inv = shell_invocation("ls -la | grep foo > out.txt");
        assert_eq!(inv.program, "/bin/sh");
        assert_eq!(inv.args, ["-lc", "ls -la | grep foo > out.txt"]);
    }

    #[test]
    #[cfg(target_os = "windows")]
    fn windows_commands_go_through_comspec() {
        let inv = shell_invocation("dir /b | findstr foo");
        assert!(inv.program.to_ascii_lowercase().ends_with("cmd.exe"));
        assert_eq!(inv.args, ["/C", "dir /b | findstr foo"]);
    }
}
