//! Console reporting for executed commands.

use std::io::{self, Write};

use super::SshInvocation;
use crate::types::CommandResult;

const RULE: &str = "------------------------------------------------------------";

/// Write the `Issuing:` line shown before a command runs.
pub(crate) fn write_issuing(out: &mut impl Write, command: &str, test_mode: bool) -> io::Result<()> {
    if test_mode {
        writeln!(out, "Issuing: {command} (test mode)")
    } else {
        writeln!(out, "Issuing: {command}")
    }
}

/// Write captured output, each stream ending in a newline.
pub(crate) fn write_output(out: &mut impl Write, text: &str) -> io::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    out.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Write the report shown when a command returns non-zero.
pub(crate) fn write_error_report(
    out: &mut impl Write,
    invocation: &SshInvocation,
    result: &CommandResult,
) -> io::Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(out, "ERROR: remote command failed")?;
    writeln!(out, "  command:     {}", invocation.command)?;
    writeln!(
        out,
        "  target:      {}@{} ({})",
        invocation.login.username, invocation.connection.host, invocation.connection.alias
    )?;
    writeln!(out, "  return code: {}", result.return_code)?;
    if !result.stderr.is_empty() {
        writeln!(out, "  stderr:")?;
        for line in result.stderr.lines() {
            writeln!(out, "    {line}")?;
        }
    }
    writeln!(out, "{RULE}")
}

/// Print the `Issuing:` line to stdout.
pub(crate) fn issuing(command: &str, test_mode: bool) {
    if let Err(e) = write_issuing(&mut io::stdout().lock(), command, test_mode) {
        tracing::debug!(error = %e, "Failed to print issuing line");
    }
}

/// Print captured stdout and stderr.
pub(crate) fn output(result: &CommandResult) {
    let printed = write_output(&mut io::stdout().lock(), &result.stdout)
        .and_then(|()| write_output(&mut io::stderr().lock(), &result.stderr));
    if let Err(e) = printed {
        tracing::debug!(error = %e, "Failed to print command output");
    }
}

/// Print the error report to stderr.
pub(crate) fn error_report(invocation: &SshInvocation, result: &CommandResult) {
    if let Err(e) = write_error_report(&mut io::stderr().lock(), invocation, result) {
        tracing::debug!(error = %e, "Failed to print error report");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConnectionProfile, Credentials, ExecOptions};

    #[test]
    fn issuing_line() {
        let mut buf = Vec::new();
        write_issuing(&mut buf, "uptime", false).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Issuing: uptime\n");

        let mut buf = Vec::new();
        write_issuing(&mut buf, "uptime", true).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("test mode"));
    }

    #[test]
    fn output_adds_trailing_newline() {
        let mut buf = Vec::new();
        write_output(&mut buf, "a\nb").unwrap();
        assert_eq!(buf, b"a\nb\n");

        let mut buf = Vec::new();
        write_output(&mut buf, "").unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn error_report_mentions_everything() {
        let invocation = SshInvocation {
            command: "false".to_string(),
            connection: ConnectionProfile::new("10.1.1.1", "bmc_connection"),
            login: Credentials::new("root", "secret"),
            options: ExecOptions::default(),
        };
        let result = CommandResult::new("", "no such file\n", 2);
        let mut buf = Vec::new();
        write_error_report(&mut buf, &invocation, &result).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("false"));
        assert!(text.contains("root@10.1.1.1"));
        assert!(text.contains("return code: 2"));
        assert!(text.contains("no such file"));
        assert!(!text.contains("secret"));
    }
}
