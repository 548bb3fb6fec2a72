use crate::utils::error::{CalibError, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Display name of a program: its file name when it is a path.
pub fn program_name(program: &OsStr) -> String {
    Path::new(program)
        .file_name()
        .unwrap_or(program)
        .to_string_lossy()
        .into_owned()
}

/// Shell-like rendering of a command line for logs and dry runs.
pub fn render_command_line(program: &OsStr, args: &[String]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(quote(&program.to_string_lossy()));
    parts.extend(args.iter().map(|a| quote(a)));
    parts.join(" ")
}

fn quote(part: &str) -> String {
    if !part.is_empty() && !part.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
        part.to_string()
    } else {
        format!("'{}'", part.replace('\'', r"'\''"))
    }
}

/// Runs a child process with inherited stdio and waits for it.
///
/// Returns the exit code of a successful run; a non-zero exit becomes
/// [`CalibError::ProcessFailed`].
pub async fn run_to_completion(program: &OsStr, args: &[String]) -> Result<i32> {
    let name = program_name(program);
    tracing::debug!("Running {}", render_command_line(program, args));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound if Path::new(program).components().count() > 1 => {
                CalibError::ExecutableNotFound {
                    path: Path::new(program).to_path_buf(),
                }
            }
            _ => CalibError::ProcessSpawnError {
                program: name.clone(),
                source,
            },
        })?;

    let status = child.wait().await?;
    tracing::debug!("{} finished with {}", name, status);

    if status.success() {
        Ok(status.code().unwrap_or(0))
    } else {
        Err(CalibError::ProcessFailed {
            program: name,
            code: status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_command_line_quotes_spaces() {
        let line = render_command_line(
            OsStr::new("/opt/build/static_imu_calibration"),
            &["--telemetry_json=/data/my set/a.json".to_string(), "--verbose=0".to_string()],
        );
        assert_eq!(
            line,
            "/opt/build/static_imu_calibration '--telemetry_json=/data/my set/a.json' --verbose=0"
        );
    }

    #[test]
    fn test_program_name_strips_directories() {
        assert_eq!(
            program_name(OsStr::new("/opt/build/static_imu_calibration")),
            "static_imu_calibration"
        );
        assert_eq!(program_name(OsStr::new("extractor")), "extractor");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_to_completion_reports_exit_code() {
        let ok = run_to_completion(OsStr::new("sh"), &["-c".to_string(), "exit 0".to_string()])
            .await
            .unwrap();
        assert_eq!(ok, 0);

        let err = run_to_completion(OsStr::new("sh"), &["-c".to_string(), "exit 7".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CalibError::ProcessFailed { ref program, code: Some(7) } if program == "sh"
        ));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_child_shares_our_stdin() {
        let Ok(ours) = std::fs::read_link("/proc/self/fd/0") else {
            return;
        };
        let args = [
            "-c".to_string(),
            r#"test "$(readlink /proc/self/fd/0)" = "$1""#.to_string(),
            "sh".to_string(),
            ours.to_string_lossy().into_owned(),
        ];

        assert_eq!(run_to_completion(OsStr::new("sh"), &args).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_program_on_path_is_spawn_error() {
        let err = run_to_completion(OsStr::new("definitely-not-an-installed-tool-42"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CalibError::ProcessSpawnError { .. }));
    }

    #[tokio::test]
    async fn test_missing_program_path_is_executable_not_found() {
        let err = run_to_completion(OsStr::new("/nonexistent/dir/static_imu_calibration"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CalibError::ExecutableNotFound { .. }));
    }
}
