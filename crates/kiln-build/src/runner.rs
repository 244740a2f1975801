use std::process::Stdio;

/// Runs the rendered build/push command.
///
/// Production code uses [`ShellRunner`]; tests substitute recording fakes.
#[allow(async_fn_in_trait)]
pub trait CommandRunner: Send + Sync {
    /// Run `argv[0]` with the remaining arguments, blocking until it exits.
    async fn run(&self, argv: &[String]) -> Result<(), RunnerError>;
}

/// Spawns the command directly (no shell), with stdio inherited.
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    async fn run(&self, argv: &[String]) -> Result<(), RunnerError> {
        let (program, args) = argv.split_first().ok_or(RunnerError::EmptyCommand)?;

        let status = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| RunnerError::Spawn {
                program: program.clone(),
                source: e,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(RunnerError::Failed {
                command: argv.join(" "),
                status: status.to_string(),
            })
        }
    }
}

/// Split a rendered command on whitespace into program and arguments.
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_owned).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("command is empty after templating")]
    EmptyCommand,

    #[error("failed to start {program}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("`{command}` failed with {status}")]
    Failed { command: String, status: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_collapses_whitespace() {
        assert_eq!(
            split_command("  docker build\n -t base:1.0.0   /images/base "),
            vec!["docker", "build", "-t", "base:1.0.0", "/images/base"]
        );
    }

    #[test]
    fn split_empty_command() {
        assert!(split_command("   ").is_empty());
    }

    #[tokio::test]
    async fn empty_argv_is_rejected() {
        let result = ShellRunner.run(&[]).await;
        assert!(matches!(result, Err(RunnerError::EmptyCommand)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let result = ShellRunner.run(&split_command("false")).await;
        assert!(matches!(result, Err(RunnerError::Failed { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_command() {
        ShellRunner.run(&split_command("true")).await.unwrap();
    }
}
