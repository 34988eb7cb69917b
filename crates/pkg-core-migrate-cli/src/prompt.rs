//! Operator prompting over stdin.

use async_trait::async_trait;
use pkg_core_migrate::{MigrateError, Prompter, Result};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Reads answers from the process's stdin.
pub struct StdinPrompter;

#[async_trait]
impl Prompter for StdinPrompter {
    async fn prompt(&self, question: &str) -> Result<String> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(question.as_bytes()).await?;
        stdout.flush().await?;

        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        reader.read_line(&mut line).await?;
        Ok(line.trim().to_string())
    }

    async fn prompt_with_timeout(&self, question: &str, timeout: Duration) -> Result<String> {
        tokio::time::timeout(timeout, self.prompt(question))
            .await
            .map_err(|_| MigrateError::PromptTimeout(timeout.as_millis() as u64))?
    }
}

/// Ask for explicit consent before the destructive phases run.
///
/// Unrecognized answers re-ask up to `attempts` times; an explicit "no"
/// aborts immediately. Both refusal paths exit with the operator-error
/// code rather than the migration-failure code.
pub async fn confirm_migration(
    prompter: &dyn Prompter,
    attempts: u32,
    timeout: Duration,
) -> Result<()> {
    for _ in 0..attempts {
        let answer = prompter
            .prompt_with_timeout(
                "This run deletes leftover target records and creates new ones. \
                 Proceed? [yes/no]: ",
                timeout,
            )
            .await?;
        match answer.to_lowercase().as_str() {
            "yes" | "y" => return Ok(()),
            "no" | "n" => {
                return Err(MigrateError::PromptExhausted(
                    "migration declined by operator".to_string(),
                ))
            }
            _ => eprintln!("Please answer 'yes' or 'no'."),
        }
    }
    Err(MigrateError::PromptExhausted(format!(
        "no valid answer after {attempts} attempts"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedPrompter {
        answers: Mutex<Vec<Result<String>>>,
    }

    impl ScriptedPrompter {
        fn new(answers: Vec<Result<String>>) -> Self {
            Self {
                answers: Mutex::new(answers),
            }
        }
    }

    #[async_trait]
    impl Prompter for ScriptedPrompter {
        async fn prompt(&self, _question: &str) -> Result<String> {
            self.answers.lock().unwrap().remove(0)
        }

        async fn prompt_with_timeout(&self, question: &str, _timeout: Duration) -> Result<String> {
            self.prompt(question).await
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_yes_after_garbage_confirms() {
        let prompter = ScriptedPrompter::new(vec![Ok("maybe".into()), Ok("YES".into())]);
        confirm_migration(&prompter, 3, TIMEOUT).await.unwrap();
    }

    #[tokio::test]
    async fn test_no_aborts_immediately() {
        let prompter = ScriptedPrompter::new(vec![Ok("no".into()), Ok("yes".into())]);
        let err = confirm_migration(&prompter, 3, TIMEOUT).await.unwrap_err();
        assert!(matches!(err, MigrateError::PromptExhausted(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_garbage_exhausts_attempts() {
        let prompter = ScriptedPrompter::new(vec![
            Ok("hm".into()),
            Ok("??".into()),
            Ok("ok".into()),
        ]);
        let err = confirm_migration(&prompter, 3, TIMEOUT).await.unwrap_err();
        assert!(matches!(err, MigrateError::PromptExhausted(_)));
    }

    #[tokio::test]
    async fn test_timeout_propagates() {
        let prompter =
            ScriptedPrompter::new(vec![Err(MigrateError::PromptTimeout(1_000))]);
        let err = confirm_migration(&prompter, 3, TIMEOUT).await.unwrap_err();
        assert!(matches!(err, MigrateError::PromptTimeout(_)));
    }
}
