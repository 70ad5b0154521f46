use std::time::Duration;

pub struct ExecRequest<'a> {
    pub program: &'a str,
    pub args: &'a [&'a str],
    pub timeout: Duration,
}

impl ExecRequest<'_> {
    /// Program and arguments as one owned argv vector.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program)
            .chain(self.args.iter().copied())
            .map(String::from)
            .collect()
    }

    /// Render the request as a single POSIX shell command line, for backends
    /// that only accept a command string.
    pub fn shell_command(&self) -> String {
        std::iter::once(self.program)
            .chain(self.args.iter().copied())
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '=' | ':'));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(program: &'a str, args: &'a [&'a str]) -> ExecRequest<'a> {
        ExecRequest {
            program,
            args,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn argv_keeps_program_first() {
        let req = request("python3", &["-c", "print(1)"]);
        assert_eq!(req.argv(), vec!["python3", "-c", "print(1)"]);
    }

    #[test]
    fn shell_command_leaves_plain_words_unquoted() {
        let req = request("python3", &["-V"]);
        assert_eq!(req.shell_command(), "python3 -V");
    }

    #[test]
    fn shell_command_quotes_script_with_spaces_and_quotes() {
        let req = request("python3", &["-c", "print(f'{1} ok')"]);
        assert_eq!(
            req.shell_command(),
            r#"python3 -c 'print(f'\''{1} ok'\'')'"#
        );
    }

    #[test]
    fn shell_command_quotes_empty_argument() {
        let req = request("echo", &[""]);
        assert_eq!(req.shell_command(), "echo ''");
    }
}
