use crate::lexer::{self, LexingError, Token};

/// The structure of one input line once quoting has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// A blank line. Nothing runs and nothing is reported.
    Empty,
    /// A single command: its name followed by its arguments.
    Simple(Vec<String>),
    /// Two or more commands connected by `|`, in execution order.
    Pipeline(Vec<Vec<String>>),
}

/// Errors that can occur while turning a line into a [`CommandLine`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Lexing(#[from] LexingError),
    /// A pipe operator with no command on one of its sides (`| cat`, `ls |`, `a || b`).
    #[error("invalid pipeline")]
    EmptyPipelineStage,
}

/// Groups tokens into commands separated by the pipe operator.
pub fn parse_command_line(tokens: Vec<Token>) -> Result<CommandLine, ParseError> {
    if tokens.is_empty() {
        return Ok(CommandLine::Empty);
    }

    let mut stages = Vec::new();
    let mut current = Vec::new();
    for token in tokens {
        match token {
            Token::Word(word) => current.push(word),
            Token::PipeOp => stages.push(std::mem::take(&mut current)),
        }
    }

    if stages.is_empty() {
        return Ok(CommandLine::Simple(current));
    }

    stages.push(current);
    if stages.iter().any(Vec::is_empty) {
        return Err(ParseError::EmptyPipelineStage);
    }
    Ok(CommandLine::Pipeline(stages))
}

/// Tokenizes and parses one raw input line.
pub fn parse_line(line: &str) -> Result<CommandLine, ParseError> {
    let tokens = lexer::split_into_tokens(line)?;
    parse_command_line(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_blank_line_is_empty() {
        assert_eq!(parse_line("").unwrap(), CommandLine::Empty);
        assert_eq!(parse_line("    ").unwrap(), CommandLine::Empty);
    }

    #[test]
    fn test_simple_command() {
        assert_eq!(
            parse_line("echo 'a b' c").unwrap(),
            CommandLine::Simple(argv(&["echo", "a b", "c"]))
        );
    }

    #[test]
    fn test_two_stage_pipeline() {
        assert_eq!(
            parse_line("echo hi | cat").unwrap(),
            CommandLine::Pipeline(vec![argv(&["echo", "hi"]), argv(&["cat"])])
        );
    }

    #[test]
    fn test_three_stage_pipeline() {
        assert_eq!(
            parse_line("ls -l|grep x|wc -l > n.txt").unwrap(),
            CommandLine::Pipeline(vec![
                argv(&["ls", "-l"]),
                argv(&["grep", "x"]),
                argv(&["wc", "-l", ">", "n.txt"]),
            ])
        );
    }

    #[test]
    fn test_dangling_pipes_are_rejected() {
        for line in ["| cat", "echo hi |", "echo hi || cat", "|"] {
            assert_eq!(
                parse_line(line),
                Err(ParseError::EmptyPipelineStage),
                "line {:?}",
                line
            );
        }
    }

    #[test]
    fn test_lexing_error_is_forwarded() {
        let err = parse_line("echo \"oops").unwrap_err();
        assert_eq!(err, ParseError::Lexing(LexingError::UnfinishedQuote));
        assert_eq!(err.to_string(), "unclosed quote");
    }
}
