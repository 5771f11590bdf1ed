//! A module implementing lexical analysis (tokenization) of a single input line.

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A word: a command name, an argument or a redirection operator such as `>`.
    Word(String),
    /// The pipe operator, `|`, when it appears outside of quotes.
    PipeOp,
}

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexingError {
    /// A closing quote (single or double) was not found.
    #[error("unclosed quote")]
    UnfinishedQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingQuote(char),
}

struct LexingFSM<'a> {
    input: std::str::Chars<'a>,
    state: LexingState,
    buffer: String,
    out: Vec<Token>,
}

impl<'a> LexingFSM<'a> {
    /// Creates a new instance of the lexical analysis Finite State Machine.
    fn new(line: &'a str) -> Self {
        LexingFSM {
            input: line.chars(),
            state: LexingState::Start,
            buffer: String::new(),
            out: Vec::new(),
        }
    }

    /// Runs the machine over the whole input.
    ///
    /// Quote characters open a literal region that only the same character closes.
    /// Nothing inside a quoted region is special, including backslashes.
    fn make_tokens(mut self) -> Result<Vec<Token>, LexingError> {
        while let Some(ch) = self.input.next() {
            match self.state {
                LexingState::Start | LexingState::ReadingWord => self.handle_unquoted(ch),
                LexingState::ReadingQuote(quote) => self.handle_quoted(ch, quote),
            }
        }

        if let LexingState::ReadingQuote(_) = self.state {
            return Err(LexingError::UnfinishedQuote);
        }

        self.finalize_word();
        Ok(self.out)
    }

    fn handle_unquoted(&mut self, ch: char) {
        match ch {
            ' ' | '\n' => {
                self.finalize_word();
                self.state = LexingState::Start;
            }
            '|' => {
                self.finalize_word();
                self.out.push(Token::PipeOp);
                self.state = LexingState::Start;
            }
            '\'' | '"' => self.state = LexingState::ReadingQuote(ch),
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
    }

    fn handle_quoted(&mut self, ch: char, quote: char) {
        if ch == quote {
            self.state = LexingState::ReadingWord;
        } else {
            self.buffer.push(ch);
        }
    }

    /// Empty words (`''`, consecutive separators) are dropped.
    fn finalize_word(&mut self) {
        if !self.buffer.is_empty() {
            self.out.push(Token::Word(std::mem::take(&mut self.buffer)));
        }
    }
}

/// The main entry point function to perform lexical analysis.
///
/// # Returns
/// `Result<Vec<Token>, LexingError>`: the tokens of the line (empty for a blank line),
/// or `LexingError::UnfinishedQuote` if the line ends inside a quoted region.
pub fn split_into_tokens(line: &str) -> Result<Vec<Token>, LexingError> {
    let tokens = LexingFSM::new(line).make_tokens()?;
    log::trace!("tokens = {:?}", tokens);
    Ok(tokens)
}
