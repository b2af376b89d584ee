//! Line-oriented tokenizer.
//!
//! Produces words (runs of ASCII letters, digits, `_` and `.`), single
//! characters, end-of-line and end-of-file. Comments start with `;` and run to
//! the end of the line; they are reported as the end-of-line that follows
//! them. One token can be pushed back.

use std::fmt;

/// Token produced by [`Tokenizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    Char(char),
    Eol,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => write!(f, "'{}'", w),
            Token::Char(c) => write!(f, "'{}'", c),
            Token::Eol => write!(f, "end of line"),
            Token::Eof => write!(f, "end of file"),
        }
    }
}

#[inline]
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    current: Token,
    token_line: usize,
    pushed_back: bool,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            current: Token::Eof,
            token_line: 1,
            pushed_back: false,
        }
    }

    /// Line of the most recently returned token (1-based). For an
    /// end-of-line token this is the line it terminates.
    pub fn line(&self) -> usize {
        self.token_line
    }

    /// Return the next token, or the pushed back one.
    pub fn next_token(&mut self) -> Token {
        if self.pushed_back {
            self.pushed_back = false;
        } else {
            self.current = self.read_token();
        }
        self.current.clone()
    }

    /// Make the next call of [`next_token`](Self::next_token) return the
    /// current token again.
    pub fn push_back(&mut self) {
        self.pushed_back = true;
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn read_token(&mut self) -> Token {
        loop {
            let Some(c) = self.peek() else {
                self.token_line = self.line;
                return Token::Eof;
            };

            match c {
                '\n' => {
                    self.pos += 1;
                    self.token_line = self.line;
                    self.line += 1;
                    return Token::Eol;
                }
                ';' => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.pos += 1;
                    }
                }
                c if c.is_whitespace() => self.pos += 1,
                c if is_word_char(c) => {
                    self.token_line = self.line;
                    let start = self.pos;
                    while self.peek().is_some_and(is_word_char) {
                        self.pos += 1;
                    }
                    return Token::Word(self.chars[start..self.pos].iter().collect());
                }
                c => {
                    self.pos += 1;
                    self.token_line = self.line;
                    return Token::Char(c);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(input);
        let mut tokens = Vec::new();
        loop {
            let token = tokenizer.next_token();
            if token == Token::Eof {
                break;
            }
            tokens.push(token);
        }
        tokens
    }

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn test_instruction_line() {
        assert_eq!(
            tokenize("ldi r0, 0x1F\n"),
            vec![
                word("ldi"),
                word("r0"),
                Token::Char(','),
                word("0x1F"),
                Token::Eol
            ]
        );
    }

    #[test]
    fn test_words_with_dots_and_underscores() {
        assert_eq!(
            tokenize(".data my_table.lo 1"),
            vec![word(".data"), word("my_table.lo"), word("1")]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            tokenize("; only comment\nnop ; trailing\n"),
            vec![Token::Eol, word("nop"), Token::Eol]
        );
    }

    #[test]
    fn test_symbols() {
        assert_eq!(
            tokenize("L:(a+-b*~c)"),
            vec![
                word("L"),
                Token::Char(':'),
                Token::Char('('),
                word("a"),
                Token::Char('+'),
                Token::Char('-'),
                word("b"),
                Token::Char('*'),
                Token::Char('~'),
                word("c"),
                Token::Char(')'),
            ]
        );
    }

    #[test]
    fn test_line_numbers() {
        let mut tokenizer = Tokenizer::new("nop\r\n\n  mov r1, r2");
        assert_eq!(tokenizer.next_token(), word("nop"));
        assert_eq!(tokenizer.line(), 1);
        assert_eq!(tokenizer.next_token(), Token::Eol);
        assert_eq!(tokenizer.line(), 1);
        assert_eq!(tokenizer.next_token(), Token::Eol);
        assert_eq!(tokenizer.line(), 2);
        assert_eq!(tokenizer.next_token(), word("mov"));
        assert_eq!(tokenizer.line(), 3);
    }

    #[test]
    fn test_push_back() {
        let mut tokenizer = Tokenizer::new("a b");
        assert_eq!(tokenizer.next_token(), word("a"));
        tokenizer.push_back();
        assert_eq!(tokenizer.next_token(), word("a"));
        assert_eq!(tokenizer.next_token(), word("b"));
        assert_eq!(tokenizer.next_token(), Token::Eof);
        assert_eq!(tokenizer.next_token(), Token::Eof);
    }
}
