use std::{iter::Peekable, str::CharIndices};

use anyhow::{Result, anyhow, bail};

use crate::token::Token;

/// Hand-written scanner over the raw source text. Tokens borrow their text
/// from the input. Scanning stops for good at the terminating `.` or at end
/// of input; from then on `next_token` keeps returning `Token::Eof`.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            done: false,
        }
    }

    /// True until the end sentinel has been produced.
    pub fn has_more(&self) -> bool {
        !self.done
    }

    pub fn next_token(&mut self) -> Result<Token<'a>> {
        if self.done {
            return Ok(Token::Eof);
        }

        loop {
            self.skip_whitespace();

            let (start_idx, ch) = match self.chars.peek() {
                Some(&(idx, c)) => (idx, c),
                None => {
                    self.done = true;
                    return Ok(Token::Eof);
                }
            };

            match ch {
                '.' => {
                    // Program terminator; anything after it is never scanned.
                    self.done = true;
                    return Ok(Token::Eof);
                }
                '/' => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    if matches!(lookahead.peek(), Some(&(_, '/'))) {
                        self.skip_line_comment();
                        continue;
                    }
                    self.chars.next();
                    return Ok(Token::Slash);
                }
                ':' => {
                    self.chars.next();
                    if matches!(self.chars.peek(), Some(&(_, '='))) {
                        self.chars.next();
                        return Ok(Token::Assign);
                    }
                    return Ok(Token::Colon);
                }
                '<' => {
                    self.chars.next();
                    match self.chars.peek() {
                        Some(&(_, '=')) => {
                            self.chars.next();
                            return Ok(Token::LessEqual);
                        }
                        Some(&(_, '>')) => {
                            self.chars.next();
                            return Ok(Token::NotEqual);
                        }
                        _ => return Ok(Token::Less),
                    }
                }
                '>' => {
                    self.chars.next();
                    if matches!(self.chars.peek(), Some(&(_, '='))) {
                        self.chars.next();
                        return Ok(Token::GreaterEqual);
                    }
                    return Ok(Token::Greater);
                }
                '=' => {
                    self.chars.next();
                    return Ok(Token::Equal);
                }
                '+' => {
                    self.chars.next();
                    return Ok(Token::Plus);
                }
                '-' => {
                    self.chars.next();
                    return Ok(Token::Minus);
                }
                '*' => {
                    self.chars.next();
                    return Ok(Token::Star);
                }
                '%' => {
                    self.chars.next();
                    return Ok(Token::Percent);
                }
                '(' => {
                    self.chars.next();
                    return Ok(Token::LParen);
                }
                ')' => {
                    self.chars.next();
                    return Ok(Token::RParen);
                }
                ',' => {
                    self.chars.next();
                    return Ok(Token::Comma);
                }
                ';' => {
                    self.chars.next();
                    return Ok(Token::Semicolon);
                }
                c if c.is_ascii_digit() => return self.read_integer(start_idx),
                c if c.is_ascii_alphabetic() => return Ok(self.read_word(start_idx)),
                _ => bail!("Unrecognized character '{ch}'"),
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.chars.next();
        }
    }

    /// Maximal digit run, parsed as i64.
    fn read_integer(&mut self, start: usize) -> Result<Token<'a>> {
        self.chars.next();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.chars.next();
            } else {
                break;
            }
        }

        let end = self.current_index();
        let literal = &self.input[start..end];
        let value = literal
            .parse::<i64>()
            .map_err(|_| anyhow!("Invalid integer literal '{literal}'"))?;
        Ok(Token::Integer(value))
    }

    /// Letter followed by letters/digits; keywords are matched exactly.
    fn read_word(&mut self, start: usize) -> Token<'a> {
        self.chars.next();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() {
                self.chars.next();
            } else {
                break;
            }
        }

        let word = &self.input[start..self.current_index()];
        Token::keyword(word).unwrap_or(Token::Identifier(word))
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }
}

/// Scans the whole input up to and including the end sentinel.
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token, Token::Eof);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}
