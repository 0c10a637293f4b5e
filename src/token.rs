/// One lexeme of Pascal source text. Keywords are case-sensitive; any other
/// letter-led word is an `Identifier`. `Eof` is the sentinel returned once
/// the terminating `.` (or end of input) is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Identifier(&'a str),
    Integer(i64),

    // Keywords
    Begin,
    End,
    If,
    Then,
    Else,
    While,
    Do,
    For,
    To,
    Var,
    Procedure,
    Writeln,
    Readln,
    Mod,

    // Operators
    Assign,       // :=
    Equal,        // =
    NotEqual,     // <>
    Less,         // <
    Greater,      // >
    LessEqual,    // <=
    GreaterEqual, // >=
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /
    Percent,      // %

    // Delimiters
    LParen,    // (
    RParen,    // )
    Comma,     // ,
    Colon,     // :
    Semicolon, // ;

    Eof,
}

impl<'a> Token<'a> {
    /// Maps a scanned word to its keyword token, if it is one.
    pub fn keyword(word: &'a str) -> Option<Token<'a>> {
        let token = match word {
            "BEGIN" => Token::Begin,
            "END" => Token::End,
            "IF" => Token::If,
            "THEN" => Token::Then,
            "ELSE" => Token::Else,
            "WHILE" => Token::While,
            "DO" => Token::Do,
            "FOR" => Token::For,
            "TO" => Token::To,
            "VAR" => Token::Var,
            "PROCEDURE" => Token::Procedure,
            "WRITELN" => Token::Writeln,
            "READLN" => Token::Readln,
            "mod" => Token::Mod,
            _ => return None,
        };
        Some(token)
    }
}
