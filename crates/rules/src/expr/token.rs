//! Tokenizer for the match-expression language.

use super::ParseError;

/// One lexical token. Keywords are lexed eagerly; `and`/`or`/`not`/`in`
/// are reserved and never resolve as identifiers.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Null,
    True,
    False,
    And,
    Or,
    Not,
    In,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `=~` — anchored regex match.
    RegexMatch,
    /// `=~~` — unanchored regex search.
    RegexSearch,
    Plus,
    Minus,
    Dot,
    Comma,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
}

impl Token {
    /// Human-readable token label for parse errors.
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier `{}`", name),
            Token::Int(i) => format!("integer `{}`", i),
            Token::Float(x) => format!("float `{}`", x),
            Token::Str(s) => format!("string '{}'", s),
            Token::Null => "`null`".to_string(),
            Token::True => "`true`".to_string(),
            Token::False => "`false`".to_string(),
            Token::And => "`and`".to_string(),
            Token::Or => "`or`".to_string(),
            Token::Not => "`not`".to_string(),
            Token::In => "`in`".to_string(),
            Token::Eq => "`==`".to_string(),
            Token::Ne => "`!=`".to_string(),
            Token::Lt => "`<`".to_string(),
            Token::Le => "`<=`".to_string(),
            Token::Gt => "`>`".to_string(),
            Token::Ge => "`>=`".to_string(),
            Token::RegexMatch => "`=~`".to_string(),
            Token::RegexSearch => "`=~~`".to_string(),
            Token::Plus => "`+`".to_string(),
            Token::Minus => "`-`".to_string(),
            Token::Dot => "`.`".to_string(),
            Token::Comma => "`,`".to_string(),
            Token::Colon => "`:`".to_string(),
            Token::LParen => "`(`".to_string(),
            Token::RParen => "`)`".to_string(),
            Token::LBracket => "`[`".to_string(),
            Token::RBracket => "`]`".to_string(),
            Token::LBrace => "`{`".to_string(),
            Token::RBrace => "`}`".to_string(),
        }
    }
}

/// Tokenize an expression source string.
pub(crate) fn tokenize(src: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        match b {
            b' ' | b'\t' | b'\r' | b'\n' => {
                pos += 1;
            }
            b'(' => {
                tokens.push((Token::LParen, pos));
                pos += 1;
            }
            b')' => {
                tokens.push((Token::RParen, pos));
                pos += 1;
            }
            b'[' => {
                tokens.push((Token::LBracket, pos));
                pos += 1;
            }
            b']' => {
                tokens.push((Token::RBracket, pos));
                pos += 1;
            }
            b'{' => {
                tokens.push((Token::LBrace, pos));
                pos += 1;
            }
            b'}' => {
                tokens.push((Token::RBrace, pos));
                pos += 1;
            }
            b',' => {
                tokens.push((Token::Comma, pos));
                pos += 1;
            }
            b':' => {
                tokens.push((Token::Colon, pos));
                pos += 1;
            }
            b'.' => {
                tokens.push((Token::Dot, pos));
                pos += 1;
            }
            b'+' => {
                tokens.push((Token::Plus, pos));
                pos += 1;
            }
            b'-' => {
                tokens.push((Token::Minus, pos));
                pos += 1;
            }
            b'=' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push((Token::Eq, pos));
                    pos += 2;
                } else if bytes.get(pos + 1) == Some(&b'~') {
                    if bytes.get(pos + 2) == Some(&b'~') {
                        tokens.push((Token::RegexSearch, pos));
                        pos += 3;
                    } else {
                        tokens.push((Token::RegexMatch, pos));
                        pos += 2;
                    }
                } else {
                    return Err(ParseError::new("expected `==`, `=~`, or `=~~`", pos));
                }
            }
            b'!' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push((Token::Ne, pos));
                    pos += 2;
                } else {
                    return Err(ParseError::new("expected `!=`", pos));
                }
            }
            b'<' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push((Token::Le, pos));
                    pos += 2;
                } else {
                    tokens.push((Token::Lt, pos));
                    pos += 1;
                }
            }
            b'>' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push((Token::Ge, pos));
                    pos += 2;
                } else {
                    tokens.push((Token::Gt, pos));
                    pos += 1;
                }
            }
            b'\'' | b'"' => {
                let (token, next) = lex_string(src, pos)?;
                tokens.push((token, pos));
                pos = next;
            }
            b'0'..=b'9' => {
                let (token, next) = lex_number(src, pos)?;
                tokens.push((token, pos));
                pos = next;
            }
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => {
                let (token, next) = lex_word(src, pos);
                tokens.push((token, pos));
                pos = next;
            }
            other => {
                return Err(ParseError::new(
                    format!("unexpected character `{}`", other as char),
                    pos,
                ));
            }
        }
    }

    Ok(tokens)
}

fn lex_string(src: &str, start: usize) -> Result<(Token, usize), ParseError> {
    let bytes = src.as_bytes();
    let quote = bytes[start];
    let mut out = String::new();
    let mut pos = start + 1;

    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => {
                let escaped = bytes
                    .get(pos + 1)
                    .ok_or_else(|| ParseError::new("unterminated escape", pos))?;
                match escaped {
                    b'\\' => out.push('\\'),
                    b'\'' => out.push('\''),
                    b'"' => out.push('"'),
                    b'n' => out.push('\n'),
                    b't' => out.push('\t'),
                    other => {
                        return Err(ParseError::new(
                            format!("unsupported escape `\\{}`", *other as char),
                            pos,
                        ));
                    }
                }
                pos += 2;
            }
            b if b == quote => return Ok((Token::Str(out), pos + 1)),
            _ => {
                // Consume one full UTF-8 character.
                let ch = src[pos..].chars().next().unwrap_or('\u{fffd}');
                out.push(ch);
                pos += ch.len_utf8();
            }
        }
    }

    Err(ParseError::new("unterminated string literal", start))
}

fn lex_number(src: &str, start: usize) -> Result<(Token, usize), ParseError> {
    let bytes = src.as_bytes();
    let mut pos = start;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }

    // A dot only belongs to the number when digits follow; `2.to_str`
    // lexes as integer, dot, identifier.
    let is_float = bytes.get(pos) == Some(&b'.')
        && bytes.get(pos + 1).is_some_and(|b| b.is_ascii_digit());
    if is_float {
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        let text = &src[start..pos];
        let value = text
            .parse::<f64>()
            .map_err(|_| ParseError::new(format!("invalid float literal `{}`", text), start))?;
        Ok((Token::Float(value), pos))
    } else {
        let text = &src[start..pos];
        let value = text
            .parse::<i64>()
            .map_err(|_| ParseError::new(format!("integer literal `{}` overflows", text), start))?;
        Ok((Token::Int(value), pos))
    }
}

fn lex_word(src: &str, start: usize) -> (Token, usize) {
    let bytes = src.as_bytes();
    let mut pos = start;
    while pos < bytes.len()
        && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
    {
        pos += 1;
    }

    let word = &src[start..pos];
    let token = match word {
        "null" => Token::Null,
        "true" => Token::True,
        "false" => Token::False,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "in" => Token::In,
        _ => Token::Ident(word.to_string()),
    };
    (token, pos)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn lexes_comparison_operators() {
        assert_eq!(
            kinds("a == b != c <= d >= e < f > g"),
            vec![
                Token::Ident("a".into()),
                Token::Eq,
                Token::Ident("b".into()),
                Token::Ne,
                Token::Ident("c".into()),
                Token::Le,
                Token::Ident("d".into()),
                Token::Ge,
                Token::Ident("e".into()),
                Token::Lt,
                Token::Ident("f".into()),
                Token::Gt,
                Token::Ident("g".into()),
            ]
        );
    }

    #[test]
    fn distinguishes_regex_operators() {
        assert_eq!(
            kinds("a =~ 'x' and b =~~ 'y'"),
            vec![
                Token::Ident("a".into()),
                Token::RegexMatch,
                Token::Str("x".into()),
                Token::And,
                Token::Ident("b".into()),
                Token::RegexSearch,
                Token::Str("y".into()),
            ]
        );
    }

    #[test]
    fn lexes_numbers_and_accessor_dots() {
        assert_eq!(kinds("2.5"), vec![Token::Float(2.5)]);
        assert_eq!(
            kinds("version.to_str"),
            vec![
                Token::Ident("version".into()),
                Token::Dot,
                Token::Ident("to_str".into()),
            ]
        );
        // The dot after the integer starts an accessor, not a float.
        assert_eq!(
            kinds("2.to_str"),
            vec![Token::Int(2), Token::Dot, Token::Ident("to_str".into())]
        );
    }

    #[test]
    fn lexes_quoted_strings_with_escapes() {
        assert_eq!(kinds(r"'it\'s'"), vec![Token::Str("it's".into())]);
        assert_eq!(kinds(r#""H&E""#), vec![Token::Str("H&E".into())]);
    }

    #[test]
    fn keywords_are_reserved() {
        assert_eq!(
            kinds("not_dcwg and not is_derived"),
            vec![
                Token::Ident("not_dcwg".into()),
                Token::And,
                Token::Not,
                Token::Ident("is_derived".into()),
            ]
        );
    }

    #[test]
    fn rejects_stray_equals() {
        assert!(tokenize("a = b").is_err());
        assert!(tokenize("a ! b").is_err());
        assert!(tokenize("'unterminated").is_err());
    }
}
