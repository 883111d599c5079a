//! Tokenizer for block-generated scripts, built on `nom` combinators.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_until},
    character::complete::{alpha1, alphanumeric1, char, digit1, hex_digit1, multispace1, one_of},
    combinator::{map, map_res, opt, recognize, value},
    multi::{many0_count, many1_count},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use super::SyntaxError;

/// Words the lexer turns into [`Token::Keyword`].
///
/// `async` and `of` stay identifiers; the parser recognises them by context.
pub const KEYWORDS: &[&str] = &[
    "var", "let", "const", "if", "else", "while", "do", "for", "return", "throw", "break",
    "continue", "function", "await", "new", "typeof", "true", "false", "null", "undefined", "try",
    "catch", "finally", "in",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Keyword(&'static str),
    Punct(&'static str),
    Eof,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Str(s) => format!("string '{}'", s),
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Keyword(k) => format!("keyword '{}'", k),
            Token::Punct(p) => format!("'{}'", p),
            Token::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    fn locate(source: &str, offset: usize) -> Self {
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(idx) => before[idx + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        Self { line, column }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Split `source` into tokens, terminated by a single [`Token::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut rest = source;

    loop {
        if let Ok((after, _)) = trivia(rest) {
            rest = after;
        }
        let span = Span::locate(source, source.len() - rest.len());

        if rest.is_empty() {
            tokens.push(SpannedToken {
                token: Token::Eof,
                span,
            });
            return Ok(tokens);
        }
        if rest.starts_with("/*") {
            return Err(SyntaxError::new("unterminated block comment", span));
        }

        match token(rest) {
            Ok((after, token)) => {
                tokens.push(SpannedToken { token, span });
                rest = after;
            }
            Err(_) => {
                let message = match rest.chars().next() {
                    Some(q @ ('\'' | '"')) => format!("unterminated string literal starting with {}", q),
                    Some(c) => format!("unexpected character '{}'", c),
                    None => "unexpected end of input".to_string(),
                };
                return Err(SyntaxError::new(message, span));
            }
        }
    }
}

fn trivia(input: &str) -> IResult<&str, usize> {
    many0_count(alt((
        value((), multispace1),
        value((), pair(tag("//"), opt(is_not("\n")))),
        value((), tuple((tag("/*"), take_until("*/"), tag("*/")))),
    )))(input)
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((
        map(number, Token::Number),
        map(string_literal, Token::Str),
        map(word, |w| match KEYWORDS.iter().find(|k| **k == w) {
            Some(k) => Token::Keyword(*k),
            None => Token::Ident(w.to_string()),
        }),
        map(punct, Token::Punct),
    ))(input)
}

fn number(input: &str) -> IResult<&str, f64> {
    alt((
        map_res(
            preceded(alt((tag("0x"), tag("0X"))), hex_digit1),
            |digits: &str| i64::from_str_radix(digits, 16).map(|n| n as f64),
        ),
        map_res(
            recognize(tuple((
                digit1,
                opt(pair(char('.'), digit1)),
                opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
            ))),
            |text: &str| text.parse::<f64>(),
        ),
    ))(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    alt((quoted('\'', "\\'\n"), quoted('"', "\\\"\n")))(input)
}

fn quoted<'a>(
    quote: char,
    normal: &'static str,
) -> impl FnMut(&'a str) -> IResult<&'a str, String> {
    move |input| {
        delimited(
            char(quote),
            map(
                opt(nom::bytes::complete::escaped_transform(
                    is_not(normal),
                    '\\',
                    escape_code,
                )),
                Option::unwrap_or_default,
            ),
            char(quote),
        )(input)
    }
}

fn escape_code(input: &str) -> IResult<&str, &str> {
    alt((
        value("\\", char('\\')),
        value("'", char('\'')),
        value("\"", char('"')),
        value("\n", char('n')),
        value("\t", char('t')),
        value("\r", char('r')),
        value("\0", char('0')),
    ))(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"), tag("$"))),
        opt(many1_count(alt((alphanumeric1, tag("_"), tag("$"))))),
    ))(input)
}

fn punct(input: &str) -> IResult<&str, &'static str> {
    alt((
        alt((
            value("===", tag("===")),
            value("!==", tag("!==")),
            value("==", tag("==")),
            value("!=", tag("!=")),
            value("<=", tag("<=")),
            value(">=", tag(">=")),
            value("&&", tag("&&")),
            value("||", tag("||")),
            value("++", tag("++")),
            value("--", tag("--")),
            value("+=", tag("+=")),
            value("-=", tag("-=")),
            value("*=", tag("*=")),
            value("/=", tag("/=")),
            value("%=", tag("%=")),
        )),
        alt((
            value("(", tag("(")),
            value(")", tag(")")),
            value("{", tag("{")),
            value("}", tag("}")),
            value("[", tag("[")),
            value("]", tag("]")),
            value(";", tag(";")),
            value(",", tag(",")),
            value(".", tag(".")),
            value("?", tag("?")),
            value(":", tag(":")),
            value("=", tag("=")),
            value("+", tag("+")),
            value("-", tag("-")),
            value("*", tag("*")),
            value("/", tag("/")),
            value("%", tag("%")),
            value("<", tag("<")),
            value(">", tag(">")),
            value("!", tag("!")),
        )),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_tokenize_call_statement() {
        assert_eq!(
            kinds("await addCut(5);"),
            vec![
                Token::Keyword("await"),
                Token::Ident("addCut".into()),
                Token::Punct("("),
                Token::Number(5.0),
                Token::Punct(")"),
                Token::Punct(";"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_longest_operator_wins() {
        assert_eq!(
            kinds("a !== b"),
            vec![
                Token::Ident("a".into()),
                Token::Punct("!=="),
                Token::Ident("b".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_strings_and_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "" "a\nb""#),
            vec![
                Token::Str("it's".into()),
                Token::Str(String::new()),
                Token::Str("a\nb".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(
            kinds("0x1F 2.5 1e3"),
            vec![
                Token::Number(31.0),
                Token::Number(2.5),
                Token::Number(1000.0),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("// move\n/* block */ x"),
            vec![Token::Ident("x".into()), Token::Eof]
        );
    }

    #[test]
    fn test_spans_track_lines() {
        let tokens = tokenize("a\n  b").unwrap();
        assert_eq!(tokens[1].span, Span { line: 2, column: 3 });
    }

    #[test]
    fn test_unterminated_string_is_reported() {
        let err = tokenize("x = 'oops").unwrap_err();
        assert!(err.message.contains("unterminated string"));
        assert_eq!(err.span.column, 5);
    }

    #[test]
    fn test_unterminated_comment_is_reported() {
        let err = tokenize("a /* never closed").unwrap_err();
        assert!(err.message.contains("block comment"));
    }
}
