//! HTML subset lexer using logos
//!
//! Only the shapes the editor emits are recognised: start/end tags with
//! attributes, comments, doctypes and text. A `<` that does not open a tag
//! is lexed on its own and treated as text by the parser.

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
pub enum HtmlToken<'src> {
    #[regex(r"<!--([^-]|-[^-])*--+>", |lex| lex.slice())]
    Comment(&'src str),

    #[regex(r"<![a-zA-Z][^>]*>")]
    Doctype,

    #[regex(
        r#"<[a-zA-Z][a-zA-Z0-9-]*([ \t\r\n]+[^ \t\r\n"'>/=]+([ \t\r\n]*=[ \t\r\n]*("[^"]*"|'[^']*'|[^ \t\r\n"'=<>`]+))?)*[ \t\r\n]*/?>"#,
        |lex| lex.slice()
    )]
    StartTag(&'src str),

    #[regex(r"</[a-zA-Z][a-zA-Z0-9-]*[ \t\r\n]*>", |lex| lex.slice())]
    EndTag(&'src str),

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),

    #[token("<")]
    Lt,
}

/// A token with its byte offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken<'src> {
    pub token: HtmlToken<'src>,
    pub start: usize,
}

/// Tokenize a whole source string; `Err` carries the offset of the first
/// unrecognised byte.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken<'_>>, usize> {
    let mut lexer = HtmlToken::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let start = lexer.span().start;
        match result {
            Ok(token) => tokens.push(SpannedToken { token, start }),
            Err(()) => return Err(start),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<HtmlToken<'_>> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_tags_and_text() {
        assert_eq!(
            kinds(r#"<p class="a">Hi</p>"#),
            vec![
                HtmlToken::StartTag(r#"<p class="a">"#),
                HtmlToken::Text("Hi"),
                HtmlToken::EndTag("</p>"),
            ]
        );
    }

    #[test]
    fn test_comment_and_stray_lt() {
        assert_eq!(
            kinds("<!-- note -->a < b"),
            vec![
                HtmlToken::Comment("<!-- note -->"),
                HtmlToken::Text("a "),
                HtmlToken::Lt,
                HtmlToken::Text(" b"),
            ]
        );
    }

    #[test]
    fn test_void_and_unquoted_attributes() {
        assert_eq!(
            kinds("<br/><img src=a.png alt='x y'>"),
            vec![
                HtmlToken::StartTag("<br/>"),
                HtmlToken::StartTag("<img src=a.png alt='x y'>"),
            ]
        );
    }
}
