/// A `{{ name[.attribute] (| filter)* }}` token found in a line.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub raw: &'a str,
    pub name: &'a str,
    pub attribute: Option<&'a str>,
    pub filters: Vec<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Piece<'a> {
    Text(&'a str),
    Token(Token<'a>),
}

/// Splits a line into plain text and tokens. Anything that does not match the
/// token grammar is kept as text.
pub fn tokenize(line: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(found) = line[pos..].find("{{") {
        let start = pos + found;
        match scan_token(&line[start..]) {
            Some(token) => {
                if start > text_start {
                    pieces.push(Piece::Text(&line[text_start..start]));
                }
                pos = start + token.raw.len();
                text_start = pos;
                pieces.push(Piece::Token(token));
            }
            // "{{{name}}}" holds a token one byte further on.
            None => pos = start + 1,
        }
    }

    if text_start < line.len() {
        pieces.push(Piece::Text(&line[text_start..]));
    }
    pieces
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn ident(&mut self) -> Option<&'a str> {
        let src = self.src;
        let start = self.pos;
        while matches!(self.peek(), Some(b'a'..=b'z' | b'_')) {
            self.pos += 1;
        }
        if self.pos > start {
            Some(&src[start..self.pos])
        } else {
            None
        }
    }
}

fn scan_token(src: &str) -> Option<Token<'_>> {
    let mut cur = Cursor { src, pos: 2 };
    cur.skip_spaces();
    let name = cur.ident()?;
    let attribute = if cur.eat(b'.') {
        Some(cur.ident()?)
    } else {
        None
    };

    let mut filters = Vec::new();
    cur.skip_spaces();
    while cur.eat(b'|') {
        cur.skip_spaces();
        filters.push(cur.ident()?);
        cur.skip_spaces();
    }

    if !(cur.eat(b'}') && cur.eat(b'}')) {
        return None;
    }
    Some(Token {
        raw: &src[..cur.pos],
        name,
        attribute,
        filters,
    })
}
