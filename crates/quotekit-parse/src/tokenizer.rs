//! Content stream tokenizer.
//!
//! Splits decoded PDF content stream bytes into [`Operation`]s: an operator
//! name plus the operands that preceded it. Only what text extraction needs
//! is kept in detail (numbers, names, strings, arrays); dictionaries,
//! booleans and inline image data are skipped over.

use crate::error::BackendError;

/// A content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Integer or real number.
    Number(f64),
    /// Name without the leading `/`.
    Name(String),
    /// Literal `( )` or hex `< >` string, as raw bytes.
    Str(Vec<u8>),
    Array(Vec<Operand>),
    /// Boolean, null or dictionary: present on the stack but not inspected.
    Other,
}

impl Operand {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Operand::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Operand::Name(n) => Some(n),
            _ => None,
        }
    }
}

/// An operator with its operands, e.g. `Tj` with one string.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operator: String,
    pub operands: Vec<Operand>,
}

impl Operation {
    /// The `n` trailing numeric operands, or `None` if there are fewer or
    /// any of them is not a number.
    pub fn numbers<const N: usize>(&self) -> Option<[f64; N]> {
        let start = self.operands.len().checked_sub(N)?;
        let mut out = [0.0; N];
        for (slot, operand) in out.iter_mut().zip(&self.operands[start..]) {
            *slot = operand.as_number()?;
        }
        Some(out)
    }
}

/// Tokenize a whole content stream.
///
/// # Errors
///
/// Returns [`BackendError::Interpreter`] for unterminated strings, arrays or
/// dictionaries, invalid hex digits and stray `]`.
pub fn tokenize(input: &[u8]) -> Result<Vec<Operation>, BackendError> {
    let mut lexer = Lexer { input, pos: 0 };
    let mut ops = Vec::new();
    let mut stack = Vec::new();

    while let Some(token) = lexer.next_token()? {
        match token {
            Token::Operand(operand) => stack.push(operand),
            Token::Keyword(word) => match word.as_str() {
                "true" | "false" | "null" => stack.push(Operand::Other),
                "BI" => {
                    lexer.skip_inline_image();
                    stack.clear();
                }
                _ => ops.push(Operation {
                    operator: word,
                    operands: std::mem::take(&mut stack),
                }),
            },
            Token::ArrayEnd => {
                return Err(BackendError::Interpreter("unexpected ']'".to_string()));
            }
        }
    }

    Ok(ops)
}

enum Token {
    Operand(Operand),
    Keyword(String),
    ArrayEnd,
}

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0C | 0x00)
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn interp(msg: &str) -> BackendError {
    BackendError::Interpreter(msg.to_string())
}

impl Lexer<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn skip_blank(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while self.peek().is_some_and(|b| b != b'\n' && b != b'\r') {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, BackendError> {
        loop {
            self.skip_blank();
            let Some(b) = self.peek() else {
                return Ok(None);
            };
            let token = match b {
                b'(' => Token::Operand(Operand::Str(self.literal_string()?)),
                b'<' if self.peek_at(1) == Some(b'<') => {
                    self.skip_dictionary()?;
                    Token::Operand(Operand::Other)
                }
                b'<' => Token::Operand(Operand::Str(self.hex_string()?)),
                b'[' => {
                    self.pos += 1;
                    Token::Operand(Operand::Array(self.array()?))
                }
                b']' => {
                    self.pos += 1;
                    Token::ArrayEnd
                }
                b'/' => Token::Operand(Operand::Name(self.name())),
                b'0'..=b'9' | b'+' | b'-' | b'.' => Token::Operand(self.number()),
                b'a'..=b'z' | b'A'..=b'Z' | b'*' | b'\'' | b'"' => Token::Keyword(self.keyword()),
                _ => {
                    self.pos += 1;
                    continue;
                }
            };
            return Ok(Some(token));
        }
    }

    fn literal_string(&mut self) -> Result<Vec<u8>, BackendError> {
        self.pos += 1;
        let mut out = Vec::new();
        let mut depth = 1u32;

        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.push(b);
                }
                b'\\' => {
                    let Some(esc) = self.peek() else { break };
                    self.pos += 1;
                    match esc {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0C),
                        b'\r' => {
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        b'\n' => {}
                        b'0'..=b'7' => {
                            let mut value = u32::from(esc - b'0');
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        value = value * 8 + u32::from(d - b'0');
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            out.push((value & 0xFF) as u8);
                        }
                        other => out.push(other),
                    }
                }
                _ => out.push(b),
            }
        }

        Err(interp("unterminated literal string"))
    }

    fn hex_string(&mut self) -> Result<Vec<u8>, BackendError> {
        self.pos += 1;
        let mut digits = Vec::new();
        loop {
            let Some(b) = self.peek() else {
                return Err(interp("unterminated hex string"));
            };
            self.pos += 1;
            if b == b'>' {
                break;
            }
            if is_whitespace(b) {
                continue;
            }
            digits.push(hex_value(b).ok_or_else(|| {
                BackendError::Interpreter(format!("invalid hex digit: {:?}", b as char))
            })?);
        }
        if digits.len() % 2 == 1 {
            digits.push(0);
        }
        Ok(digits.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect())
    }

    fn array(&mut self) -> Result<Vec<Operand>, BackendError> {
        let mut items = Vec::new();
        loop {
            match self.next_token()? {
                None => return Err(interp("unterminated array")),
                Some(Token::ArrayEnd) => return Ok(items),
                Some(Token::Operand(operand)) => items.push(operand),
                Some(Token::Keyword(word)) => items.push(match word.as_str() {
                    "true" | "false" | "null" => Operand::Other,
                    _ => Operand::Name(word),
                }),
            }
        }
    }

    fn skip_dictionary(&mut self) -> Result<(), BackendError> {
        self.pos += 2;
        let mut depth = 1u32;
        while depth > 0 {
            match (self.peek(), self.peek_at(1)) {
                (None, _) => return Err(interp("unterminated dictionary")),
                (Some(b'<'), Some(b'<')) => {
                    depth += 1;
                    self.pos += 2;
                }
                (Some(b'>'), Some(b'>')) => {
                    depth -= 1;
                    self.pos += 2;
                }
                (Some(b'('), _) => {
                    self.literal_string()?;
                }
                _ => self.pos += 1,
            }
        }
        Ok(())
    }

    fn name(&mut self) -> String {
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|b| !is_whitespace(b) && !is_delimiter(b)) {
            self.pos += 1;
        }

        let raw = &self.input[start..self.pos];
        let mut bytes = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'#' && i + 2 < raw.len() {
                if let (Some(hi), Some(lo)) = (hex_value(raw[i + 1]), hex_value(raw[i + 2])) {
                    bytes.push((hi << 4) | lo);
                    i += 3;
                    continue;
                }
            }
            bytes.push(raw[i]);
            i += 1;
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Numbers never fail: malformed ones (`--1`, `.`) read as zero, the way
    /// viewers treat them.
    fn number(&mut self) -> Operand {
        let start = self.pos;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut seen_dot = false;
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() || (b == b'.' && !seen_dot) {
                seen_dot |= b == b'.';
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.input[start..self.pos]).unwrap_or("0");
        Operand::Number(text.parse().unwrap_or(0.0))
    }

    fn keyword(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphabetic() || matches!(b, b'*' | b'\'' | b'"' | b'0' | b'1'))
        {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    /// Skip `... ID <binary> EI` after a `BI` keyword.
    fn skip_inline_image(&mut self) {
        while self.pos + 1 < self.input.len() {
            if self.input[self.pos] == b'I'
                && self.input[self.pos + 1] == b'D'
                && self.input.get(self.pos + 2).is_none_or(|b| is_whitespace(*b))
            {
                self.pos += 3;
                break;
            }
            self.pos += 1;
        }
        while self.pos + 1 < self.input.len() {
            let before_ok = self.pos == 0 || is_whitespace(self.input[self.pos - 1]);
            let after_ok = self.input.get(self.pos + 2).is_none_or(|b| is_whitespace(*b));
            if before_ok && after_ok && &self.input[self.pos..self.pos + 2] == b"EI" {
                self.pos += 2;
                return;
            }
            self.pos += 1;
        }
        self.pos = self.input.len();
    }
}
