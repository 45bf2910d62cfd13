//! Character encoding selection for legacy text sources.
//!
//! Price lists arrive as UTF-8, Windows code pages or ISO-8859 files, often
//! without any declaration. [`decode_best`] decodes the bytes with every
//! candidate and keeps the text that looks most like real (Greek or Latin)
//! prose. Decoding never fails; garbage input yields garbage text with
//! replacement characters, and empty input yields an empty string.

use encoding_rs::{Encoding, ISO_8859_7, UTF_8, WINDOWS_1252, WINDOWS_1253};
use quotekit_core::{ExtractWarning, ExtractWarningCode};

/// A candidate text encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// An encoding known to `encoding_rs`.
    Standard(&'static Encoding),
    /// ISO-8859-1, which `encoding_rs` folds into windows-1252; decoded
    /// byte-for-byte here.
    Latin1,
}

impl TextEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Standard(enc) => enc.name(),
            TextEncoding::Latin1 => "ISO-8859-1",
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Standard(enc) => enc.decode_without_bom_handling(bytes).0.into_owned(),
            TextEncoding::Latin1 => bytes.iter().map(|b| char::from(*b)).collect(),
        }
    }
}

/// Candidates in tie-break order: earlier wins on equal score.
pub const CANDIDATES: [TextEncoding; 5] = [
    TextEncoding::Standard(UTF_8),
    TextEncoding::Standard(WINDOWS_1252),
    TextEncoding::Standard(WINDOWS_1253),
    TextEncoding::Standard(ISO_8859_7),
    TextEncoding::Latin1,
];

/// Text decoded by [`decode_best`] together with how it was decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: TextEncoding,
    pub score: i64,
    /// A byte order mark decided the encoding.
    pub from_bom: bool,
}

impl DecodedText {
    /// A warning when a legacy code page won but still left undecodable
    /// bytes behind.
    pub fn fallback_warning(&self) -> Option<ExtractWarning> {
        let lossy = !self.from_bom
            && self.encoding != TextEncoding::Standard(UTF_8)
            && self.text.contains('\u{FFFD}');
        lossy.then(|| {
            ExtractWarning::with_code(
                ExtractWarningCode::EncodingFallback,
                format!(
                    "no encoding decoded the text cleanly; used {}",
                    self.encoding.name()
                ),
            )
            .on_page(0)
        })
    }
}

const RTF_MARKER_BONUS: i64 = 50;
const GREEK_LETTER_BONUS: i64 = 2;
const GARBAGE_PENALTY: i64 = 10;

fn is_greek(c: char) -> bool {
    matches!(c, '\u{0370}'..='\u{03FF}' | '\u{1F00}'..='\u{1FFF}')
}

/// Heuristic plausibility of decoded text.
///
/// +50 for an RTF header, +2 per Greek letter, −10 per replacement character
/// and per mojibake pair (`Ã`, `Î` or `Ï` followed by a non-ASCII character,
/// the signature of UTF-8 read as a single-byte code page).
pub fn score_text(text: &str) -> i64 {
    let mut score = 0;
    if text.contains("{\\rtf") {
        score += RTF_MARKER_BONUS;
    }
    let mut prev = None;
    for c in text.chars() {
        if is_greek(c) {
            score += GREEK_LETTER_BONUS;
        } else if c == '\u{FFFD}' {
            score -= GARBAGE_PENALTY;
        }
        if matches!(prev, Some('Ã' | 'Î' | 'Ï')) && !c.is_ascii() {
            score -= GARBAGE_PENALTY;
        }
        prev = Some(c);
    }
    score
}

/// Non-ASCII characters in `bytes` if they are valid UTF-8, else zero.
///
/// Each one is a mojibake sequence when the bytes are read with a
/// single-byte code page.
fn utf8_sequences(bytes: &[u8]) -> i64 {
    std::str::from_utf8(bytes).map_or(0, |s| s.chars().filter(|c| !c.is_ascii()).count() as i64)
}

/// Decode `bytes` with the best-scoring candidate encoding.
///
/// A UTF-8 or UTF-16 byte order mark short-circuits the scoring.
pub fn decode_best(bytes: &[u8]) -> DecodedText {
    if let Some((enc, bom_len)) = Encoding::for_bom(bytes) {
        let text = enc.decode_without_bom_handling(&bytes[bom_len..]).0.into_owned();
        return DecodedText {
            score: score_text(&text),
            text,
            encoding: TextEncoding::Standard(enc),
            from_bom: true,
        };
    }

    let multibyte = utf8_sequences(bytes);
    let mut best: Option<DecodedText> = None;
    for encoding in CANDIDATES {
        let text = encoding.decode(bytes);
        let mut score = score_text(&text);
        if encoding != TextEncoding::Standard(UTF_8) {
            score -= multibyte * GARBAGE_PENALTY;
        }
        if best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(DecodedText {
                text,
                encoding,
                score,
                from_bom: false,
            });
        }
    }

    let best = best.unwrap_or(DecodedText {
        text: String::new(),
        encoding: TextEncoding::Standard(UTF_8),
        score: 0,
        from_bom: false,
    });
    tracing::debug!(encoding = best.encoding.name(), score = best.score, "selected text encoding");
    best
}

/// Pick the best candidate for `bytes` without keeping the text.
pub fn detect_encoding(bytes: &[u8]) -> TextEncoding {
    decode_best(bytes).encoding
}

/// Map a Windows code page number (as in RTF `\ansicpgNNNN`) to an encoding.
pub fn encoding_for_codepage(codepage: u32) -> Option<TextEncoding> {
    match codepage {
        65001 => Some(TextEncoding::Standard(UTF_8)),
        28591 => Some(TextEncoding::Latin1),
        28597 => Some(TextEncoding::Standard(ISO_8859_7)),
        874 | 1250..=1258 => {
            Encoding::for_label(format!("windows-{codepage}").as_bytes()).map(TextEncoding::Standard)
        }
        _ => None,
    }
}
