//! Text and graphics state tracked while walking a content stream.
//!
//! Only what is needed to place text runs on the page is modelled: the
//! current transformation matrix, the text and line matrices, the selected
//! font and the text spacing parameters.

/// A PDF transformation matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn from_array([a, b, c, d, e, f]: [f64; 6]) -> Self {
        Self::new(a, b, c, d, e, f)
    }

    pub const fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }
}

/// Text parameters that belong to the graphics state (saved by `q`).
#[derive(Debug, Clone, PartialEq)]
pub struct TextParams {
    /// `Tc`
    pub char_spacing: f64,
    /// `Tw`
    pub word_spacing: f64,
    /// `Tz`, as a fraction (1.0 = 100%).
    pub horizontal_scale: f64,
    /// `TL`
    pub leading: f64,
    /// `Ts`
    pub rise: f64,
    /// Resource name selected by `Tf`.
    pub font: Option<String>,
    pub font_size: f64,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
            font: None,
            font_size: 0.0,
        }
    }
}

/// Average glyph advance, in text space units per unit of font size.
///
/// Real widths need font metrics; runs only need to move forward plausibly
/// so that consecutive `Tj`s without repositioning do not collapse.
const AVERAGE_ADVANCE: f64 = 0.5;

/// Graphics and text state with a `q`/`Q` save stack.
#[derive(Debug, Clone, Default)]
pub struct TextState {
    pub ctm: Matrix,
    pub params: TextParams,
    text_matrix: Matrix,
    line_matrix: Matrix,
    saved: Vec<(Matrix, TextParams)>,
}

impl TextState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A state starting from `ctm`, e.g. inside a form XObject.
    pub fn with_ctm(ctm: Matrix) -> Self {
        Self {
            ctm,
            ..Self::default()
        }
    }

    /// `q`
    pub fn save(&mut self) {
        self.saved.push((self.ctm, self.params.clone()));
    }

    /// `Q`. An unbalanced `Q` is ignored.
    pub fn restore(&mut self) {
        if let Some((ctm, params)) = self.saved.pop() {
            self.ctm = ctm;
            self.params = params;
        }
    }

    /// `cm`
    pub fn concat(&mut self, m: Matrix) {
        self.ctm = m.then(&self.ctm);
    }

    /// `BT`
    pub fn begin_text(&mut self) {
        self.text_matrix = Matrix::IDENTITY;
        self.line_matrix = Matrix::IDENTITY;
    }

    /// `Tm`
    pub fn set_text_matrix(&mut self, m: Matrix) {
        self.text_matrix = m;
        self.line_matrix = m;
    }

    /// `Td`
    pub fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// `TD`
    pub fn move_line_set_leading(&mut self, tx: f64, ty: f64) {
        self.params.leading = -ty;
        self.move_line(tx, ty);
    }

    /// `T*`
    pub fn next_line(&mut self) {
        self.move_line(0.0, -self.params.leading);
    }

    /// Where the next glyph's origin lands in page space.
    pub fn origin(&self) -> (f64, f64) {
        let (x, y) = self.text_matrix.apply(0.0, self.params.rise);
        self.ctm.apply(x, y)
    }

    /// Move the text matrix past `text`, using an average glyph width.
    pub fn advance_text(&mut self, text: &str) {
        let p = &self.params;
        let glyphs = text.chars().count() as f64;
        let spaces = text.chars().filter(|c| *c == ' ').count() as f64;
        let tx = (glyphs * (AVERAGE_ADVANCE * p.font_size + p.char_spacing)
            + spaces * p.word_spacing)
            * p.horizontal_scale;
        self.advance(tx);
    }

    /// Apply a `TJ` adjustment given in thousandths of text space.
    pub fn adjust(&mut self, thousandths: f64) {
        let tx = -thousandths / 1000.0 * self.params.font_size * self.params.horizontal_scale;
        self.advance(tx);
    }

    fn advance(&mut self, tx: f64) {
        self.text_matrix = Matrix::translation(tx, 0.0).then(&self.text_matrix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_point(actual: (f64, f64), expected: (f64, f64)) {
        assert!(
            (actual.0 - expected.0).abs() < 1e-9 && (actual.1 - expected.1).abs() < 1e-9,
            "{actual:?} != {expected:?}"
        );
    }

    #[test]
    fn matrix_then_translates_after_scaling() {
        let scale = Matrix::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let shift = Matrix::translation(10.0, 5.0);
        assert_point(scale.then(&shift).apply(1.0, 1.0), (12.0, 7.0));
        assert_point(shift.then(&scale).apply(1.0, 1.0), (22.0, 12.0));
    }

    #[test]
    fn td_moves_relative_to_line_start() {
        let mut ts = TextState::new();
        ts.begin_text();
        ts.move_line(72.0, 700.0);
        ts.move_line(0.0, -14.0);
        assert_point(ts.origin(), (72.0, 686.0));
    }

    #[test]
    fn t_star_uses_leading() {
        let mut ts = TextState::new();
        ts.begin_text();
        ts.set_text_matrix(Matrix::translation(50.0, 500.0));
        ts.move_line_set_leading(0.0, -12.0);
        ts.next_line();
        assert_point(ts.origin(), (50.0, 476.0));
    }

    #[test]
    fn ctm_applies_to_origin() {
        let mut ts = TextState::new();
        ts.concat(Matrix::translation(100.0, 0.0));
        ts.begin_text();
        ts.move_line(10.0, 20.0);
        assert_point(ts.origin(), (110.0, 20.0));
    }

    #[test]
    fn save_restore_ctm_and_font() {
        let mut ts = TextState::new();
        ts.params.font = Some("F1".to_string());
        ts.save();
        ts.concat(Matrix::translation(5.0, 5.0));
        ts.params.font = Some("F2".to_string());
        ts.restore();
        assert_eq!(ts.ctm, Matrix::IDENTITY);
        assert_eq!(ts.params.font.as_deref(), Some("F1"));
        ts.restore();
        assert_eq!(ts.ctm, Matrix::IDENTITY);
    }

    #[test]
    fn advance_moves_right() {
        let mut ts = TextState::new();
        ts.params.font_size = 10.0;
        ts.begin_text();
        ts.advance_text("abcd");
        assert_point(ts.origin(), (20.0, 0.0));
        ts.adjust(-1000.0);
        assert_point(ts.origin(), (30.0, 0.0));
    }

    #[test]
    fn begin_text_resets_text_matrix() {
        let mut ts = TextState::new();
        ts.begin_text();
        ts.move_line(5.0, 5.0);
        ts.begin_text();
        assert_point(ts.origin(), (0.0, 0.0));
    }
}
