//! Embedded fonts, text measurement, wrapping and auto-shrink.
//!
//! Translated glyphs are drawn in a caller-supplied TTF embedded as an
//! unsubsetted `Type0`/`CIDFontType2` composite font with `Identity-H`
//! encoding: content-stream CIDs are glyph ids, so no external CMap is
//! needed. Subsetting is off: the glyph set cannot be known at embed time
//! without a second pass over the document.
//!
//! Measurement is a trait seam so the layout math is testable without font
//! files.

use std::collections::BTreeSet;
use std::path::Path;

use ab_glyph::{Font, FontVec};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::core::errors::{Result, TranslateError};

/// Smallest font size the auto-shrink loop may settle on.
pub const MIN_FONT_SIZE: f32 = 6.0;

/// Line height as a multiple of font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Width of one character at a given font size, in PDF points.
///
/// `None` means the glyph cannot be measured (missing from the font); the
/// wrap algorithm substitutes half the font size.
pub trait TextMeasure {
    /// Advance width of `ch` at `font_size` points.
    fn char_width(&self, ch: char, font_size: f32) -> Option<f32>;
}

/// A TTF loaded for embedding: raw bytes for the `FontFile2` stream plus
/// parsed metrics for measurement.
pub struct EmbeddedFont {
    data: Vec<u8>,
    font: FontVec,
    units_per_em: f32,
    base_name: String,
}

impl EmbeddedFont {
    /// Reads and parses a TTF from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| TranslateError::asset(path.display().to_string(), e.to_string()))?;
        let font = FontVec::try_from_vec(data.clone()).map_err(|e| {
            TranslateError::asset(path.display().to_string(), format!("not a usable TTF: {e}"))
        })?;
        let units_per_em = font.units_per_em().ok_or_else(|| {
            TranslateError::asset(path.display().to_string(), "font reports no units per em")
        })?;
        let base_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().replace([' ', '(', ')'], "-"))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "EmbeddedCJK".to_string());
        Ok(Self {
            data,
            font,
            units_per_em,
            base_name,
        })
    }

    /// Glyph id for a character, `None` when the font has no glyph for it.
    pub fn glyph_id(&self, ch: char) -> Option<u16> {
        let id = self.font.glyph_id(ch);
        (id.0 != 0).then_some(id.0)
    }

    /// Encodes text as big-endian glyph ids for an `Identity-H` show string.
    /// Unmapped characters encode as glyph 0 (notdef).
    pub fn encode_text(&self, text: &str) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(text.len() * 2);
        for ch in text.chars() {
            let gid = self.font.glyph_id(ch).0;
            bytes.extend_from_slice(&gid.to_be_bytes());
        }
        bytes
    }

    fn advance_in_millis(&self, gid: u16) -> i64 {
        let advance = self.font.h_advance_unscaled(ab_glyph::GlyphId(gid));
        (advance * 1000.0 / self.units_per_em).round() as i64
    }

    /// Builds the full composite-font object chain in `doc` and returns the
    /// id of the `Type0` dictionary. `used` drives the `W` width array and
    /// the `ToUnicode` CMap; the font program itself is embedded whole.
    pub fn add_to_document(&self, doc: &mut Document, used: &BTreeSet<char>) -> ObjectId {
        let mut file_dict = Dictionary::new();
        file_dict.set("Length1", Object::Integer(self.data.len() as i64));
        let font_file_id = doc.add_object(Object::Stream(Stream::new(file_dict, self.data.clone())));

        let scale = 1000.0 / self.units_per_em;
        let ascent = (self.font.ascent_unscaled() * scale).round() as i64;
        let descent = (self.font.descent_unscaled() * scale).round() as i64;

        let mut descriptor = Dictionary::new();
        descriptor.set("Type", Object::Name(b"FontDescriptor".to_vec()));
        descriptor.set("FontName", Object::Name(self.base_name.clone().into_bytes()));
        descriptor.set("Flags", Object::Integer(4));
        descriptor.set(
            "FontBBox",
            Object::Array(vec![
                Object::Integer(-1000),
                Object::Integer(descent.min(-1)),
                Object::Integer(2000),
                Object::Integer(ascent.max(1)),
            ]),
        );
        descriptor.set("ItalicAngle", Object::Integer(0));
        descriptor.set("Ascent", Object::Integer(ascent));
        descriptor.set("Descent", Object::Integer(descent));
        descriptor.set("CapHeight", Object::Integer(ascent));
        descriptor.set("StemV", Object::Integer(80));
        descriptor.set("FontFile2", Object::Reference(font_file_id));
        let descriptor_id = doc.add_object(Object::Dictionary(descriptor));

        let mut cidfont = Dictionary::new();
        cidfont.set("Type", Object::Name(b"Font".to_vec()));
        cidfont.set("Subtype", Object::Name(b"CIDFontType2".to_vec()));
        cidfont.set("BaseFont", Object::Name(self.base_name.clone().into_bytes()));
        cidfont.set("CIDSystemInfo", Object::Dictionary({
            let mut info = Dictionary::new();
            info.set("Registry", Object::string_literal("Adobe"));
            info.set("Ordering", Object::string_literal("Identity"));
            info.set("Supplement", Object::Integer(0));
            info
        }));
        cidfont.set("FontDescriptor", Object::Reference(descriptor_id));
        cidfont.set("DW", Object::Integer(1000));
        cidfont.set("W", Object::Array(self.width_array(used)));
        cidfont.set("CIDToGIDMap", Object::Name(b"Identity".to_vec()));
        let cidfont_id = doc.add_object(Object::Dictionary(cidfont));

        let tounicode_id = doc.add_object(Object::Stream(Stream::new(
            Dictionary::new(),
            self.to_unicode_cmap(used),
        )));

        let mut type0 = Dictionary::new();
        type0.set("Type", Object::Name(b"Font".to_vec()));
        type0.set("Subtype", Object::Name(b"Type0".to_vec()));
        type0.set("BaseFont", Object::Name(self.base_name.clone().into_bytes()));
        type0.set("Encoding", Object::Name(b"Identity-H".to_vec()));
        type0.set("DescendantFonts", Object::Array(vec![Object::Reference(cidfont_id)]));
        type0.set("ToUnicode", Object::Reference(tounicode_id));
        doc.add_object(Object::Dictionary(type0))
    }

    fn width_array(&self, used: &BTreeSet<char>) -> Vec<Object> {
        let mut entries = Vec::new();
        let mut gids: Vec<u16> = used.iter().filter_map(|&ch| self.glyph_id(ch)).collect();
        gids.sort_unstable();
        gids.dedup();
        for gid in gids {
            entries.push(Object::Integer(gid as i64));
            entries.push(Object::Array(vec![Object::Integer(
                self.advance_in_millis(gid),
            )]));
        }
        entries
    }

    fn to_unicode_cmap(&self, used: &BTreeSet<char>) -> Vec<u8> {
        let mut mappings: Vec<(u16, char)> = used
            .iter()
            .filter_map(|&ch| self.glyph_id(ch).map(|gid| (gid, ch)))
            .collect();
        mappings.sort_unstable_by_key(|&(gid, _)| gid);
        mappings.dedup_by_key(|&mut (gid, _)| gid);

        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CIDSystemInfo\n\
             << /Registry (Adobe)\n\
             /Ordering (UCS)\n\
             /Supplement 0\n\
             >> def\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n\
             <0000> <FFFF>\n\
             endcodespacerange\n",
        );
        // bfchar blocks are limited to 100 entries by the CMap spec.
        for chunk in mappings.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for &(gid, ch) in chunk {
                let mut units = [0u16; 2];
                let encoded = ch.encode_utf16(&mut units);
                let hex: String = encoded.iter().map(|u| format!("{u:04X}")).collect();
                cmap.push_str(&format!("<{gid:04X}> <{hex}>\n"));
            }
            cmap.push_str("endbfchar\n");
        }
        cmap.push_str(
            "endcmap\n\
             CMapName currentdict /CMap defineresource pop\n\
             end\n\
             end",
        );
        cmap.into_bytes()
    }
}

impl TextMeasure for EmbeddedFont {
    fn char_width(&self, ch: char, font_size: f32) -> Option<f32> {
        let gid = self.glyph_id(ch)?;
        Some(self.font.h_advance_unscaled(ab_glyph::GlyphId(gid)) / self.units_per_em * font_size)
    }
}

/// The Helvetica fallback used when embedding fails: no metrics, every
/// character measures at the wrap algorithm's half-size default.
pub struct StandardFont;

impl StandardFont {
    /// Adds a plain `Type1` Helvetica dictionary to the document.
    pub fn add_to_document(doc: &mut Document) -> ObjectId {
        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(b"Type1".to_vec()));
        font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
        font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        doc.add_object(Object::Dictionary(font))
    }

    /// Encodes text for a literal show string, replacing non-ASCII
    /// characters the base font cannot address.
    pub fn encode_text(text: &str) -> Vec<u8> {
        text.chars()
            .map(|ch| if ch.is_ascii() { ch as u8 } else { b'?' })
            .collect()
    }
}

impl TextMeasure for StandardFont {
    fn char_width(&self, _ch: char, _font_size: f32) -> Option<f32> {
        None
    }
}

/// Wraps text into lines no wider than `max_width`.
///
/// The accumulator works character by character, so CJK text with no word
/// boundaries wraps correctly. Newlines force breaks. A character that
/// cannot be measured counts as half the font size. A line is committed
/// when the next character would overflow it and it is non-empty, so a
/// single oversized character still lands on its own line.
pub fn wrap_lines(
    text: &str,
    font_size: f32,
    max_width: f32,
    measure: &dyn TextMeasure,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0f32;

    for ch in text.chars() {
        if ch == '\n' {
            lines.push(std::mem::take(&mut current));
            current_width = 0.0;
            continue;
        }
        let width = measure
            .char_width(ch, font_size)
            .unwrap_or(font_size * 0.5);
        if current_width + width > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_width = 0.0;
        }
        current.push(ch);
        current_width += width;
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Shrinks the font size in half-point steps until the wrapped text fits
/// `avail_height`, stopping at [`MIN_FONT_SIZE`].
pub fn fit_font_size(
    text: &str,
    target_size: f32,
    avail_width: f32,
    avail_height: f32,
    measure: &dyn TextMeasure,
) -> f32 {
    let mut size = target_size.max(MIN_FONT_SIZE);
    loop {
        let lines = wrap_lines(text, size, avail_width, measure).len() as f32;
        if lines * size * LINE_HEIGHT_FACTOR <= avail_height || size <= MIN_FONT_SIZE {
            return size;
        }
        size = (size - 0.5).max(MIN_FONT_SIZE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every character half an em wide, like the fallback path.
    struct HalfEm;

    impl TextMeasure for HalfEm {
        fn char_width(&self, _ch: char, font_size: f32) -> Option<f32> {
            Some(font_size * 0.5)
        }
    }

    #[test]
    fn wrap_breaks_at_width() {
        // 10 pt font, 5 pt per char, 20 pt wide: 4 chars per line.
        let lines = wrap_lines("abcdefghij", 10.0, 20.0, &HalfEm);
        assert_eq!(lines, ["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wrap_honors_newlines() {
        let lines = wrap_lines("ab\ncd", 10.0, 100.0, &HalfEm);
        assert_eq!(lines, ["ab", "cd"]);
    }

    #[test]
    fn oversized_character_gets_its_own_line() {
        // Each char wider than the box; must still make progress.
        let lines = wrap_lines("xyz", 10.0, 2.0, &HalfEm);
        assert_eq!(lines, ["x", "y", "z"]);
    }

    #[test]
    fn unmeasurable_chars_fall_back_to_half_size() {
        struct NoGlyphs;
        impl TextMeasure for NoGlyphs {
            fn char_width(&self, _: char, _: f32) -> Option<f32> {
                None
            }
        }
        let lines = wrap_lines("abcd", 10.0, 10.0, &NoGlyphs);
        assert_eq!(lines, ["ab", "cd"]);
    }

    #[test]
    fn fit_shrinks_until_text_fits() {
        // 40 chars at 12 pt in a 100 x 30 box cannot fit; shrinking must
        // terminate at or above the floor.
        let text = "a".repeat(40);
        let size = fit_font_size(&text, 12.0, 100.0, 30.0, &HalfEm);
        assert!(size >= MIN_FONT_SIZE);
        assert!(size < 12.0);
        let lines = wrap_lines(&text, size, 100.0, &HalfEm).len() as f32;
        let fits = lines * size * LINE_HEIGHT_FACTOR <= 30.0;
        assert!(fits || size == MIN_FONT_SIZE);
    }

    #[test]
    fn single_character_always_fits_without_shrinking() {
        let size = fit_font_size("字", 10.0, 40.0, 40.0, &HalfEm);
        assert_eq!(size, 10.0);
    }

    #[test]
    fn fit_never_goes_below_floor() {
        let text = "x".repeat(10_000);
        let size = fit_font_size(&text, 14.0, 20.0, 10.0, &HalfEm);
        assert_eq!(size, MIN_FONT_SIZE);
    }

    #[test]
    fn standard_font_replaces_non_ascii() {
        assert_eq!(StandardFont::encode_text("a字b"), b"a?b".to_vec());
    }
}
