//! Layout classes of the DocLayout-YOLO model.

use std::fmt;

/// The ten document-structural classes, in the model's declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutLabel {
    /// Document or section title.
    Title,
    /// Body paragraph text.
    PlainText,
    /// Content to ignore (headers, footers, page numbers).
    Abandon,
    /// Figure image.
    Figure,
    /// Caption under a figure.
    FigureCaption,
    /// Table body.
    Table,
    /// Caption above or below a table.
    TableCaption,
    /// Footnote attached to a table.
    TableFootnote,
    /// Display formula.
    IsolateFormula,
    /// Numbering or caption of a formula.
    FormulaCaption,
}

impl LayoutLabel {
    const ALL: [LayoutLabel; 10] = [
        LayoutLabel::Title,
        LayoutLabel::PlainText,
        LayoutLabel::Abandon,
        LayoutLabel::Figure,
        LayoutLabel::FigureCaption,
        LayoutLabel::Table,
        LayoutLabel::TableCaption,
        LayoutLabel::TableFootnote,
        LayoutLabel::IsolateFormula,
        LayoutLabel::FormulaCaption,
    ];

    /// Number of classes the model predicts.
    pub const fn count() -> usize {
        Self::ALL.len()
    }

    /// Maps a class id to its label. Out-of-range ids fall back to
    /// [`LayoutLabel::PlainText`].
    pub fn from_class_id(id: usize) -> Self {
        Self::ALL.get(id).copied().unwrap_or(LayoutLabel::PlainText)
    }

    /// Canonical class name string.
    pub fn name(self) -> &'static str {
        match self {
            LayoutLabel::Title => "title",
            LayoutLabel::PlainText => "plain_text",
            LayoutLabel::Abandon => "abandon",
            LayoutLabel::Figure => "figure",
            LayoutLabel::FigureCaption => "figure_caption",
            LayoutLabel::Table => "table",
            LayoutLabel::TableCaption => "table_caption",
            LayoutLabel::TableFootnote => "table_footnote",
            LayoutLabel::IsolateFormula => "isolate_formula",
            LayoutLabel::FormulaCaption => "formula_caption",
        }
    }

    /// True for classes whose text content gets translated. Figures, tables
    /// and formulas keep their original rendering; `abandon` regions are
    /// skipped entirely.
    pub fn is_translatable(self) -> bool {
        matches!(
            self,
            LayoutLabel::Title
                | LayoutLabel::PlainText
                | LayoutLabel::FigureCaption
                | LayoutLabel::TableCaption
                | LayoutLabel::TableFootnote
                | LayoutLabel::FormulaCaption
        )
    }

    /// True for the classes that contribute to the page's uniform body font
    /// size: everything translatable except titles.
    pub fn is_body(self) -> bool {
        self.is_translatable() && self != LayoutLabel::Title
    }
}

impl fmt::Display for LayoutLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_ids_map_in_declaration_order() {
        assert_eq!(LayoutLabel::from_class_id(0), LayoutLabel::Title);
        assert_eq!(LayoutLabel::from_class_id(4), LayoutLabel::FigureCaption);
        assert_eq!(LayoutLabel::from_class_id(9), LayoutLabel::FormulaCaption);
    }

    #[test]
    fn out_of_range_ids_default_to_plain_text() {
        assert_eq!(LayoutLabel::from_class_id(10), LayoutLabel::PlainText);
        assert_eq!(LayoutLabel::from_class_id(usize::MAX), LayoutLabel::PlainText);
    }

    #[test]
    fn translatable_subset() {
        let translatable: Vec<&str> = (0..LayoutLabel::count())
            .map(LayoutLabel::from_class_id)
            .filter(|l| l.is_translatable())
            .map(|l| l.name())
            .collect();
        assert_eq!(
            translatable,
            [
                "title",
                "plain_text",
                "figure_caption",
                "table_caption",
                "table_footnote",
                "formula_caption"
            ]
        );
    }

    #[test]
    fn titles_are_not_body() {
        assert!(!LayoutLabel::Title.is_body());
        assert!(LayoutLabel::PlainText.is_body());
        assert!(!LayoutLabel::Figure.is_body());
    }
}
