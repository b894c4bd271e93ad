use serde::{Deserialize, Serialize};

use crate::color::{HexColor, MIN_CONTRAST, contrast_ratio, correct_foreground};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PaletteSlot {
    Primary,
    Secondary,
    Accent,
    Background,
    Surface,
    Text,
    TextMuted,
    Border,
}

impl PaletteSlot {
    /// Wire name of the slot.
    pub fn as_str(self) -> &'static str {
        match self {
            PaletteSlot::Primary => "primary",
            PaletteSlot::Secondary => "secondary",
            PaletteSlot::Accent => "accent",
            PaletteSlot::Background => "background",
            PaletteSlot::Surface => "surface",
            PaletteSlot::Text => "text",
            PaletteSlot::TextMuted => "textMuted",
            PaletteSlot::Border => "border",
        }
    }
}

/// Foreground/background pairs that must stay readable.
pub const CONTRAST_PAIRS: [(PaletteSlot, PaletteSlot); 3] = [
    (PaletteSlot::Text, PaletteSlot::Background),
    (PaletteSlot::TextMuted, PaletteSlot::Background),
    (PaletteSlot::Primary, PaletteSlot::Background),
];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Palette {
    pub primary: HexColor,
    pub secondary: HexColor,
    pub accent: HexColor,
    pub background: HexColor,
    pub surface: HexColor,
    pub text: HexColor,
    pub text_muted: HexColor,
    pub border: HexColor,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: HexColor::rgb(0x1D, 0x4E, 0xD8),
            secondary: HexColor::rgb(0x0F, 0x76, 0x6E),
            accent: HexColor::rgb(0xD9, 0x77, 0x06),
            background: HexColor::rgb(0xFF, 0xFF, 0xFF),
            surface: HexColor::rgb(0xF8, 0xFA, 0xFC),
            text: HexColor::rgb(0x0F, 0x17, 0x2A),
            text_muted: HexColor::rgb(0x47, 0x55, 0x69),
            border: HexColor::rgb(0xE2, 0xE8, 0xF0),
        }
    }
}

/// A correction made to keep a pair readable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContrastFix {
    pub slot: &'static str,
    pub against: &'static str,
    pub from: HexColor,
    pub to: HexColor,
    pub ratio_before: f64,
    pub ratio_after: f64,
}

impl Palette {
    pub fn get(&self, slot: PaletteSlot) -> HexColor {
        match slot {
            PaletteSlot::Primary => self.primary,
            PaletteSlot::Secondary => self.secondary,
            PaletteSlot::Accent => self.accent,
            PaletteSlot::Background => self.background,
            PaletteSlot::Surface => self.surface,
            PaletteSlot::Text => self.text,
            PaletteSlot::TextMuted => self.text_muted,
            PaletteSlot::Border => self.border,
        }
    }

    fn slot_mut(&mut self, slot: PaletteSlot) -> &mut HexColor {
        match slot {
            PaletteSlot::Primary => &mut self.primary,
            PaletteSlot::Secondary => &mut self.secondary,
            PaletteSlot::Accent => &mut self.accent,
            PaletteSlot::Background => &mut self.background,
            PaletteSlot::Surface => &mut self.surface,
            PaletteSlot::Text => &mut self.text,
            PaletteSlot::TextMuted => &mut self.text_muted,
            PaletteSlot::Border => &mut self.border,
        }
    }

    pub fn merged(&self, patch: &PalettePatch) -> Palette {
        let mut next = *self;
        for (slot, color) in patch.entries() {
            *next.slot_mut(slot) = color;
        }
        next
    }

    /// Correct every failing foreground in [`CONTRAST_PAIRS`]; backgrounds are never
    /// changed. Returns the corrected palette and what was changed.
    pub fn corrected(&self) -> (Palette, Vec<ContrastFix>) {
        let mut next = *self;
        let mut fixes = Vec::new();
        for (fg_slot, bg_slot) in CONTRAST_PAIRS {
            let fg = next.get(fg_slot);
            let bg = next.get(bg_slot);
            let before = contrast_ratio(fg, bg);
            if before >= MIN_CONTRAST {
                continue;
            }
            let fixed = correct_foreground(fg, bg, MIN_CONTRAST);
            *next.slot_mut(fg_slot) = fixed;
            fixes.push(ContrastFix {
                slot: fg_slot.as_str(),
                against: bg_slot.as_str(),
                from: fg,
                to: fixed,
                ratio_before: before,
                ratio_after: contrast_ratio(fixed, bg),
            });
        }
        (next, fixes)
    }
}

/// Partial palette update; absent slots are left alone.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PalettePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<HexColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<HexColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent: Option<HexColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<HexColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface: Option<HexColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<HexColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_muted: Option<HexColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<HexColor>,
}

impl PalettePatch {
    pub fn entries(&self) -> impl Iterator<Item = (PaletteSlot, HexColor)> {
        [
            (PaletteSlot::Primary, self.primary),
            (PaletteSlot::Secondary, self.secondary),
            (PaletteSlot::Accent, self.accent),
            (PaletteSlot::Background, self.background),
            (PaletteSlot::Surface, self.surface),
            (PaletteSlot::Text, self.text),
            (PaletteSlot::TextMuted, self.text_muted),
            (PaletteSlot::Border, self.border),
        ]
        .into_iter()
        .filter_map(|(slot, c)| c.map(|c| (slot, c)))
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    pub fn set(&mut self, slot: PaletteSlot, color: HexColor) {
        let field = match slot {
            PaletteSlot::Primary => &mut self.primary,
            PaletteSlot::Secondary => &mut self.secondary,
            PaletteSlot::Accent => &mut self.accent,
            PaletteSlot::Background => &mut self.background,
            PaletteSlot::Surface => &mut self.surface,
            PaletteSlot::Text => &mut self.text,
            PaletteSlot::TextMuted => &mut self.text_muted,
            PaletteSlot::Border => &mut self.border,
        };
        *field = Some(color);
    }

    /// Merge over `current`, correct contrast, and return a patch that carries the
    /// corrected foregrounds. `None` when no correction was needed.
    pub fn with_contrast_fixes(&self, current: &Palette) -> Option<(PalettePatch, Vec<ContrastFix>)> {
        let merged = current.merged(self);
        let (corrected, fixes) = merged.corrected();
        if fixes.is_empty() {
            return None;
        }
        let mut patch = *self;
        for (fg, _) in CONTRAST_PAIRS {
            if corrected.get(fg) != merged.get(fg) {
                patch.set(fg, corrected.get(fg));
            }
        }
        Some((patch, fixes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> HexColor {
        s.parse().unwrap()
    }

    #[test]
    fn default_palette_is_compliant() {
        let (fixed, fixes) = Palette::default().corrected();
        assert!(fixes.is_empty());
        assert_eq!(fixed, Palette::default());
    }

    #[test]
    fn merge_touches_only_patched_slots() {
        let patch = PalettePatch {
            accent: Some(hex("#FF00AA")),
            ..PalettePatch::default()
        };
        let merged = Palette::default().merged(&patch);
        assert_eq!(merged.accent, hex("#FF00AA"));
        assert_eq!(merged.text, Palette::default().text);
    }

    #[test]
    fn unreadable_text_patch_gets_fixed() {
        let patch = PalettePatch {
            text: Some(hex("#FFFFFF")),
            background: Some(hex("#FAFAFA")),
            ..PalettePatch::default()
        };
        let (fixed, fixes) = patch.with_contrast_fixes(&Palette::default()).unwrap();
        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes[0].slot, "text");
        assert_eq!(fixed.background, Some(hex("#FAFAFA")));
        let text = fixed.text.unwrap();
        assert!(contrast_ratio(text, hex("#FAFAFA")) >= MIN_CONTRAST);
    }

    #[test]
    fn dark_background_fixes_untouched_foregrounds() {
        // Only the background changes; the default dark text now fails against it.
        let patch = PalettePatch {
            background: Some(hex("#1A1A1A")),
            ..PalettePatch::default()
        };
        let (fixed, fixes) = patch.with_contrast_fixes(&Palette::default()).unwrap();
        assert!(fixes.iter().any(|f| f.slot == "text"));
        let merged = Palette::default().merged(&fixed);
        for (fg, bg) in CONTRAST_PAIRS {
            assert!(contrast_ratio(merged.get(fg), merged.get(bg)) >= MIN_CONTRAST);
        }
    }

    #[test]
    fn compliant_patch_needs_no_fix() {
        let patch = PalettePatch {
            text: Some(hex("#111111")),
            ..PalettePatch::default()
        };
        assert!(patch.with_contrast_fixes(&Palette::default()).is_none());
    }

    #[test]
    fn patch_wire_form_is_camel_case() {
        let patch: PalettePatch =
            serde_json::from_value(serde_json::json!({ "textMuted": "#666" })).unwrap();
        assert_eq!(patch.text_muted, Some(hex("#666666")));
        assert!(!patch.is_empty());
    }
}
