use serde_json::json;

use storecraft_core::DomainError;

use super::Verdict;
use crate::action::Action;
use crate::snapshot::Snapshot;

/// Palette updates are merged over the snapshot palette and repaired for contrast;
/// font updates must name both faces non-empty when given.
pub fn validate_design(action: &Action, snapshot: &Snapshot) -> Verdict {
    match action {
        Action::DesignUpdatePalette(patch) => {
            if patch.is_empty() {
                return Verdict::Invalid(DomainError::validation(
                    "palette update must set at least one color",
                ));
            }
            match patch.with_contrast_fixes(&snapshot.palette()) {
                None => Verdict::Valid,
                Some((fixed, fixes)) => Verdict::Fixed {
                    action: Action::DesignUpdatePalette(fixed),
                    details: json!({ "contrastFixes": fixes }),
                },
            }
        }
        Action::DesignUpdateFonts(patch) => Verdict::from_result(patch.validate()),
        _ => Verdict::Valid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storecraft_design::{
        HexColor, MIN_CONTRAST, Palette, PalettePatch, StoreConfig, contrast_ratio,
    };

    fn hex(s: &str) -> HexColor {
        s.parse().unwrap()
    }

    fn palette_action(text: &str, background: &str) -> Action {
        Action::DesignUpdatePalette(PalettePatch {
            text: Some(hex(text)),
            background: Some(hex(background)),
            ..PalettePatch::default()
        })
    }

    fn fixed_patch(verdict: Verdict) -> PalettePatch {
        match verdict {
            Verdict::Fixed {
                action: Action::DesignUpdatePalette(patch),
                ..
            } => patch,
            other => panic!("expected a fixed palette, got {other:?}"),
        }
    }

    #[test]
    fn white_on_near_white_is_darkened() {
        let verdict = validate_design(&palette_action("#FFFFFF", "#FAFAFA"), &Snapshot::default());
        let patch = fixed_patch(verdict);
        let text = patch.text.unwrap();
        assert!(contrast_ratio(text, hex("#FAFAFA")) >= MIN_CONTRAST);
        assert_eq!(patch.background, Some(hex("#FAFAFA")));
    }

    #[test]
    fn black_on_near_black_is_lightened() {
        let verdict = validate_design(&palette_action("#000000", "#1A1A1A"), &Snapshot::default());
        let patch = fixed_patch(verdict);
        assert!(contrast_ratio(patch.text.unwrap(), hex("#1A1A1A")) >= MIN_CONTRAST);
    }

    #[test]
    fn compliant_palette_passes_unchanged() {
        let verdict = validate_design(&palette_action("#111111", "#FFFFFF"), &Snapshot::default());
        assert_eq!(verdict, Verdict::Valid);
    }

    #[test]
    fn background_change_is_checked_against_current_foregrounds() {
        // Only the background moves; the stored dark text becomes unreadable.
        let snapshot = Snapshot {
            store_config: Some(StoreConfig {
                palette: Palette {
                    text: hex("#101010"),
                    ..Palette::default()
                },
                ..StoreConfig::default()
            }),
            ..Snapshot::default()
        };
        let action = Action::DesignUpdatePalette(PalettePatch {
            background: Some(hex("#0A0A0A")),
            ..PalettePatch::default()
        });
        let patch = fixed_patch(validate_design(&action, &snapshot));
        assert!(contrast_ratio(patch.text.unwrap(), hex("#0A0A0A")) >= MIN_CONTRAST);
    }

    #[test]
    fn empty_palette_update_is_rejected() {
        let verdict = validate_design(
            &Action::DesignUpdatePalette(PalettePatch::default()),
            &Snapshot::default(),
        );
        assert!(matches!(verdict, Verdict::Invalid(DomainError::Validation(_))));
    }

    #[test]
    fn blank_font_name_is_rejected() {
        let action = Action::DesignUpdateFonts(storecraft_design::FontsPatch {
            display: Some("  ".into()),
            body: None,
        });
        assert!(matches!(
            validate_design(&action, &Snapshot::default()),
            Verdict::Invalid(_)
        ));
    }
}
