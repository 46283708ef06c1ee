//! Turns warnings and outcomes into ordered advice for the caller.

use crate::domain::{CharacteristicDecision, CharacteristicSet, ValidationReport};

const ADVICE: &[(&[&str], &str)] = &[
    (&["too dark"], "Take the photo in brighter, even light"),
    (&["too bright"], "Avoid strong direct light or flash"),
    (
        &["soft", "could be clearer", "blur"],
        "Hold the camera steady and make sure the face is in focus",
    ),
    (&["noisy"], "Use better lighting to reduce grain"),
    (&["contrast"], "Avoid flat or hazy lighting"),
    (&["colour cast", "washed out", "oversaturated"], "Use natural light without coloured filters"),
    (&["compression", "banding"], "Upload the original photo rather than a compressed copy"),
    (&["filter", "edited", "editing software"], "Upload the original photo without filters"),
    (&["not square", "far from square"], "Use a square photo with the face centred"),
    (&["off-center", "unbalanced"], "Centre the face in the frame"),
    (&["background"], "Use a plain background"),
    (&["small in the frame"], "Move closer so the face fills more of the frame"),
    (&["eyes"], "Make sure both eyes are open and visible"),
    (&["turned away"], "Face the camera directly"),
    (&["headwear", "eyewear"], "Remove hats and sunglasses"),
    (&["watermark", "text overlay"], "Use a photo without text or watermarks"),
    (&["recent photo"], "Use a recent photo"),
];

/// Advice for callers, most important first and without duplicates.
#[must_use]
pub fn recommendations(
    report: &ValidationReport,
    warnings: &[String],
    characteristics: Option<&CharacteristicSet>,
    enhancement_applied: bool,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |advice: &str| {
        if !out.iter().any(|a| a == advice) {
            out.push(advice.to_string());
        }
    };

    if !report.is_valid {
        push(report.user_friendly_message.as_str());
    }
    for warning in warnings {
        let lower = warning.to_lowercase();
        for &(needles, advice) in ADVICE {
            if needles.iter().any(|n| lower.contains(n)) {
                push(advice);
            }
        }
    }
    match characteristics.map(|c| c.decision) {
        Some(CharacteristicDecision::RequestEnhancement) => {
            push("A clearer, well-lit photo would improve personalisation accuracy");
        }
        Some(CharacteristicDecision::WarnInaccurate) => {
            push("Upload a clearer photo so personal characteristics can be identified reliably");
        }
        _ => {}
    }
    if enhancement_applied {
        push("An enhanced version of your photo was prepared automatically");
    }
    out
}
