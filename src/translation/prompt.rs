/*!
 * Prompt construction.
 */

use super::TranslationUnit;

/// Token the model is asked to place between translations
pub const SEGMENT_SEPARATOR: &str = "[[--SEGMENT-BREAK--]]";

/// Build a single prompt asking for a Persian translation of every unit, in
/// order, separated by [`SEGMENT_SEPARATOR`]
pub fn build_prompt(tone: &str, units: &[TranslationUnit]) -> String {
    let mut prompt = format!(
        "Translate the following {count} texts into Persian (Farsi). Use a {tone} tone.\n\
         Return exactly {count} translations in the same order, separated by the line {sep}.\n\
         Do not number the translations, do not repeat the source texts and do not add any explanation.\n\n",
        count = units.len(),
        tone = tone.trim(),
        sep = SEGMENT_SEPARATOR,
    );

    for (index, unit) in units.iter().enumerate() {
        if index > 0 {
            prompt.push('\n');
            prompt.push_str(SEGMENT_SEPARATOR);
            prompt.push('\n');
        }
        prompt.push_str(&format!("{}. {}", index + 1, unit.text.trim()));
    }

    prompt
}
