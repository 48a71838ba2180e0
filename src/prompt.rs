//! Fixed prompt templates for the two upstream calls.

const INSTRUCTION_HEAD: &str = "Create a realistic virtual try-on result where the person in the first image is wearing the clothing item from the second image.";
const INSTRUCTION_TAIL: &str = "Ensure the clothing fits naturally on the person's body with realistic fabric draping, proper lighting, and maintain the person's pose and background.";
const GENERATION_HEAD: &str = "A realistic photo of a person wearing the clothing item.";

/// Instruction sent to the describe stage along with both images.
///
/// A blank custom prompt is treated as absent.
pub fn build_instruction(custom_prompt: Option<&str>) -> String {
    match custom_prompt.map(str::trim).filter(|custom| !custom.is_empty()) {
        Some(custom) => {
            format!("{INSTRUCTION_HEAD}\nAdditional requirements: {custom}\n{INSTRUCTION_TAIL}")
        }
        None => format!("{INSTRUCTION_HEAD}\n{INSTRUCTION_TAIL}"),
    }
}

/// Prompt for the generate stage. Falls back to the instruction when the
/// describe stage returned no usable text.
pub fn build_generation_prompt(description: Option<&str>, instruction: &str) -> String {
    let context = description
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(instruction);
    format!("{GENERATION_HEAD} {context}")
}
