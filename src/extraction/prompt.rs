//! Instruction payload sent along with the recognized text

/// Fixed rules prepended to every extraction request
pub const EXTRACTION_RULES: &[&str] = &[
    "Process the following text obtained via OCR (expect incoherent words) of gym exercises.",
    "Do not come up with any data that's not part of the following text.",
    "If you don't know, return either empty string or 0.",
    "You can try to infer 'description' and 'muscleGroup' if it's not available, but only when you recognize the exercise name.",
    "Try to fix spelling errors and also capitalize exercise names, descriptions and muscle group correctly.",
    "If you recognize an exercise name, write a one paragraph description (following the same language as the one detected in the text).",
];

/// Rules joined by spaces, a blank line, then the raw text
pub fn build_instructions(text: &str) -> String {
    format!("{}\n\n{}", EXTRACTION_RULES.join(" "), text)
}
