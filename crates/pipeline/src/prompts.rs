//! Prompt templates for the vision and image models.

pub const GENDER_SYSTEM_PROMPT: &str = "You are a gender detection assistant. \
Respond with exactly one word: 'man' or 'woman'. No explanation, no punctuation.";

pub const GENDER_PROMPT: &str = "Look at this person. Answer with ONLY one word: 'man' or 'woman'.";

pub const GARMENT_SYSTEM_PROMPT: &str = "You are a fashion analyst. \
Respond with a single JSON object and nothing else.";

pub const GARMENT_PROMPT: &str = r#"Describe the garment in this image as a JSON object with these keys:
  "clothing_type": one word (for example dress, suit, shirt, pants, jacket),
  "color": main colors,
  "material": apparent fabric,
  "pattern": print or texture, "none" if plain,
  "fit": silhouette and cut,
  "details": notable features such as buttons, collars, pockets or embellishments.
Return only the JSON object."#;

pub const GENERATE_TEMPLATE: &str = r#"Create a photorealistic photograph.
image_1 is the model. Keep their face, body shape, skin tone and hair exactly.
image_2 is the garment. Dress the model in this garment, matching it exactly:
<<<GARMENT_DESCRIPTION>>>
image_3 is the scene reference. Match its pose, setting, camera angle and lighting:
<<<REF_IMG_DESCRIPTION>>>
Do not add text, watermarks or extra people."#;

pub const ENHANCE_SYSTEM_PROMPT: &str = "You write image enhancement prompts for AI-generated photos. \
Your entire response is the prompt itself. Do not generate an image.";

pub const ENHANCE_PROMPT: &str = "Analyze this image and write an enhancement prompt. \
First forbid changes to the person, body structure, clothing, lighting and scenery. \
Then list the specific textures and micro-details to sharpen for realism \
(skin, eyes, hands, hair strands, fabric weave, surfaces in the scene).";

/// Fixed prefix for every enhancement edit.
pub const ENHANCE_PREFIX: &str = "correct eyes, realistic face, ";

/// Fill the generation template.
///
/// The garment description is embedded as pretty JSON and the reference
/// description as a JSON string literal.
pub fn generate_prompt(garment_description: &serde_json::Value, ref_description: &str) -> String {
    let garment = serde_json::to_string_pretty(garment_description)
        .unwrap_or_else(|_| garment_description.to_string());
    let reference = serde_json::Value::String(ref_description.to_string()).to_string();
    GENERATE_TEMPLATE
        .replace("<<<GARMENT_DESCRIPTION>>>", &garment)
        .replace("<<<REF_IMG_DESCRIPTION>>>", &reference)
}

/// Edit prompt for an enhancement job.
pub fn enhance_prompt(clothing_type: &str, derived: &str) -> String {
    format!("{ENHANCE_PREFIX}keep the {clothing_type} unchanged, {derived}")
}
