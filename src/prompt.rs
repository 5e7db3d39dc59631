//! Directive text sent alongside images.

const ANALYSIS_PREAMBLE: &str = "You are producing a loss-minimized, machine-readable description of the attached image. Natural language is a lossy channel, so structure, enumerate and quantify instead of narrating. Describe only what is visible; do not interpret or embellish.";

const ANALYSIS_LAYERS: [(&str, &str); 10] = [
    ("OBJECTS", "Every visible subject and element: type, count, pose, orientation, position in frame (percent from left/top), relative scale."),
    ("COMPOSITION", "Framing, camera height and angle, focal length estimate, rule-of-thirds placement, foreground/midground/background layers."),
    ("GEOMETRY", "Dominant lines, shapes, symmetry, perspective vanishing points, depth cues."),
    ("STYLE", "Medium (photo, oil, 3D render...), era or movement, rendering technique, level of detail."),
    ("COLOR_MAP", "Dominant and accent colors as hex values with approximate area percentages, saturation and contrast."),
    ("LIGHTING", "Key/fill/rim sources with direction in degrees, hardness, color temperature in kelvin, shadow behaviour."),
    ("TEXTURES", "Surface textures per object: roughness, pattern, grain, noise."),
    ("MATERIALS", "Material of each object: reflectance, translucency, wear."),
    ("MOOD", "Atmosphere, emotional tone, weather, time of day."),
    ("SUMMARY", "One dense paragraph that would let an image model reconstruct the scene."),
];

const EXPLORATION_TEMPLATE: &str = "You are a creative muse with an eye for pareidolia and abstract patterns. Analyze the attached image and find hidden shapes, forms and ideas in its textures, shadows and composition. Think like a surrealist artist looking at clouds.

Identify exactly {count} interesting visual patterns or free associations. For each one provide:
{fields}

Do not mention the original image in your suggested prompts. The goal is to create entirely new images inspired by the hidden patterns.

Return a JSON array of objects, each with exactly a \"description\" and a \"suggestedPrompt\" key.";

const EXPLORATION_FIELDS: [&str; 2] = [
    "A short, evocative \"description\" of what you see (e.g. \"The texture on the rock wall looks like a map of an ancient city.\").",
    "A \"suggestedPrompt\": a complete, ready-to-use, imaginative and detailed text-to-image prompt for a new piece of art based on this observation.",
];

/// Structured-analysis directive sent with every analysis request.
pub fn analysis_directive() -> String {
    let layers: Vec<String> = ANALYSIS_LAYERS
        .iter()
        .map(|(name, what)| format!("{}: {}", name, what))
        .collect();
    [
        ANALYSIS_PREAMBLE.to_string(),
        section("Layers", &numbered_list(&layers)),
        section(
            "Output",
            "Emit every layer in order as an indented KEY: value block headed by the layer name. Use \"none\" rather than omitting a key.",
        ),
    ]
    .join("\n\n")
}

/// Creative exploration directive asking for `count` ideas.
pub fn exploration_directive(count: usize) -> String {
    let fields: Vec<String> = EXPLORATION_FIELDS.iter().map(|s| s.to_string()).collect();
    EXPLORATION_TEMPLATE
        .replace("{count}", &count.to_string())
        .replace("{fields}", &numbered_list(&fields))
}

/// Combined prompt for an edit request grounded in a prior analysis.
pub fn edit_prompt(analysis: &str, request: &str) -> String {
    format!(
        "Based on the following structured analysis of the image:\n--- ANALYSIS START ---\n{}\n--- ANALYSIS END ---\n\nPlease apply this user-requested edit: \"{}\"\n\nOutput only the edited image.",
        analysis.trim(),
        request.trim()
    )
}

/// Create a numbered list from items (1-indexed).
pub fn numbered_list(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wrap text in a labeled section for structured prompts.
pub fn section(label: &str, content: &str) -> String {
    format!("## {}\n{}", label, content)
}
