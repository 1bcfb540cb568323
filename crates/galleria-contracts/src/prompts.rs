//! Prompt templates and fixed user-facing messages.

use serde_json::{Map, Value};

/// System turn prepended to every gallery conversation call.
pub const SYSTEM_PROMPT: &str = r#"You are an AI assistant for an image gallery, designed to help users explore and understand images with precision and adaptability. Follow these guidelines to respond conversationally and accurately:

1. Query Handling:
   - For requests like "show me giraffes" or "similar images", respond with "Here are some giraffe images from the gallery" and use the provided data to select relevant images.
   - For general questions, give a concise, factual answer (1-2 sentences, 100-150 characters). If unsure, say: "I'm mainly here for image-related queries, but here's a brief insight: [answer]. How can I assist with the gallery?"

2. Personalization:
   - If the user shares details like their name in the conversation, use it to personalize responses within the current chat. Acknowledge it if asked, based on the chat history, but clarify you don't store personal data long-term.

3. Negation Handling:
   - When the user includes negation words like "not", "excluding", "no" or "without", treat them as instructions to exclude the mentioned items.
   - Identify the positive part (if any) before the negation to decide what to include.
   - Identify the negated part after the negation word to decide what to exclude.
   - From the retrieved data, select items that match the positive part and remove any that match the negated part, using descriptions, tags, or context to judge relevance.
   - Examples: "Show me animals not dogs" focuses on animal images and excludes anything dog-like. "Show me landscapes without water or trees" finds landscapes and excludes those with water or trees in descriptions or tags.

4. Ambiguity and Minimal Input:
   - If vague (e.g., "What's this?" with an image), assume a description of the most similar gallery image is wanted.
   - If only an image is provided, describe the closest match.
   - If only a phrase like "giraffe" is given, treat it as a request for similar images unless it's a question.

5. Edge Cases:
   - If no relevant images match (or all match negated terms), say: "I couldn't find a close match excluding [term], but here's something else."
   - If text and image conflict, prioritize the image and note it.
   - For off-topic queries, say: "I'm here for image-related questions. How can I assist?"

6. Response Format:
   - Keep responses natural, concise, and engaging.
   - Don't list file paths in the text; say "I'll show the images below" if relevant.
   - End with 'Relevant images: <path1>, <path2>, ...' if images are referenced, otherwise omit.

Use the provided data (descriptions, tags, paths) to craft accurate, context-aware responses, and prioritize user intent, especially with negation."#;

pub const GENERAL_QUERY_TEMPLATE: &str = "Provide a short, factual, and conversational response (1-2 sentences, 100-150 characters total) to the question: '{query}'. If unsure, say: 'I'm primarily here to help with image-related questions, but I can offer a brief insight: [short answer]. How can I assist with the gallery?'";

pub const SUMMARY_TEMPLATE: &str = "Summarize the following image descriptions into a single, concise paragraph (about 2-3 sentences, 150-200 characters total) that captures the main subjects, settings, and any notable features or actions across all images. Keep the tone professional and engaging:\n\n{descriptions}\n";

pub const GALLERY_TURN_TEMPLATE: &str =
    "The user asked: '{input}'\n\nHere are some relevant images from the gallery:\n{data}\n\nImage paths: {paths}";

pub const RETRIEVED_ITEM_TEMPLATE: &str = "- Description: {doc}\n  Tags: {tags}\n  Color Palette: {palette}";

pub const IMAGE_DESCRIPTION_PROMPT: &str = "Describe the image in one paragraph, covering the following aspects:

Visual Elements: Focus on the main subjects (people, objects, or key features) including their appearance, colors, sizes, and placement in the frame.

Setting/Environment: Note the location, time of day, weather, and any key background details (e.g., nature, architecture).

Action/Emotion: Describe any actions, interactions, or emotional undertones in the image.

Context/Story: Speculate on the story or context, and explain how the image makes you feel and why.

Additional Details: Highlight any notable lighting, textures, angles, or symbolic elements.

Be descriptive to offer a vivid picture while keeping it concise.";

pub const IMAGE_ANALYSIS_TEMPLATE: &str = r#"Analyze the provided image and generate professional metadata in the following structure: detected objects, color palette, potential use cases, and tags. Provide the metadata in {language}.
Return ONLY a JSON object in this exact shape:
{"detected_objects": ["..."], "color_palette": ["..."], "potential_use_cases": ["..."], "tags": ["..."]}"#;

pub const IMAGE_ANALYSIS_REQUEST: &str = "Analyze this image:";

pub const DEFAULT_ANALYSIS_LANGUAGE: &str = "English";

pub const NO_INPUT_ERROR: &str = "Please provide either text input or an image.";
pub const NO_DESCRIPTION_AVAILABLE: &str = "No relevant descriptions available for these images.";
pub const NO_IMAGES_FOUND: &str = "No relevant images were found.";
pub const FAILED_IMAGE_LOAD: &str = "Failed to load the image";

const NO_TEXT_PROVIDED: &str = "No text provided";
const NO_PATHS: &str = "None";

/// Fills `{name}` slots in one pass. Substituted values are never rescanned,
/// so braces inside user text or stored metadata stay literal.
pub fn render_template(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let filled = tail.find('}').and_then(|close| {
            let name = &tail[..close];
            slots
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match filled {
            Some((value, close)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn general_query_prompt(query: &str) -> String {
    render_template(GENERAL_QUERY_TEMPLATE, &[("query", query)])
}

pub fn summary_prompt(descriptions: &[String]) -> String {
    let body = descriptions
        .iter()
        .map(|description| format!("- {}", description.trim()))
        .collect::<Vec<String>>()
        .join("\n");
    render_template(SUMMARY_TEMPLATE, &[("descriptions", body.as_str())])
}

pub fn image_analysis_prompt(language: &str) -> String {
    render_template(IMAGE_ANALYSIS_TEMPLATE, &[("language", language)])
}

fn metadata_str<'a>(metadata: &'a Map<String, Value>, key: &str) -> &'a str {
    metadata.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// One block per retrieved item, documents and metadata zipped in rank order.
pub fn format_retrieved_data(documents: &[String], metadatas: &[Map<String, Value>]) -> String {
    documents
        .iter()
        .zip(metadatas)
        .map(|(doc, metadata)| {
            render_template(
                RETRIEVED_ITEM_TEMPLATE,
                &[
                    ("doc", doc.as_str()),
                    ("tags", metadata_str(metadata, "tags")),
                    ("palette", metadata_str(metadata, "color_palette")),
                ],
            )
        })
        .collect::<Vec<String>>()
        .join("\n")
}

/// Human turn for the gallery path. `paths` are listed in storage form so the
/// generator echoes strings that match the candidate set.
pub fn gallery_turn_prompt(input: Option<&str>, data: &str, paths: &[String]) -> String {
    let input = input
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(NO_TEXT_PROVIDED);
    let paths = if paths.is_empty() {
        NO_PATHS.to_string()
    } else {
        paths.join(", ")
    };
    render_template(
        GALLERY_TURN_TEMPLATE,
        &[("input", input), ("data", data), ("paths", paths.as_str())],
    )
}
