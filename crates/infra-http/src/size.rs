// Aspect ratio -> image size mapping
//
// DALL-E models take the 1792 sizes, gpt-image models take 1536. Neither
// offers 4:3 or 3:4, so those fall back to the nearest orientation.

const SQUARE: &str = "1024x1024";

/// Size string for `aspect_ratio` on `model` (defaults to square)
pub fn size_for(model: &str, aspect_ratio: Option<&str>) -> &'static str {
    let dalle = model.starts_with("dall-e");
    match aspect_ratio {
        Some("16:9") | Some("4:3") if dalle => "1792x1024",
        Some("9:16") | Some("3:4") if dalle => "1024x1792",
        Some("16:9") | Some("4:3") => "1536x1024",
        Some("9:16") | Some("3:4") => "1024x1536",
        _ => SQUARE,
    }
}
