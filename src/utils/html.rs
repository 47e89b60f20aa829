use ammonia;

/// Sanitize user-supplied HTML with the ammonia whitelist.
///
/// Post bodies and comments arrive as rich text from arbitrary clients; this
/// strips script/iframe tags and event-handler attributes before the content
/// is stored, so every read path serves clean markup.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
