use ammonia;

/// Clean free text (exam descriptions, question explanations) before it is
/// persisted.
///
/// Whitelist-based: safe formatting tags (<b>, <p>, lists) survive, while
/// <script>/<iframe> and event-handler attributes are stripped. Plain text
/// passes through unchanged apart from HTML entity escaping of stray `<`/`>`.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
