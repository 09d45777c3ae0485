const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg", "ogv", "mov", "m4v"];

/// True when the path of `source` ends in a known video extension. Query
/// strings and fragments are ignored, case is not significant.
pub fn has_video_extension(source: &str) -> bool {
    let path = source
        .split(['?', '#'])
        .next()
        .unwrap_or(source);

    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => VIDEO_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known)),
        _ => false,
    }
}
