use std::collections::HashSet;
use std::path::{Path, PathBuf};

const PLACEHOLDER_NAMES: [&str; 2] = ["uploaded_video", "downloaded_youtube_video"];
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const MAX_TITLE_CHARS: usize = 100;
const FALLBACK_TITLE: &str = "video";

/// Human title for a video: its file stem without the placeholder names
/// used for uploads and downloads.
pub fn video_title(video_path: &Path) -> String {
    let mut title = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    for placeholder in PLACEHOLDER_NAMES {
        title = title.replace(placeholder, "");
    }

    let title = title.trim_matches(|c: char| c.is_whitespace() || c == '_' || c == '-');
    if title.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        title.to_string()
    }
}

/// Replace characters that are invalid in file names and cap the length.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_TITLE_CHARS)
        .collect()
}

/// `"<title><suffix>.mp4"` for the dubbed version of `video_path`.
pub fn output_file_name(video_path: &Path, suffix: &str) -> String {
    format!("{}{}.mp4", sanitize_filename(&video_title(video_path)), suffix)
}

/// `path`, or `"<stem> (N).<ext>"` with the smallest N >= 2 not already in `claimed`.
/// The returned path is added to `claimed`.
pub fn claim_unique(path: PathBuf, claimed: &mut HashSet<PathBuf>) -> PathBuf {
    if claimed.insert(path.clone()) {
        return path;
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut n = 2;
    loop {
        let name = match &extension {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = path.with_file_name(name);
        if claimed.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
