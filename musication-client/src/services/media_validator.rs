//! Pre-flight audio file validation
//!
//! Fast-fail convenience before upload. The Analysis Service's own validation
//! remains authoritative.

/// MIME types accepted for upload
pub const ACCEPTED_MIME_TYPES: [&str; 6] = [
    "audio/mpeg",
    "audio/wav",
    "audio/flac",
    "audio/mp4",
    "audio/ogg",
    "audio/x-m4a",
];

/// File extensions accepted for upload (lowercase, with dot)
pub const ACCEPTED_EXTENSIONS: [&str; 5] = [".mp3", ".wav", ".flac", ".m4a", ".ogg"];

/// Sent when neither sniffing nor the extension yields a MIME type
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Detect a MIME type from magic bytes, normalized to the accepted spelling
///
/// `infer` reports e.g. `audio/x-wav` and `audio/x-flac`; those are mapped onto
/// the names the service advertises.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    let kind = infer::get(bytes)?;
    Some(normalize_mime(kind.mime_type()))
}

/// Map alias spellings onto the accepted MIME names
pub fn normalize_mime(mime: &str) -> &str {
    match mime {
        "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => "audio/wav",
        "audio/x-flac" => "audio/flac",
        "audio/m4a" => "audio/x-m4a",
        "audio/mp3" => "audio/mpeg",
        other => other,
    }
}

/// MIME type implied by a file extension
pub fn mime_for_extension(file_name: &str) -> Option<&'static str> {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".mp3") {
        Some("audio/mpeg")
    } else if lower.ends_with(".wav") {
        Some("audio/wav")
    } else if lower.ends_with(".flac") {
        Some("audio/flac")
    } else if lower.ends_with(".m4a") {
        Some("audio/x-m4a")
    } else if lower.ends_with(".ogg") {
        Some("audio/ogg")
    } else {
        None
    }
}

pub fn is_accepted_mime(mime: &str) -> bool {
    ACCEPTED_MIME_TYPES.contains(&normalize_mime(mime))
}

pub fn has_accepted_extension(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    ACCEPTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Accept when either the MIME type or the file extension is on the list
pub fn is_audio_file(file_name: &str, mime: Option<&str>) -> bool {
    mime.is_some_and(is_accepted_mime) || has_accepted_extension(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAV_HEADER: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt \x10\x00\x00\x00";
    const FLAC_HEADER: &[u8] = b"fLaC\x00\x00\x00\x22";
    const ID3_HEADER: &[u8] = b"ID3\x04\x00\x00\x00\x00\x00\x00";

    #[test]
    fn test_extension_match_is_case_insensitive() {
        assert!(has_accepted_extension("track.MP3"));
        assert!(has_accepted_extension("Live Set.Flac"));
        assert!(!has_accepted_extension("notes.txt"));
        assert!(!has_accepted_extension("mp3"));
    }

    #[test]
    fn test_mime_or_extension_is_enough() {
        assert!(is_audio_file("recording", Some("audio/ogg")));
        assert!(is_audio_file(
            "recording.m4a",
            Some("application/octet-stream")
        ));
        assert!(is_audio_file("recording.wav", None));
        assert!(!is_audio_file("photo.jpg", Some("image/jpeg")));
        assert!(!is_audio_file("clip", Some("audio/aac")));
    }

    #[test]
    fn test_sniffed_aliases_are_normalized() {
        assert_eq!(sniff_mime(WAV_HEADER), Some("audio/wav"));
        assert_eq!(sniff_mime(FLAC_HEADER), Some("audio/flac"));
        assert_eq!(sniff_mime(ID3_HEADER), Some("audio/mpeg"));
        assert_eq!(sniff_mime(b"plain text"), None);
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for_extension("a.M4A"), Some("audio/x-m4a"));
        assert_eq!(mime_for_extension("a.mp3"), Some("audio/mpeg"));
        assert_eq!(mime_for_extension("a.aiff"), None);
    }
}
