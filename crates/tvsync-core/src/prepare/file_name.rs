//! Logical file names sent to devices: `{v|i}{mediaId}_0-{size}.{ext}`.

use super::PrepareError;

/// Lowercased extension after the last `.`; the dot may not be the first character.
pub fn extension(name: &str) -> Result<String, PrepareError> {
    match name.rfind('.') {
        Some(pos) if pos > 0 => Ok(name[pos + 1..].to_ascii_lowercase()),
        _ => Err(PrepareError::NoExtension(name.to_string())),
    }
}

/// `v` for video, `i` for still images.
pub fn media_prefix(ext: &str) -> Result<&'static str, PrepareError> {
    match ext {
        "mp4" | "webm" | "ogv" => Ok("v"),
        "jpg" | "jpeg" | "png" | "gif" => Ok("i"),
        other => Err(PrepareError::UnsupportedFormat(other.to_string())),
    }
}

/// First run of ASCII digits in the storage name.
pub fn media_id(name: &str) -> Result<&str, PrepareError> {
    let start = name
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| PrepareError::NoMediaId(name.to_string()))?;
    let rest = &name[start..];
    let len = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Ok(&rest[..len])
}

/// Build the logical name for storage file `real_file` of `size` bytes.
pub fn logical_file_name(real_file: &str, size: u64) -> Result<String, PrepareError> {
    if size == 0 {
        return Err(PrepareError::EmptyMedia(real_file.to_string()));
    }
    let ext = extension(real_file)?;
    let prefix = media_prefix(&ext)?;
    let id = media_id(real_file)?;
    Ok(format!("{prefix}{id}_0-{size}.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::ResumeToken;

    #[test]
    fn builds_video_and_image_names() {
        assert_eq!(
            logical_file_name("media/583747_7721532218530737715.MP4", 1071263).unwrap(),
            "v583747_0-1071263.mp4"
        );
        assert_eq!(
            logical_file_name("slides/banner-42.png", 10).unwrap(),
            "i42_0-10.png"
        );
    }

    #[test]
    fn declared_size_reads_back() {
        let name = logical_file_name("clip7.webm", 524_289).unwrap();
        assert_eq!(ResumeToken::parse(&name).declared_size(), 524_289);
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            logical_file_name("a1.mp4", 0),
            Err(PrepareError::EmptyMedia(_))
        ));
        assert!(matches!(
            logical_file_name("README", 5),
            Err(PrepareError::NoExtension(_))
        ));
        assert!(matches!(
            logical_file_name(".mp4", 5),
            Err(PrepareError::NoExtension(_))
        ));
        assert!(matches!(
            logical_file_name("doc1.pdf", 5),
            Err(PrepareError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            logical_file_name("clip.mp4", 5),
            Err(PrepareError::NoMediaId(_))
        ));
    }
}
