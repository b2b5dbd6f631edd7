use chrono::{Datelike, Local, NaiveDateTime};
use std::path::Path;

use crate::config::AltFrom;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedNames {
    pub key: String,
    pub name: String,
    pub alt: String,
}

pub fn generate_names(prefix: &str, original_filename: &str, alt_from: AltFrom) -> GeneratedNames {
    generate_names_at(
        prefix,
        original_filename,
        alt_from,
        Local::now().naive_local(),
    )
}

pub fn generate_names_at(
    prefix: &str,
    original_filename: &str,
    alt_from: AltFrom,
    now: NaiveDateTime,
) -> GeneratedNames {
    let timestamp = now.format("%Y%m%d%H%M%S").to_string();
    let name = format!("{}.{}", timestamp, canonical_extension(original_filename));
    let key = posix_join(&expand_prefix(prefix, now), &name);

    let alt = match alt_from {
        AltFrom::Filename => Path::new(original_filename)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
        AltFrom::Timestamp => timestamp,
        AltFrom::None => String::new(),
    };

    GeneratedNames { key, name, alt }
}

pub fn expand_prefix(prefix: &str, now: NaiveDateTime) -> String {
    prefix
        .replace("${yyyy}", &now.year().to_string())
        .replace("${MM}", &format!("{:02}", now.month()))
        .replace("${dd}", &format!("{:02}", now.day()))
}

fn lowercase_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

pub fn canonical_extension(filename: &str) -> &'static str {
    match lowercase_extension(filename).as_deref() {
        Some("jpg" | "jpeg") => "jpg",
        Some("png") => "png",
        Some("gif") => "gif",
        Some("webp") => "webp",
        Some("heic") => "heic",
        Some("svg") => "svg",
        _ => "jpg",
    }
}

pub fn mime_type(filename: &str) -> &'static str {
    match lowercase_extension(filename).as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

pub fn posix_join(base: &str, name: &str) -> String {
    let joined = match (base.is_empty(), name.is_empty()) {
        (true, true) => return ".".to_string(),
        (true, false) => name.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{base}/{name}"),
    };

    let absolute = joined.starts_with('/');
    let trailing = joined.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let mut normalized = segments.join("/");
    if absolute {
        normalized.insert(0, '/');
    }
    if normalized.is_empty() {
        return ".".to_string();
    }
    if trailing && !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 2)
            .unwrap()
    }

    #[test]
    fn test_timestamp_is_zero_padded() {
        let names = generate_names_at("images", "a.png", AltFrom::Timestamp, at());
        assert_eq!(names.alt, "20240307090502");
        assert_eq!(names.name, "20240307090502.png");
        assert_eq!(names.key, "images/20240307090502.png");
    }

    #[test]
    fn test_prefix_template_expansion() {
        assert_eq!(
            expand_prefix("images/${yyyy}/${MM}/${dd}", at()),
            "images/2024/03/07"
        );
        assert_eq!(expand_prefix("${yyyy}-${yyyy}", at()), "2024-2024");
        assert_eq!(expand_prefix("static/${YYYY}/${mm}", at()), "static/${YYYY}/${mm}");
        assert_eq!(expand_prefix("plain/path", at()), "plain/path");
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(canonical_extension("photo.JPEG"), "jpg");
        assert_eq!(canonical_extension("photo.Png"), "png");
        assert_eq!(canonical_extension("anim.GIF"), "gif");
        assert_eq!(canonical_extension("pic.webp"), "webp");
        assert_eq!(canonical_extension("pic.HEIC"), "heic");
        assert_eq!(canonical_extension("logo.svg"), "svg");
        assert_eq!(canonical_extension("scan.tiff"), "jpg");
        assert_eq!(canonical_extension("noextension"), "jpg");
        assert_eq!(canonical_extension(".png"), "jpg");
    }

    #[test]
    fn test_name_uses_canonical_extension() {
        let names = generate_names_at("img", "Holiday.JPEG", AltFrom::Filename, at());
        assert!(names.name.ends_with(".jpg"));
        assert_eq!(names.alt, "Holiday");
    }

    #[test]
    fn test_alt_modes() {
        let none = generate_names_at("img", "shot.png", AltFrom::None, at());
        assert_eq!(none.alt, "");

        let filename = generate_names_at("img", "shot.final.PNG", AltFrom::Filename, at());
        assert_eq!(filename.alt, "shot.final");

        let timestamp = generate_names("img", "shot.png", AltFrom::Timestamp);
        assert_eq!(timestamp.alt.len(), 14);
        assert!(timestamp.alt.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(mime_type("a.jpg"), "image/jpeg");
        assert_eq!(mime_type("a.JPEG"), "image/jpeg");
        assert_eq!(mime_type("a.png"), "image/png");
        assert_eq!(mime_type("a.svg"), "image/svg+xml");
        assert_eq!(mime_type("a.bmp"), "application/octet-stream");
        assert_eq!(mime_type("README"), "application/octet-stream");
    }

    #[test]
    fn test_posix_join() {
        assert_eq!(posix_join("images/2024/03", "x.png"), "images/2024/03/x.png");
        assert_eq!(posix_join("images/", "x.png"), "images/x.png");
        assert_eq!(posix_join("", "x.png"), "x.png");
        assert_eq!(posix_join("a//b/./c", "x.png"), "a/b/c/x.png");
        assert_eq!(posix_join("a/../b", "x.png"), "b/x.png");
        assert_eq!(posix_join("../up", "x.png"), "../up/x.png");
        assert_eq!(posix_join("/root", "x.png"), "/root/x.png");
    }
}
