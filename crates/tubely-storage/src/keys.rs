//! Object key layout.
//!
//! Videos live under `{landscape|portrait|other}/{id}.{ext}` and thumbnails
//! under `thumbnails/{id}.{ext}`. Consumers reading the bucket directly rely
//! on the orientation prefix for partitioning.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::fmt::Display;
use tubely_models::Orientation;

/// Bytes of randomness behind each object identifier.
pub const OBJECT_ID_BYTES: usize = 32;

pub const THUMBNAIL_PREFIX: &str = "thumbnails";

/// 32 bytes from the thread-local CSPRNG, base64url without padding.
pub fn random_object_id() -> String {
    let bytes: [u8; OBJECT_ID_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// `{label}/{id}.{extension}`
pub fn derive_object_key(label: impl Display, id: &str, extension: &str) -> String {
    format!("{}/{}.{}", label, id, extension)
}

/// Fresh key for a processed video.
pub fn video_key(orientation: Orientation, extension: &str) -> String {
    derive_object_key(orientation, &random_object_id(), extension)
}

/// Fresh key for a thumbnail image.
pub fn thumbnail_key(extension: &str) -> String {
    derive_object_key(THUMBNAIL_PREFIX, &random_object_id(), extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_derive_object_key_is_pure() {
        assert_eq!(
            derive_object_key(Orientation::Portrait, "abc_-", "mp4"),
            "portrait/abc_-.mp4"
        );
        assert_eq!(
            derive_object_key(Orientation::Portrait, "abc_-", "mp4"),
            derive_object_key("portrait", "abc_-", "mp4")
        );
    }

    #[test]
    fn test_random_object_id_shape() {
        let id = random_object_id();
        // 32 bytes -> 43 unpadded base64 chars
        assert_eq!(id.len(), 43);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(URL_SAFE_NO_PAD.decode(&id).unwrap().len(), OBJECT_ID_BYTES);
    }

    #[test]
    fn test_random_object_ids_do_not_repeat() {
        let ids: HashSet<String> = (0..1000).map(|_| random_object_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_video_key_prefix() {
        for orientation in [Orientation::Landscape, Orientation::Portrait, Orientation::Other] {
            let key = video_key(orientation, "mp4");
            let (prefix, rest) = key.split_once('/').unwrap();
            assert_eq!(prefix, orientation.as_str());
            assert!(rest.ends_with(".mp4"));
        }
        assert!(thumbnail_key("png").starts_with("thumbnails/"));
    }
}
