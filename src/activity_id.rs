use std::path::Path;

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generate a short, human-readable activity id of the form
/// `{farm-slug}-{hex4}`, retrying on the rare collision.
pub fn generate_activity_id<F>(data_root: &Path, mut exists: F) -> String
where
    F: FnMut(&str) -> bool,
{
    let slug = farm_slug(data_root);

    for _ in 0..64 {
        let seed = Uuid::now_v7().to_string();
        let mut hasher = Sha256::new();
        hasher.update(seed.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        let short = &digest[..4];
        let candidate = format!("{}-{}", slug, short);
        if !exists(&candidate) {
            return candidate;
        }
    }

    format!("{}-{}", slug, &Uuid::now_v7().simple().to_string()[..8])
}

pub fn farm_slug(data_root: &Path) -> String {
    let basename = data_root
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("finca");
    let normalized = normalize_slug(basename);
    if normalized.is_empty() {
        "finca".to_string()
    } else {
        normalized
    }
}

fn normalize_slug(raw: &str) -> String {
    raw.chars()
        .map(|ch| ch.to_ascii_lowercase())
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
        .collect::<String>()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::Path;

    use super::{farm_slug, generate_activity_id};

    #[test]
    fn slug_comes_from_data_root_basename() {
        assert_eq!(farm_slug(Path::new("/tmp/la-esperanza")), "la-esperanza");
        assert_eq!(farm_slug(Path::new("/tmp/Finca_Sur")), "fincasur");
    }

    #[test]
    fn slug_falls_back_when_basename_is_unusable() {
        assert_eq!(farm_slug(Path::new("/")), "finca");
    }

    #[test]
    fn generated_ids_follow_slug_short_hash_shape() {
        let seen: HashSet<String> = HashSet::new();
        let id = generate_activity_id(Path::new("/tmp/la-esperanza"), |candidate| {
            seen.contains(candidate)
        });
        assert!(id.starts_with("la-esperanza-"));
        assert_eq!(
            id.split('-')
                .next_back()
                .expect("short hash should exist")
                .len(),
            4
        );
    }

    #[test]
    fn generation_skips_colliding_candidates() {
        let mut rejected = 0;
        let id = generate_activity_id(Path::new("/tmp/finca"), |_| {
            rejected += 1;
            rejected <= 3
        });
        assert!(id.starts_with("finca-"));
        assert_eq!(rejected, 4);
    }
}
