use uuid::Uuid;

/// Prefix of generated labels.
pub const GENERATED_LABEL_PREFIX: &str = "build-";

/// Image reference `<app_name>:<label>`.
///
/// An empty label is replaced by `build-<id>`, where `<id>` is a UUIDv7 in
/// simple form: time-ordered, so generated tags sort chronologically.
pub fn build_tag(app_name: &str, label: &str) -> String {
    if label.is_empty() {
        format!("{app_name}:{}", generated_label())
    } else {
        format!("{app_name}:{label}")
    }
}

/// Split an image reference into `(repository, label)`.
pub fn split_tag(reference: &str) -> Option<(&str, &str)> {
    reference.rsplit_once(':').filter(|(repo, label)| {
        !repo.is_empty() && !label.is_empty() && !label.contains('/')
    })
}

fn generated_label() -> String {
    format!("{GENERATED_LABEL_PREFIX}{}", Uuid::now_v7().simple())
}
