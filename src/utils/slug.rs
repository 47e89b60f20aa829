use slug::slugify;

/// Build a URL slug from a title, suffixing `-2`, `-3`, ... until it no longer
/// collides with an already-taken slug.
pub fn unique_slug(source: &str, taken: &[String]) -> String {
    let base = slugify(source);

    if !taken.iter().any(|s| s == &base) {
        return base;
    }

    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken.iter().any(|s| s == &candidate) {
            return candidate;
        }
        n += 1;
    }
}
