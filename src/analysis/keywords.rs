//! Search keyword normalisation.
//!
//! Keywords are stored as one lowercase, tab-separated string per attachment
//! so a plain `LIKE '%term%'` finds them.

/// Lowercase, drop empty entries and remove duplicates, keeping the first
/// occurrence. Tabs inside a keyword become spaces so they cannot split it.
pub fn normalize<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for keyword in keywords {
        let keyword = keyword.as_ref().trim().replace('\t', " ").to_lowercase();
        if keyword.is_empty() || out.contains(&keyword) {
            continue;
        }
        out.push(keyword);
    }
    out
}

/// Join normalised keywords into the stored form.
pub fn join(keywords: &[String]) -> String {
    keywords.join("\t")
}

/// Split a stored keyword string back into keywords.
pub fn split(stored: &str) -> Vec<String> {
    stored
        .split('\t')
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}
