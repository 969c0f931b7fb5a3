/// Returns every term that occurs in `text` at least once, preserving the
/// order terms were given in.
///
/// The haystack is uppercased once here; stored terms are already uppercased
/// at write time, so each check is a plain substring test. No locale-aware
/// folding.
pub fn find_hits(text: &str, terms: &[String]) -> Vec<String> {
    let haystack = text.to_uppercase();
    terms
        .iter()
        .filter(|term| haystack.contains(term.as_str()))
        .cloned()
        .collect()
}
