use crate::LineageError;
use url::Url;

/// Extracts the person identifier from a page URL
///
/// The identifier is the value of the `id_param` query parameter. Pages
/// addressed by path instead (`/people/p123`) fall back to the last
/// non-empty path segment.
///
/// # Examples
///
/// ```
/// use lineage_crawler::url::person_id_from_url;
/// use url::Url;
///
/// let url = Url::parse("https://example.org/tree/?i=111815").unwrap();
/// assert_eq!(person_id_from_url(&url, "i"), Some("111815".to_string()));
/// ```
pub fn person_id_from_url(url: &Url, id_param: &str) -> Option<String> {
    if let Some(id) = person_id_from_query(url, id_param) {
        return Some(id);
    }

    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

/// Extracts the person identifier from the `id_param` query parameter only
///
/// Returns `None` when the parameter is missing or blank.
pub fn person_id_from_query(url: &Url, id_param: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == id_param)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Returns a copy of `url` whose identifier parameter is replaced by `id`
///
/// Other query parameters keep their order. If the URL had no identifier
/// parameter, one is appended.
pub fn with_person_id(url: &Url, id_param: &str, id: &str) -> Url {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    match pairs.iter_mut().find(|(key, _)| key == id_param) {
        Some(pair) => pair.1 = id.to_string(),
        None => pairs.push((id_param.to_string(), id.to_string())),
    }

    let mut swapped = url.clone();
    swapped.set_fragment(None);
    swapped.query_pairs_mut().clear().extend_pairs(pairs);
    swapped
}

/// Parses a seed URL and extracts its person identifier
///
/// # Returns
///
/// * `Ok((Url, String))` - The parsed URL and the identifier it addresses
/// * `Err(LineageError)` - The URL is malformed or carries no identifier
pub fn parse_seed(seed_url: &str, id_param: &str) -> Result<(Url, String), LineageError> {
    let url = Url::parse(seed_url)?;
    let id = person_id_from_url(&url, id_param)
        .ok_or_else(|| LineageError::InvalidSeed(seed_url.to_string()))?;
    Ok((url, id))
}
