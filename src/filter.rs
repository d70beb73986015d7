use crate::utils::file_extension;

/// Gate applied to every multipart file part before its bytes are read.
///
/// The allow-list entries are case-sensitive literal substrings, any of which
/// may match. A part is accepted when either its lowercased file extension or
/// its MIME type contains one of them, so `"jp"` also matches `"jpeg"`.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    patterns: Vec<String>,
}

impl ExtensionFilter {
    pub fn new(allow_list: &[String]) -> Self {
        Self {
            patterns: allow_list.to_vec(),
        }
    }

    pub fn accepts(&self, original_name: &str, mime_type: &str) -> bool {
        let extension = file_extension(original_name).to_lowercase();
        self.is_match(&extension) || self.is_match(mime_type)
    }

    fn is_match(&self, haystack: &str) -> bool {
        !haystack.is_empty() && self.patterns.iter().any(|pattern| haystack.contains(pattern.as_str()))
    }
}

/// Free-function form of [`ExtensionFilter::accepts`].
pub fn accepts(original_name: &str, mime_type: &str, allow_list: &[String]) -> bool {
    ExtensionFilter::new(allow_list).accepts(original_name, mime_type)
}
