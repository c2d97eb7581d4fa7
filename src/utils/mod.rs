//! Utility functions and helpers.

pub mod http;

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Last path segment of a URL or path, without query or fragment.
pub fn file_name(src: &str) -> &str {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  P. Congressos \n - 21   min "), "P. Congressos - 21 min");
        assert_eq!(normalize_whitespace(" \t "), "");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("/img/lineas/linea_3.png?v=2"), "linea_3.png");
        assert_eq!(file_name("linea_7.gif"), "linea_7.gif");
        assert_eq!(file_name("https://cdn.example.com/a/b/"), "");
    }
}
