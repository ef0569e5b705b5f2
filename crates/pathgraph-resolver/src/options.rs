use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Reference redirects allowed along one resolution chain.
    pub max_reference_depth: usize,
    /// Fan out keys and path-sets concurrently rather than one at a time.
    pub concurrent: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_reference_depth: 32,
            concurrent: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_members_take_defaults() {
        let options: ResolveOptions = serde_json::from_str(r#"{"concurrent": false}"#).unwrap();
        assert_eq!(options.max_reference_depth, 32);
        assert!(!options.concurrent);
    }
}
