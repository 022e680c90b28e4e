use serde::{Deserialize, Serialize};

/// Ordered set of runner labels.
///
/// Keeps insertion order (GitHub shows labels in registration order) and
/// silently drops duplicates.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Labels(Vec<String>);

impl Labels {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Appends `label` unless it is already present.
    ///
    /// Returns `true` if the label was added.
    pub fn insert(&mut self, label: impl Into<String>) -> bool {
        let label = label.into();
        if self.contains(&label) {
            return false;
        }
        self.0.push(label);
        true
    }

    /// Returns a copy with `label` appended (set union with a single element).
    pub fn with(mut self, label: impl Into<String>) -> Self {
        self.insert(label);
        self
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Comma-joined form expected by the agent's `--labels` flag.
    pub fn to_csv(&self) -> String {
        self.0.join(",")
    }
}

impl From<Vec<String>> for Labels {
    fn from(v: Vec<String>) -> Self {
        v.into_iter().collect()
    }
}

impl From<Labels> for Vec<String> {
    fn from(l: Labels) -> Self {
        l.0
    }
}

impl<S: Into<String>> FromIterator<S> for Labels {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut labels = Labels::new();
        for l in iter {
            labels.insert(l);
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::Labels;

    #[test]
    fn insert_keeps_order_and_drops_duplicates() {
        let mut labels = Labels::new();
        assert!(labels.insert("self-hosted"));
        assert!(labels.insert("lxd"));
        assert!(!labels.insert("self-hosted"));

        assert_eq!(labels.iter().collect::<Vec<_>>(), ["self-hosted", "lxd"]);
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn with_appends_architecture_once() {
        let labels: Labels = ["self-hosted", "x86_64"].into_iter().collect();
        let labels = labels.with("x86_64");
        assert_eq!(labels.to_csv(), "self-hosted,x86_64");
    }

    #[test]
    fn csv_of_empty_set_is_empty() {
        assert_eq!(Labels::default().to_csv(), "");
    }

    #[test]
    fn yaml_list_is_deduplicated() {
        let labels: Labels = serde_yaml::from_str("[a, b, a, c]").unwrap();
        assert_eq!(labels.to_csv(), "a,b,c");
    }
}
