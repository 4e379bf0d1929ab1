use ahash::AHashMap;
use itertools::Itertools;

const SLIPO: &str = "http://slipo.eu/def#";

/// Raw fusion attribute names, as `(property path, label)` pairs. A path of
/// two properties is written as both IRIs separated by one space.
const DEFAULT_ATTRIBUTES: [(&[&str], &str); 8] = [
    (&["address", "number"], "number"),
    (&["address", "postcode"], "postcode"),
    (&["phone", "contactValue"], "phone"),
    (&["email", "contactValue"], "email"),
    (&["name", "nameValue"], "name"),
    (&["address", "street"], "street"),
    (&["homepage"], "homepage"),
    (&["fax", "contactValue"], "fax"),
];

/// Maps raw fusion attribute names onto short property labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDictionary {
    labels: AHashMap<String, String>,
}

impl AttributeDictionary {
    /// A dictionary with no mappings; every name passes through unchanged.
    pub fn empty() -> Self {
        Self {
            labels: AHashMap::new(),
        }
    }

    pub fn insert(&mut self, raw: &str, label: &str) {
        self.labels.insert(raw.to_string(), label.to_string());
    }

    /// The label for `raw`, or `raw` itself when it is not mapped.
    pub fn label<'a>(&'a self, raw: &'a str) -> &'a str {
        self.labels.get(raw).map_or(raw, String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for AttributeDictionary {
    fn default() -> Self {
        let labels = DEFAULT_ATTRIBUTES
            .iter()
            .map(|(path, label)| {
                let raw = path.iter().map(|p| format!("{SLIPO}{p}")).join(" ");
                (raw, label.to_string())
            })
            .collect();
        Self { labels }
    }
}
