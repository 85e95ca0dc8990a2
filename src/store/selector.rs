use serde_json::Map;
use serde_json::Value;

use crate::constants::ID_FIELD;

/// Addresses the document(s) a mutation targets: either a bare identifier or
/// an equality selector over dotted field paths (conjunction).
///
/// `Id("x")` and `Where({"_id": "x"})` are the same selector; both normalize
/// to the same canonical key so intents targeting them merge in a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Id(String),
    Where(Map<String, Value>),
}

impl Selector {
    /// Matches every document in a collection.
    pub fn all() -> Self {
        Selector::Where(Map::new())
    }

    /// The identifier-equality mapping this selector normalizes to.
    pub fn normalized(&self) -> Map<String, Value> {
        match self {
            Selector::Id(id) => {
                let mut map = Map::new();
                map.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                map
            }
            Selector::Where(map) => map.clone(),
        }
    }

    /// Stable merge key, independent of how the selector was spelled.
    /// `serde_json::Map` is ordered by key, so serialization is canonical.
    pub fn canonical(&self) -> String {
        Value::Object(self.normalized()).to_string()
    }

    /// True when this selector addresses exactly one document by identifier.
    /// Anything else becomes a multi-document update at commit time.
    pub fn is_single_id(&self) -> bool {
        match self {
            Selector::Id(_) => true,
            Selector::Where(map) => {
                map.len() == 1 && map.get(ID_FIELD).is_some_and(Value::is_string)
            }
        }
    }
}

impl From<&str> for Selector {
    fn from(id: &str) -> Self {
        Selector::Id(id.to_string())
    }
}

impl From<String> for Selector {
    fn from(id: String) -> Self {
        Selector::Id(id)
    }
}

impl From<Map<String, Value>> for Selector {
    fn from(map: Map<String, Value>) -> Self {
        Selector::Where(map)
    }
}
