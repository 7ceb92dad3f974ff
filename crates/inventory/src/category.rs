use serde::{Deserialize, Serialize};

/// Produce category derived from an item description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Grains,
    Vegetables,
    Fruits,
    Dairy,
    Other,
}

const GRAINS: &[&str] = &[
    "maize", "corn", "wheat", "rice", "sorghum", "millet", "barley", "oats", "beans", "grain",
];
const VEGETABLES: &[&str] = &[
    "tomato", "cabbage", "kale", "sukuma", "spinach", "onion", "carrot", "potato", "pepper",
    "lettuce", "vegetable",
];
const FRUITS: &[&str] = &[
    "mango", "banana", "orange", "avocado", "pineapple", "apple", "passion", "melon", "papaya",
    "fruit",
];
const DAIRY: &[&str] = &["milk", "cheese", "yogurt", "yoghurt", "butter", "cream", "ghee", "dairy"];

impl Category {
    /// First keyword table that matches wins, checked grains → vegetables → fruits → dairy.
    pub fn classify(description: &str) -> Self {
        let text = description.to_lowercase();
        let hit = |words: &[&str]| words.iter().any(|w| text.contains(w));

        if hit(GRAINS) {
            Category::Grains
        } else if hit(VEGETABLES) {
            Category::Vegetables
        } else if hit(FRUITS) {
            Category::Fruits
        } else if hit(DAIRY) {
            Category::Dairy
        } else {
            Category::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Grains => "grains",
            Category::Vegetables => "vegetables",
            Category::Fruits => "fruits",
            Category::Dairy => "dairy",
            Category::Other => "other",
        }
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_keyword_case_insensitively() {
        assert_eq!(Category::classify("White MAIZE, 90kg bags"), Category::Grains);
        assert_eq!(Category::classify("Roma tomatoes"), Category::Vegetables);
        assert_eq!(Category::classify("Hass avocado"), Category::Fruits);
        assert_eq!(Category::classify("Fresh milk"), Category::Dairy);
        assert_eq!(Category::classify("Fertilizer"), Category::Other);
    }

    #[test]
    fn displays_lowercase() {
        assert_eq!(Category::Vegetables.to_string(), "vegetables");
    }
}
