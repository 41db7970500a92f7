use serde::{Deserialize, Serialize};

/// A fixed-length embedding vector produced by the AI collaborator.
///
/// Embeddings are stored as a JSON array of floats. Anything that does not
/// parse as a non-empty array of numbers is treated as "no embedding".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f64>);

impl Embedding {
    /// Creates an embedding from raw values.
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Parses an embedding from its stored JSON form.
    ///
    /// Returns `None` for malformed JSON, non-numeric entries, and empty arrays.
    ///
    /// # Examples
    ///
    /// ```
    /// use umbra::Embedding;
    ///
    /// let embedding = Embedding::from_json("[1.0, 0.5]").unwrap();
    /// assert_eq!(embedding.dimension(), 2);
    ///
    /// assert!(Embedding::from_json("null").is_none());
    /// assert!(Embedding::from_json("[]").is_none());
    /// assert!(Embedding::from_json("not json").is_none());
    /// ```
    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok().and_then(Self::from_values)
    }

    /// Wraps raw values, rejecting empty vectors and non-finite components.
    pub fn from_values(values: Vec<f64>) -> Option<Self> {
        if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(Self(values))
    }

    /// Serializes the embedding to its stored JSON form.
    pub fn to_json(&self) -> String {
        // A Vec<f64> of finite values always serializes.
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }

    /// Returns the vector components.
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Returns the dimensionality of the vector.
    pub fn dimension(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<f64>> for Embedding {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}
