use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A single image file shown during a rating trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStimulus {
    /// Short identifier, normally the file stem.
    pub id: String,
    pub path: PathBuf,
}

impl ImageStimulus {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }
}

/// One labeled category of images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPool {
    pub name: String,
    pub images: Vec<ImageStimulus>,
}

/// Ordered collection of categories making up one presentation set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StimulusPool {
    pub categories: Vec<CategoryPool>,
}

impl StimulusPool {
    pub fn num_categories(&self) -> usize {
        self.categories.len()
    }

    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    /// The common per-category image count, if every category agrees.
    pub fn uniform_len(&self) -> Option<usize> {
        let first = self.categories.first()?.images.len();
        self.categories
            .iter()
            .all(|c| c.images.len() == first)
            .then_some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(counts: &[usize]) -> StimulusPool {
        StimulusPool {
            categories: counts
                .iter()
                .enumerate()
                .map(|(c, &n)| CategoryPool {
                    name: format!("cat{c}"),
                    images: (0..n)
                        .map(|i| ImageStimulus::new(format!("img{c}_{i}"), format!("{c}/{i}.jpg")))
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn uniform_len_detects_mismatch() {
        assert_eq!(pool(&[3, 3, 3]).uniform_len(), Some(3));
        assert_eq!(pool(&[3, 3, 2]).uniform_len(), None);
        assert_eq!(StimulusPool::default().uniform_len(), None);
    }
}
