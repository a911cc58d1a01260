//! Pre-flight checklist
//!
//! Setup conditions the operator confirms before measuring. Categories and
//! items come from the configuration file, or the built-in list below.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::percentage;

/// Checklist error types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChecklistError {
    #[error("No checklist item {item} in category {category}")]
    NoSuchItem { category: usize, item: usize },
}

pub type Result<T> = std::result::Result<T, ChecklistError>;

/// A named group of checklist items, as configured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistCategory {
    pub name: String,
    pub items: Vec<String>,
}

impl ChecklistCategory {
    pub fn new(name: impl Into<String>, items: &[&str]) -> Self {
        Self {
            name: name.into(),
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Default categories: camera settings, focus, capture, prior setup
pub fn default_categories() -> Vec<ChecklistCategory> {
    vec![
        ChecklistCategory::new(
            "Camera Vision Setting",
            &[
                "Brightness set to 50",
                "Contrast set to 0",
                "Light Strength set to 50",
            ],
        ),
        ChecklistCategory::new(
            "Sample Focus Setting",
            &["Tip-Sample Distance set to 1.0mm", "Bare Si sample prepared"],
        ),
        ChecklistCategory::new(
            "Capture Image",
            &[
                "Vision Mode: Large selected",
                "Capture: Displayed selected",
                "Image measured and saved",
            ],
        ),
        ChecklistCategory::new(
            "Prior Setup",
            &[
                "White balance done",
                "Vimba Viewer setup done",
                "Camera connection checked",
            ],
        ),
    ]
}

/// One item and whether it has been confirmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem<'a> {
    pub category: &'a str,
    pub label: &'a str,
    pub checked: bool,
}

/// Checklist with per-item state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checklist {
    categories: Vec<ChecklistCategory>,
    checked: Vec<Vec<bool>>,
}

impl Default for Checklist {
    fn default() -> Self {
        Self::new(default_categories())
    }
}

impl Checklist {
    /// All items start unchecked
    pub fn new(categories: Vec<ChecklistCategory>) -> Self {
        let checked = categories.iter().map(|c| vec![false; c.items.len()]).collect();
        Self {
            categories,
            checked,
        }
    }

    pub fn categories(&self) -> &[ChecklistCategory] {
        &self.categories
    }

    /// Items in display order
    pub fn items(&self) -> impl Iterator<Item = ChecklistItem<'_>> {
        self.categories
            .iter()
            .zip(&self.checked)
            .flat_map(|(cat, states)| {
                cat.items
                    .iter()
                    .zip(states)
                    .map(move |(label, &checked)| ChecklistItem {
                        category: &cat.name,
                        label,
                        checked,
                    })
            })
    }

    fn slot(&mut self, category: usize, item: usize) -> Result<&mut bool> {
        self.checked
            .get_mut(category)
            .and_then(|c| c.get_mut(item))
            .ok_or(ChecklistError::NoSuchItem { category, item })
    }

    /// Flip an item; returns its new state
    pub fn toggle(&mut self, category: usize, item: usize) -> Result<bool> {
        let slot = self.slot(category, item)?;
        *slot = !*slot;
        Ok(*slot)
    }

    pub fn set(&mut self, category: usize, item: usize, checked: bool) -> Result<()> {
        *self.slot(category, item)? = checked;
        Ok(())
    }

    pub fn check_all(&mut self) {
        self.checked.iter_mut().flatten().for_each(|c| *c = true);
    }

    pub fn clear_all(&mut self) {
        self.checked.iter_mut().flatten().for_each(|c| *c = false);
    }

    pub fn checked_count(&self) -> usize {
        self.checked.iter().flatten().filter(|&&c| c).count()
    }

    pub fn total(&self) -> usize {
        self.checked.iter().map(Vec::len).sum()
    }

    pub fn progress_percent(&self) -> f32 {
        percentage(self.checked_count(), self.total())
    }

    /// True once every item is checked. An empty checklist is complete.
    pub fn is_complete(&self) -> bool {
        self.checked.iter().flatten().all(|&c| c)
    }
}
