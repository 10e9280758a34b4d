use crate::ir::NodeCategory;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStyle {
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub income: CategoryStyle,
    pub expense: CategoryStyle,
    pub credit: CategoryStyle,
    pub amount: CategoryStyle,
    pub link_color: String,
    pub dimmed_opacity: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dashboard()
    }
}

impl Theme {
    pub fn dashboard() -> Self {
        Self {
            income: style("Income", "#10B981"),
            expense: style("Expenses", "#EF4444"),
            credit: style("Credit", "#F59E0B"),
            amount: style("Amount", "#3B82F6"),
            link_color: "#94A3B8".to_string(),
            dimmed_opacity: 0.2,
        }
    }

    pub fn muted() -> Self {
        Self {
            income: style("Income", "#59A14F"),
            expense: style("Expenses", "#E15759"),
            credit: style("Credit", "#EDC949"),
            amount: style("Amount", "#4E79A7"),
            link_color: "#BAB0AB".to_string(),
            dimmed_opacity: 0.3,
        }
    }

    /// Exhaustive category lookup; adding a category fails to compile until it is styled.
    pub fn style(&self, category: NodeCategory) -> &CategoryStyle {
        match category {
            NodeCategory::Income => &self.income,
            NodeCategory::Expense => &self.expense,
            NodeCategory::Credit => &self.credit,
            NodeCategory::Amount => &self.amount,
        }
    }

    pub fn set_color(&mut self, category: NodeCategory, color: String) {
        let slot = match category {
            NodeCategory::Income => &mut self.income,
            NodeCategory::Expense => &mut self.expense,
            NodeCategory::Credit => &mut self.credit,
            NodeCategory::Amount => &mut self.amount,
        };
        slot.color = color;
    }
}

fn style(label: &str, color: &str) -> CategoryStyle {
    CategoryStyle {
        label: label.to_string(),
        color: color.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_a_distinct_color() {
        for theme in [Theme::dashboard(), Theme::muted()] {
            let mut colors: Vec<&str> = NodeCategory::ALL
                .iter()
                .map(|category| theme.style(*category).color.as_str())
                .collect();
            colors.sort();
            colors.dedup();
            assert_eq!(colors.len(), NodeCategory::ALL.len());
        }
    }
}
