use serde::{Deserialize, Serialize};

/// A category definition from a headerless category block.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Category {
    /// 1-based position of this category among the categories of one parse pass.
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_expense: bool,
    pub is_income: bool,
    pub is_tax_related: bool,
    pub tax_schedule: Option<String>,
}

/// The field codes that can appear in a category record. The three flag fields carry no value;
/// their presence alone sets the flag.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryField {
    Name,
    Description,
    Expense,
    Income,
    TaxRelated,
    TaxSchedule,
}

serde_plain::derive_display_from_serialize!(CategoryField);

impl CategoryField {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'N' => Some(CategoryField::Name),
            'D' => Some(CategoryField::Description),
            'E' => Some(CategoryField::Expense),
            'I' => Some(CategoryField::Income),
            'T' => Some(CategoryField::TaxRelated),
            'R' => Some(CategoryField::TaxSchedule),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_codes() {
        assert_eq!(CategoryField::from_code('E'), Some(CategoryField::Expense));
        assert_eq!(CategoryField::from_code('T'), Some(CategoryField::TaxRelated));
        assert_eq!(CategoryField::from_code('B'), None);
    }

    #[test]
    fn category_flags_default_false() {
        let c = Category::default();
        assert!(!c.is_expense && !c.is_income && !c.is_tax_related);
    }
}
