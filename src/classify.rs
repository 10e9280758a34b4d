use crate::config::AggregateConfig;
use crate::ir::{FlowKind, FlowRecord};
use once_cell::sync::Lazy;
use regex::Regex;

static CREDIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)credit|crédit|prêt|loan").unwrap());

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub kind: FlowKind,
    pub normalized_amount: f64,
}

/// A classified record with every node identity it contributes to resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRecord {
    pub kind: FlowKind,
    pub amount: f64,
    pub entity: String,
    pub category: String,
    pub method: String,
    pub month: String,
}

pub fn is_credit_label(label: &str) -> bool {
    CREDIT_RE.is_match(label)
}

/// Credit keywords in the label win, then an explicit kind, then the sign.
pub fn classify(record: &FlowRecord) -> Classification {
    let credit_label = record
        .category_label
        .as_deref()
        .is_some_and(is_credit_label);
    let kind = if credit_label {
        FlowKind::Credit
    } else if let Some(kind) = record.kind {
        kind
    } else if record.amount > 0.0 {
        FlowKind::Income
    } else {
        FlowKind::Expense
    };
    Classification {
        kind,
        normalized_amount: record.amount.abs(),
    }
}

/// Returns `None` for records that must not be counted (zero or non-finite amounts).
pub fn classify_record(record: &FlowRecord, config: &AggregateConfig) -> Option<ClassifiedRecord> {
    if !record.amount.is_finite() || record.amount == 0.0 {
        return None;
    }
    let Classification {
        kind,
        normalized_amount,
    } = classify(record);

    let entity = non_blank(record.source_entity_id.as_deref())
        .unwrap_or(config.no_entity_id.as_str())
        .to_string();
    let category = non_blank(record.category_label.as_deref())
        .unwrap_or(config.default_label(kind))
        .to_string();
    let method = non_blank(record.payment_method.as_deref())
        .unwrap_or(config.unspecified_method.as_str())
        .to_string();

    Some(ClassifiedRecord {
        kind,
        amount: normalized_amount,
        entity,
        category,
        method,
        month: record.month_key(),
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_keyword_overrides_sign() {
        let record = FlowRecord::new(1500.0).with_category("Prêt immobilier");
        let result = classify(&record);
        assert_eq!(result.kind, FlowKind::Credit);
        assert_eq!(result.normalized_amount, 1500.0);
    }

    #[test]
    fn credit_keyword_overrides_explicit_kind() {
        let record = FlowRecord::new(300.0)
            .with_kind(FlowKind::Income)
            .with_category("Car LOAN repayment");
        assert_eq!(classify(&record).kind, FlowKind::Credit);
    }

    #[test]
    fn keyword_vocabulary_is_case_insensitive() {
        assert!(is_credit_label("CRÉDIT relais"));
        assert!(is_credit_label("credit card"));
        assert!(is_credit_label("PRÊT"));
        assert!(!is_credit_label("rental"));
    }

    #[test]
    fn sign_decides_when_kind_is_absent() {
        assert_eq!(classify(&FlowRecord::new(10.0)).kind, FlowKind::Income);
        let expense = classify(&FlowRecord::new(-42.5));
        assert_eq!(expense.kind, FlowKind::Expense);
        assert_eq!(expense.normalized_amount, 42.5);
    }

    #[test]
    fn zero_and_nan_are_skipped() {
        let config = AggregateConfig::default();
        assert!(classify_record(&FlowRecord::new(0.0), &config).is_none());
        assert!(classify_record(&FlowRecord::new(f64::NAN), &config).is_none());
        assert!(classify_record(&FlowRecord::new(f64::INFINITY), &config).is_none());
    }

    #[test]
    fn absent_fields_fall_back_to_placeholders() {
        let config = AggregateConfig::default();
        let classified = classify_record(&FlowRecord::new(-20.0).with_entity("  "), &config).unwrap();
        assert_eq!(classified.entity, "no-entity");
        assert_eq!(classified.method, "unspecified");
        assert_eq!(classified.category, "Other expenses");
        assert_eq!(classified.month, "undated");
    }
}
