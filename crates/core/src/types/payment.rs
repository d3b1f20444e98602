//! Payment-method display labels.
//!
//! Checkout stores the payment method as a free-form string (`"cod"`,
//! `"UPI - GPay"`, `"credit_card"`, ...). Reports and order pages group them
//! under a fixed set of labels by matching substrings against an ordered rule
//! table; the first rule with a matching needle wins.

/// One label rule: any needle contained in the lower-cased input selects the
/// label.
struct LabelRule {
    needles: &'static [&'static str],
    label: &'static str,
}

const RULES: &[LabelRule] = &[
    LabelRule {
        needles: &["cod", "cash"],
        label: "Cash on Delivery",
    },
    LabelRule {
        needles: &["upi", "gpay", "phonepe", "paytm"],
        label: "UPI",
    },
    LabelRule {
        needles: &["card", "credit", "debit", "visa", "mastercard", "rupay"],
        label: "Card",
    },
    LabelRule {
        needles: &["netbanking", "net_banking", "net banking", "bank"],
        label: "Net Banking",
    },
    LabelRule {
        needles: &["wallet"],
        label: "Wallet",
    },
    LabelRule {
        needles: &["paypal"],
        label: "PayPal",
    },
];

/// Label used when no rule matches.
pub const OTHER_PAYMENT_LABEL: &str = "Other";

/// Map a raw payment-method string to its display label.
///
/// ```
/// use verdant_core::payment_method_label;
///
/// assert_eq!(payment_method_label("COD"), "Cash on Delivery");
/// assert_eq!(payment_method_label("upi"), "UPI");
/// assert_eq!(payment_method_label("barter"), "Other");
/// ```
#[must_use]
pub fn payment_method_label(raw: &str) -> &'static str {
    let lower = raw.trim().to_lowercase();
    if lower.is_empty() {
        return OTHER_PAYMENT_LABEL;
    }
    RULES
        .iter()
        .find(|rule| rule.needles.iter().any(|needle| lower.contains(needle)))
        .map_or(OTHER_PAYMENT_LABEL, |rule| rule.label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_from_common_inputs() {
        let cases = [
            ("cod", "Cash on Delivery"),
            ("Cash on Delivery", "Cash on Delivery"),
            ("UPI - GPay", "UPI"),
            ("phonepe", "UPI"),
            ("credit_card", "Card"),
            ("Debit Card", "Card"),
            ("netbanking", "Net Banking"),
            ("HDFC Bank", "Net Banking"),
            ("wallet", "Wallet"),
            ("PayPal", "PayPal"),
            ("", "Other"),
            ("crypto", "Other"),
        ];
        for (raw, expected) in cases {
            assert_eq!(payment_method_label(raw), expected, "input {raw:?}");
        }
    }

    #[test]
    fn test_earlier_rule_wins() {
        // "cash card" matches both the cash and card rules.
        assert_eq!(payment_method_label("cash card"), "Cash on Delivery");
    }
}
