use crate::models::{CheckerConfig, DealResult, DealRules, ProductSnapshot, StockRule};

/// Deal verdict for a snapshot, before it is wrapped into a [`DealResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealVerdict {
    pub deal: bool,
    pub matching_stores: Vec<String>,
}

/// Applies the deal rules to a snapshot.
///
/// A deal needs all of: price strictly below the threshold, at least one in-stock store
/// when stock is required, and a non-empty intersection between the rule stores and the
/// in-stock stores. Matching stores keep the order they have in the rules.
pub fn evaluate(rules: &DealRules, snapshot: &ProductSnapshot) -> DealVerdict {
    let mut deal = snapshot.price < rules.price_below_usd;

    let in_stock: Vec<&str> = snapshot.in_stock_stores().collect();
    let mut matching_stores: Vec<String> = Vec::new();
    for store in &rules.stores {
        if in_stock.contains(&store.as_str()) && !matching_stores.contains(store) {
            matching_stores.push(store.clone());
        }
    }

    if rules.stock == StockRule::Available && in_stock.is_empty() {
        deal = false;
    }
    if matching_stores.is_empty() {
        deal = false;
    }

    DealVerdict {
        deal,
        matching_stores: if deal { matching_stores } else { Vec::new() },
    }
}

/// Assembles the full check result. The link comes from configuration, not the page.
pub fn assemble_result(config: &CheckerConfig, snapshot: ProductSnapshot) -> DealResult {
    let verdict = evaluate(&config.rules, &snapshot);
    DealResult {
        name: snapshot.name,
        link: config.link.clone(),
        price: snapshot.price,
        deal: verdict.deal,
        stores: verdict.matching_stores,
        criteria: config.rules.clone(),
    }
}
