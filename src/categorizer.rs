use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{ReckonError, Result};
use crate::models::{Category, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    Contains,
    StartsWith,
    Regex,
    /// Equality with the category printed on the statement.
    Hint,
}

impl MatchType {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::Regex => "regex",
            Self::Hint => "hint",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub pattern: String,
    #[serde(default)]
    pub match_type: MatchType,
    pub category: Category,
}

impl Rule {
    pub fn new(pattern: &str, match_type: MatchType, category: Category) -> Self {
        Self {
            pattern: pattern.to_string(),
            match_type,
            category,
        }
    }
}

struct CompiledRule {
    rule: Rule,
    pattern_lower: String,
    regex: Option<Regex>,
}

/// Ordered rule table. Rules are never re-sorted: position is precedence.
pub struct RuleEngine {
    rules: Vec<CompiledRule>,
}

impl RuleEngine {
    pub fn new(rules: &[Rule]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let regex = match rule.match_type {
                MatchType::Regex => Some(
                    RegexBuilder::new(&rule.pattern)
                        .case_insensitive(true)
                        .build()
                        .map_err(|e| {
                            ReckonError::Config(format!("invalid rule regex '{}': {e}", rule.pattern))
                        })?,
                ),
                _ => None,
            };
            compiled.push(CompiledRule {
                rule: rule.clone(),
                pattern_lower: rule.pattern.to_lowercase(),
                regex,
            });
        }
        Ok(Self { rules: compiled })
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|cr| &cr.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Index and rule of the first rule that matches, in table order.
    pub fn find_matching_rule(&self, txn: &Transaction) -> Option<(usize, &Rule)> {
        let description = txn.description.to_lowercase();
        let merchant = txn.merchant.as_deref().unwrap_or("").to_lowercase();
        let hint = txn.category_hint.as_deref().unwrap_or("").trim().to_lowercase();
        self.rules
            .iter()
            .enumerate()
            .find(|(_, cr)| matches(cr, &description, &merchant, &hint))
            .map(|(idx, cr)| (idx, &cr.rule))
    }
}

fn matches(cr: &CompiledRule, description: &str, merchant: &str, hint: &str) -> bool {
    let pat = cr.pattern_lower.as_str();
    match cr.rule.match_type {
        MatchType::Contains => description.contains(pat) || merchant.contains(pat),
        MatchType::StartsWith => description.starts_with(pat) || merchant.starts_with(pat),
        MatchType::Regex => cr
            .regex
            .as_ref()
            .is_some_and(|re| re.is_match(description) || re.is_match(merchant)),
        MatchType::Hint => !hint.is_empty() && hint == pat,
    }
}

pub struct CategorizeResult {
    pub categorized: usize,
    pub uncategorized: usize,
    /// Matches per rule, indexed like the rule table.
    pub hits: Vec<usize>,
}

/// Assigns a category to every transaction. Only the derived `category`
/// field is written.
pub fn categorize_transactions(engine: &RuleEngine, txns: &mut [Transaction]) -> CategorizeResult {
    let mut hits = vec![0usize; engine.len()];
    let mut categorized = 0usize;
    let mut uncategorized = 0usize;

    for txn in txns.iter_mut() {
        match engine.find_matching_rule(txn) {
            Some((idx, rule)) => {
                hits[idx] += 1;
                categorized += 1;
                txn.category = Some(rule.category);
            }
            None => {
                uncategorized += 1;
                txn.category = Some(Category::Uncategorized);
            }
        }
    }

    tracing::info!(categorized, uncategorized, "categorized transactions");
    CategorizeResult {
        categorized,
        uncategorized,
        hits,
    }
}

fn keywords(rules: &mut Vec<Rule>, category: Category, words: &[&str]) {
    rules.extend(words.iter().map(|w| Rule::new(w, MatchType::Contains, category)));
}

/// Default rule table. Transfers and income come first so that card
/// payments and paychecks never fall into a spending category.
pub fn default_rules() -> Vec<Rule> {
    let mut rules = Vec::new();
    keywords(
        &mut rules,
        Category::Transfer,
        &[
            "applecard",
            "apple card",
            "robinhood card",
            "robinhood credit",
            "venmo",
            "paypal",
            "online transfer",
            "credit card payment",
            "payment thank you",
        ],
    );
    keywords(&mut rules, Category::Income, &["payroll", "direct dep", "interest paid"]);
    for word in [r"\brent\b", r"\blease\b"] {
        rules.push(Rule::new(word, MatchType::Regex, Category::Rent));
    }
    keywords(
        &mut rules,
        Category::Rent,
        &["apartment", "building management", "property management"],
    );
    keywords(
        &mut rules,
        Category::Utilities,
        &[
            "electric", "internet", "wifi", "verizon", "at&t", "t-mobile", "tmobile", "con ed",
            "coned", "utility", "national grid", "water",
        ],
    );
    for hint in ["restaurants", "alcohol"] {
        rules.push(Rule::new(hint, MatchType::Hint, Category::DiningOut));
    }
    rules.push(Rule::new("grocery", MatchType::Hint, Category::Groceries));
    keywords(
        &mut rules,
        Category::Groceries,
        &["grocery", "supermarket", "whole foods", "wholefds", "trader joe", "food market", "bodega"],
    );
    keywords(&mut rules, Category::Transit, &["nyct", "mta", "metro", "subway", "transit"]);
    keywords(&mut rules, Category::Taxi, &["uber", "lyft", "taxi", "curb"]);
    keywords(
        &mut rules,
        Category::Subscriptions,
        &[
            "subscription", "netflix", "spotify", "apple.com", "amazon prime", "hulu", "disney",
            "hbo", "youtube premium", "gym", "fitness", "membership",
        ],
    );
    rules.push(Rule::new("shopping", MatchType::Hint, Category::Shopping));
    keywords(
        &mut rules,
        Category::Shopping,
        &[
            "amazon", "target", "walmart", "clothing", "apparel", "bloomingdale", "macy",
            "nordstrom", "adidas", "nike", "uniqlo", "zara", "h&m",
        ],
    );
    keywords(
        &mut rules,
        Category::Home,
        &[
            "furniture", "ikea", "home depot", "lowes", "bed bath", "hardware", "cleaning",
            "laundry", "dry clean",
        ],
    );
    rules
}
