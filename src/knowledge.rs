//! Built-in case-study knowledge pack.
//!
//! All the fixed data the assistant is configured with at construction
//! time: the rule table, courtesy phrase sets, topic keyword sets, the
//! universal domain term list, canned reply strings, and the baseline
//! corpus passages. Nothing here is module-level mutable state — callers
//! load this data once and inject it into the matcher, classifier, and
//! resolver.
//!
//! An optional TOML file of extra `[[rule]]` entries can extend the
//! built-in table; malformed files are a fatal configuration error.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::rules::PhraseSet;
use crate::topics::Topic;

// ============ Fixed reply strings ============

/// Reply for blank or too-short input.
pub const PROMPT_FOR_INPUT: &str = "Please ask me a question about Rubber Bumper Co.";

/// Reply when the query contains no domain term at all.
pub const OUT_OF_SCOPE_REPLY: &str = "I can only answer questions about Rubber Bumper Co. \
     Please ask me about their products, market position, financials, or strategic options.";

/// Last-resort summary when every other tier produced nothing.
pub const FALLBACK_SUMMARY: &str = "Rubber Bumper Co is a small family-owned producer of rubber \
     products that makes rubber bands and condoms. They're considering converting their rubber \
     band factory to produce more condoms due to market trends and profitability differences.";

const GREETING_REPLY: &str =
    "Hello! I'm your Rubber Bumper case study assistant. How can I help you?";

const THANKS_REPLY: &str = "You're welcome!";

const IDENTITY_REPLY: &str = "I'm a specialized assistant for the Rubber Bumper case study. \
     I can answer questions about their products, market position, financial data, and \
     strategic options.";

// ============ Courtesy phrase sets ============

/// Greeting, thanks, and identity phrase sets with their fixed replies.
///
/// Greeting and thanks matches are length-bounded so a long question that
/// merely contains "hey" is not treated as small talk; identity questions
/// ("who are you") match anywhere in the message.
pub fn courtesy_sets() -> Vec<PhraseSet> {
    vec![
        PhraseSet::new(
            &[
                "hello",
                "hi ",
                "hey",
                "greetings",
                "howdy",
                "good morning",
                "good afternoon",
                "good evening",
            ],
            GREETING_REPLY,
            true,
        ),
        PhraseSet::new(
            &["thank you", "thanks", "appreciate", "grateful"],
            THANKS_REPLY,
            true,
        ),
        PhraseSet::new(
            &[
                "who are you",
                "what are you",
                "what can you do",
                "how do you work",
                "what do you know",
            ],
            IDENTITY_REPLY,
            false,
        ),
    ]
}

// ============ Rule table ============

/// The built-in trigger → answer table, in definition order.
///
/// Definition order matters: the substring-containment pass answers with
/// the first containing key. Company-identity phrasings sit at the top so
/// the "company name" shortcut stays a plain rule entry.
pub fn rule_entries() -> Vec<(&'static str, &'static str)> {
    vec![
        // Company information
        ("company name", "Rubber Bumper Co."),
        ("name of the company", "Rubber Bumper Co."),
        ("what is the company", "Rubber Bumper Co."),
        ("who is the company", "Rubber Bumper Co."),
        (
            "about the company",
            "Rubber Bumper Co is a small family-owned producer of rubber products.",
        ),
        (
            "tell me about rubber bumper",
            "Rubber Bumper Co is a small family-owned producer of rubber products that sells \
             rubber bands and condoms with highest quality on the market.",
        ),
        (
            "what does rubber bumper do",
            "Rubber Bumper Co produces and sells rubber bands and condoms.",
        ),
        (
            "what type of company",
            "Rubber Bumper Co is a small family-owned manufacturing company.",
        ),
        (
            "company size",
            "Rubber Bumper Co is a small family-owned company with two factories.",
        ),
        // Products
        (
            "what product",
            "Rubber Bumper Co sells two products: rubber bands and condoms.",
        ),
        (
            "what does rubber bumper make",
            "Rubber Bumper Co makes rubber bands and condoms.",
        ),
        (
            "what does rubber bumper sell",
            "Rubber Bumper Co sells rubber bands and condoms.",
        ),
        (
            "how many products",
            "Rubber Bumper Co sells two products: rubber bands and condoms.",
        ),
        // Market position
        (
            "market position",
            "Rubber Bumper is the market leader in both their product industries (rubber bands \
             and condoms).",
        ),
        (
            "market share",
            "In the rubber band market, Rubber Bumper's share has decreased from 4 million pounds \
             in 2011 to 2 million pounds in 2017. In the condom market, they've grown from 1 \
             million units in 2011 to 10 million in 2017.",
        ),
        (
            "industry position",
            "Rubber Bumper is the market leader in both their product industries.",
        ),
        (
            "leader",
            "Rubber Bumper is the market leader in both their product industries.",
        ),
        // Sales
        (
            "topline sales",
            "Topline sales have remained relatively stable over the last 3 years.",
        ),
        (
            "sales trend",
            "Topline sales have remained relatively stable over the last 3 years, despite \
             decreasing profits.",
        ),
        (
            "sales history",
            "Rubber band sales have decreased from 4 million pounds in 2011 to 2 million pounds \
             in 2017. Condom sales have increased from 1 million units in 2011 to 10 million in \
             2017.",
        ),
        // Profitability
        (
            "decreas",
            "Rubber Bumper has experienced decreasing profits over the last couple of years, \
             despite stable sales.",
        ),
        (
            "profit",
            "The condom factory had a profit of $4.5 million in 2017, while the rubber band \
             factory had a profit of $4 million.",
        ),
        (
            "margin",
            "The condom factory has a 60% profit margin, while the rubber band factory has a 40% \
             profit margin.",
        ),
        (
            "which is more profitable",
            "The condom business is more profitable with a 60% margin compared to the rubber band \
             business with a 40% margin.",
        ),
        // Markets
        (
            "rubber band market",
            "The rubber band market has been flat (around 30-31 million pounds annually). Rubber \
             Bumper's share has decreased from 4 million pounds in 2011 to 2 million pounds in \
             2017. The dominant player (Max Rubber) has increased from 17 to 24 million pounds.",
        ),
        (
            "condom market",
            "The condom market has grown from 350 million units in 2011 to 450 million in 2017 \
             (30% growth). Rubber Bumper's sales grew from 1 million to 10 million units but have \
             plateaued since 2014.",
        ),
        (
            "market growth",
            "The rubber band market has been flat, while the condom market has grown 30% from \
             2011 to 2017.",
        ),
        (
            "market trend",
            "The rubber band market has been flat, while the condom market has shown strong \
             growth (30% from 2011 to 2017).",
        ),
        // Factories
        (
            "factory",
            "Rubber Bumper has two factories: a larger rubber band factory with $4 million annual \
             overhead, and a smaller condom factory with $2 million annual overhead.",
        ),
        (
            "factories",
            "Rubber Bumper has two factories: a larger rubber band factory with $4 million annual \
             overhead, and a smaller condom factory with $2 million annual overhead.",
        ),
        (
            "production",
            "Rubber Bumper produces rubber bands in one factory and condoms in another factory.",
        ),
        (
            "how many factories",
            "Rubber Bumper has two factories - one for rubber bands and one for condoms.",
        ),
        // Factory conversion
        (
            "convert",
            "Converting the rubber band factory to produce condoms would cost $2 million and take \
             1 year. After conversion, the factory could produce 20 million condoms total, with a \
             potential profit of $11 million. The payback period would be approximately 5 years.",
        ),
        (
            "conversion",
            "Converting the rubber band factory to produce condoms would cost $2 million and take \
             1 year. After conversion, the factory could produce 20 million condoms total, with a \
             potential profit of $11 million. The payback period would be approximately 5 years.",
        ),
        (
            "should they",
            "Converting the factory has long-term benefits but the 5-year payback period exceeds \
             the company's 4-year target. Market research to verify demand for increased condom \
             production is recommended.",
        ),
        // Recommendations
        (
            "recommendation",
            "The company should first invest in market research to verify demand for increased \
             condom production, while also exploring ways to reduce conversion costs to improve \
             project economics.",
        ),
        (
            "what should they do",
            "The company should first invest in market research to verify demand for increased \
             condom production, while also exploring ways to reduce conversion costs to improve \
             project economics.",
        ),
        (
            "best option",
            "The best option is to first verify market demand for increased condom production \
             before committing to the factory conversion, as the payback period currently exceeds \
             their target.",
        ),
        // Risks
        (
            "risk",
            "Key risks include: assuming Rubber Bumper can triple condom sales immediately, \
             potential rebound in rubber band demand, political changes affecting the condom \
             market, less product diversification, and employee resistance.",
        ),
        (
            "concern",
            "Key concerns include: the 5-year payback period exceeds the company's 4-year target, \
             the assumption of tripling condom sales immediately may be unrealistic, and loss of \
             product diversification increases market risk.",
        ),
        // Competitors
        (
            "competitor",
            "In rubber bands, the main competitor is Max Rubber (24 million pounds in 2017). In \
             condoms, major competitors are Spartan (115 million units) and Durable (170 million \
             units).",
        ),
        (
            "who are the competitors",
            "In rubber bands, the main competitor is Max Rubber. In condoms, major competitors \
             are Spartan and Durable.",
        ),
        // Financial details
        (
            "revenue",
            "The rubber band factory generates $10 million in revenue. The condom factory \
             generates $7.5 million in revenue.",
        ),
        (
            "cost",
            "Variable costs for the rubber band factory are $2 million, with $4 million overhead. \
             Variable costs for the condom factory are $1 million, with $2 million overhead.",
        ),
        (
            "overhead",
            "The rubber band factory has $4 million in annual overhead. The condom factory has $2 \
             million in annual overhead.",
        ),
        // President
        (
            "president",
            "The company has recently appointed a new President who noticed decreasing profits \
             over the last couple of years.",
        ),
        (
            "who is the president",
            "The case study mentions that Rubber Bumper Co has recently appointed a new President \
             who noticed decreasing profits.",
        ),
    ]
}

// ============ Domain relevance ============

/// Broad term list describing the assistant's subject matter. A query
/// containing none of these (substring match on the normalized text) is
/// answered with [`OUT_OF_SCOPE_REPLY`].
pub fn domain_terms() -> Vec<&'static str> {
    vec![
        "rubber",
        "bumper",
        "band",
        "condom",
        "factory",
        "profit",
        "market",
        "competitor",
        "risk",
        "conversion",
        "president",
        "product",
        "margin",
        "overhead",
        "payback",
        "cost",
        "revenue",
        "sales",
        "strategic",
        "company",
    ]
}

// ============ Topic keyword sets ============

/// Per-topic whole-word trigger sets, in [`Topic::ALL`] priority order.
pub fn topic_keywords() -> Vec<(Topic, Vec<&'static str>)> {
    vec![
        (
            Topic::Product,
            vec![
                "product", "products", "make", "makes", "making", "sell", "sells", "selling",
                "produce", "produces", "goods",
            ],
        ),
        (
            Topic::Factory,
            vec![
                "factory",
                "factories",
                "plant",
                "plants",
                "production",
                "manufacturing",
                "overhead",
            ],
        ),
        (
            Topic::Market,
            vec![
                "market",
                "markets",
                "share",
                "industry",
                "competitor",
                "competitors",
                "demand",
                "leader",
            ],
        ),
        (
            Topic::Financial,
            vec![
                "profit",
                "profits",
                "profitable",
                "profitability",
                "margin",
                "margins",
                "revenue",
                "revenues",
                "cost",
                "costs",
                "overhead",
                "financial",
                "sales",
            ],
        ),
        (
            Topic::Conversion,
            vec![
                "convert",
                "converting",
                "converted",
                "conversion",
                "payback",
                "switch",
                "switching",
            ],
        ),
        (
            Topic::Recommendation,
            vec![
                "recommendation",
                "recommendations",
                "recommend",
                "advice",
                "advise",
                "should",
                "option",
                "options",
                "strategy",
                "strategic",
            ],
        ),
    ]
}

/// Canned answer for a classified topic.
///
/// Sub-cases are checked only after topic selection: a market query is
/// split by which product it mentions.
pub fn topic_answer(topic: Topic, query: &str) -> &'static str {
    match topic {
        Topic::Product => "Rubber Bumper Co sells two products: rubber bands and condoms.",
        Topic::Factory => {
            "Rubber Bumper Co has two factories - one for producing rubber bands and one for \
             producing condoms."
        }
        Topic::Market => {
            if query.contains("condom") {
                "The condom market has grown from 350 million units in 2011 to 450 million in \
                 2017 (30% growth). Rubber Bumper's sales grew from 1 million to 10 million units \
                 but have plateaued since 2014."
            } else if query.contains("band") {
                "The rubber band market has been flat (around 30-31 million pounds annually). \
                 Rubber Bumper's share has decreased from 4 million pounds in 2011 to 2 million \
                 pounds in 2017. The dominant player (Max Rubber) has increased from 17 to 24 \
                 million pounds."
            } else {
                "Rubber Bumper is the market leader in both their product industries (rubber \
                 bands and condoms)."
            }
        }
        Topic::Financial => {
            "The condom business is more profitable with a 60% margin compared to the rubber \
             band business with a 40% margin."
        }
        Topic::Conversion => {
            "Converting the rubber band factory to produce condoms would cost $2 million and \
             take 1 year. After conversion, the factory could produce 20 million condoms total, \
             with a potential profit of $11 million. The payback period would be approximately 5 \
             years."
        }
        Topic::Recommendation => {
            "The company should first invest in market research to verify demand for increased \
             condom production, while also exploring ways to reduce conversion costs to improve \
             project economics."
        }
    }
}

// ============ Baseline corpus ============

/// The built-in case-study passages seeded into the document index.
///
/// Callers (CLI and server) seed these at startup and reseed after a
/// clear; the index itself never seeds.
pub fn baseline_passages() -> Vec<String> {
    [
        "Rubber Bumper Co is a small family-owned producer of rubber products.\n\
         The company sells two products: rubber bands and condoms.\n\
         It is the market leader in both of its product industries.\n\
         A new President was recently appointed after profits declined.",
        "Topline sales at Rubber Bumper have remained relatively stable over the last 3 years.\n\
         Profits, however, have been decreasing over the last couple of years.\n\
         The new President wants to understand why profits fell while sales held steady.",
        "The rubber band market has been flat at around 30-31 million pounds annually.\n\
         Rubber Bumper's rubber band sales decreased from 4 million pounds in 2011 to 2 million \
         pounds in 2017.\n\
         The dominant competitor, Max Rubber, grew from 17 to 24 million pounds over the same \
         period.",
        "The condom market grew from 350 million units in 2011 to 450 million units in 2017, \
         about 30% growth.\n\
         Rubber Bumper's condom sales grew from 1 million units in 2011 to 10 million units in \
         2017.\n\
         Their condom sales have plateaued since 2014.\n\
         Major condom competitors are Spartan with 115 million units and Durable with 170 \
         million units.",
        "Rubber Bumper operates two factories.\n\
         The larger rubber band factory carries $4 million in annual overhead and $2 million in \
         variable costs, generating $10 million in revenue.\n\
         The smaller condom factory carries $2 million in annual overhead and $1 million in \
         variable costs, generating $7.5 million in revenue.\n\
         The condom factory earns a 60% profit margin; the rubber band factory earns 40%.",
        "Converting the rubber band factory to condom production would cost $2 million and take \
         1 year.\n\
         After conversion the company could produce 20 million condoms in total, with a \
         potential profit of $11 million.\n\
         The payback period is approximately 5 years, which exceeds the company's 4-year \
         investment target.",
        "Key risks of the conversion include the assumption that condom sales can triple \
         immediately, a potential rebound in rubber band demand, political changes affecting \
         the condom market, reduced product diversification, and employee resistance.",
        "The recommended next step is to invest in market research to verify demand for \
         increased condom production.\n\
         The company should also explore ways to reduce conversion costs to improve the \
         project's economics before committing to the factory conversion.",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

// ============ Rule extension file ============

#[derive(Debug, Deserialize)]
struct RulesFile {
    #[serde(default)]
    rule: Vec<RuleEntryDef>,
}

#[derive(Debug, Deserialize)]
struct RuleEntryDef {
    trigger: String,
    answer: String,
}

/// Load extra rule entries from a TOML file of `[[rule]]` tables.
///
/// ```toml
/// [[rule]]
/// trigger = "founding year"
/// answer = "The case study does not state a founding year."
/// ```
///
/// Validation (empty/duplicate triggers) happens when the combined table
/// is built; a file that fails to parse is a fatal startup error.
pub fn load_extra_rules(path: &Path) -> Result<Vec<(String, String)>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rules file: {}", path.display()))?;
    let parsed: RulesFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse rules file: {}", path.display()))?;
    Ok(parsed
        .rule
        .into_iter()
        .map(|r| (r.trigger, r.answer))
        .collect())
}
