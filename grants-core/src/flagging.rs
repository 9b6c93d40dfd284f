//! Notable-grant rules.
//!
//! A grant is notable when any rule matches it. Rules are evaluated in
//! order and the first match supplies the reason, so earlier rules take
//! precedence over later, more general ones.
//!
//! ```
//! use rust_decimal_macros::dec;
//! use grants_core::Grant;
//! use grants_core::flagging::NotableRules;
//!
//! let rules = NotableRules::standard();
//! let grant = Grant {
//!     agreement_title: "Regional museum expansion".to_string(),
//!     agreement_value: dec!(20000000),
//!     ..Grant::default()
//! };
//!
//! // The arts keyword rule comes before the mega-grant rule.
//! assert!(rules.classify(&grant).unwrap().starts_with("Arts/culture"));
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use crate::db::{GrantRepository, RepositoryError};
use crate::models::Grant;

pub const MEGA_GRANT_THRESHOLD: Decimal = dec!(10000000);

/// Text field of a domestic grant a keyword rule can inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantField {
    Title,
    Description,
    RecipientLegalName,
    RecipientCity,
    ProgramName,
}

impl GrantField {
    fn read(self, grant: &Grant) -> &str {
        match self {
            Self::Title => &grant.agreement_title,
            Self::Description => &grant.description,
            Self::RecipientLegalName => &grant.recipient_legal_name,
            Self::RecipientCity => &grant.recipient_city,
            Self::ProgramName => &grant.program_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulePredicate {
    /// Any (field, keyword) pair matches as a case-insensitive substring.
    AnyKeyword {
        fields: Vec<GrantField>,
        keywords: Vec<String>,
    },
    /// Any of the inner predicates matches.
    Any(Vec<RulePredicate>),
    /// Grant value at or above the bound.
    MinValue(Decimal),
}

impl RulePredicate {
    fn keywords(
        fields: &[GrantField],
        keywords: &[&str],
    ) -> Self {
        Self::AnyKeyword {
            fields: fields.to_vec(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn matches(
        &self,
        grant: &Grant,
    ) -> bool {
        match self {
            Self::AnyKeyword { fields, keywords } => fields.iter().any(|field| {
                let text = field.read(grant).to_lowercase();
                keywords.iter().any(|keyword| text.contains(keyword.as_str()))
            }),
            Self::Any(predicates) => predicates.iter().any(|p| p.matches(grant)),
            Self::MinValue(bound) => grant.agreement_value >= *bound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotableRule {
    pub predicate: RulePredicate,
    pub reason: String,
}

impl NotableRule {
    pub fn new(
        predicate: RulePredicate,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            predicate,
            reason: reason.into(),
        }
    }
}

const CATEGORY_FIELDS: &[GrantField] = &[
    GrantField::Title,
    GrantField::Description,
    GrantField::RecipientLegalName,
    GrantField::ProgramName,
];

const TITLE_AND_DESCRIPTION: &[GrantField] = &[GrantField::Title, GrantField::Description];

const INTERNATIONAL_KEYWORDS: &[&str] = &[
    "vietnam", "china", "africa", "bangladesh", "india", "pakistan",
    "international development", "overseas", "foreign", "global south",
    "developing countries", "third world", "cambodia", "laos", "myanmar",
    "ethiopia", "kenya", "ghana", "nigeria", "haiti", "jamaica",
    "latin america", "south america", "central america", "caribbean",
];

const GENDER_DIVERSITY_KEYWORDS: &[&str] = &[
    "gender", "women empowerment", "feminist", "lgbtq", "transgender",
    "diversity", "inclusion", "equity", "dei programs", "bias training",
    "gender-based", "women-led", "gender equality", "gender justice",
    "intersectional", "marginalized communities", "underrepresented",
];

const CLIMATE_KEYWORDS: &[&str] = &[
    "climate change", "carbon neutral", "net zero", "green transition",
    "renewable energy", "solar panels", "wind energy", "electric vehicles",
    "carbon capture", "emissions reduction", "sustainability",
    "environmental justice", "clean technology", "green infrastructure",
];

const ARTS_CULTURE_KEYWORDS: &[&str] = &[
    "arts funding", "cultural project", "museum", "theatre", "dance",
    "music festival", "art gallery", "cultural center", "heritage",
    "artistic expression", "creative industries", "film production",
    "documentary", "cultural preservation", "indigenous art",
];

const ODD_KEYWORDS: &[&str] = &[
    "rice cultivation", "beekeeping", "goat farming", "chicken raising",
    "mushroom growing", "fish farming", "aquaculture", "seaweed",
    "cricket farming", "insect protein", "urban gardening",
    "community composting", "food waste", "vertical farming",
];

const ACADEMIC_KEYWORDS: &[&str] = &[
    "gender studies", "social justice research", "decolonization",
    "indigenous knowledge", "traditional healing", "storytelling",
    "oral history", "community engagement", "participatory research",
    "action research", "feminist methodology",
];

const SPECIFIC_TERMS: &[(&str, &str)] = &[
    ("greening our rice", "Controversial Vietnam rice project - criticized for overseas spending"),
    ("gender-just", "Gender justice project - controversial social programming"),
    ("decolonizing", "Decolonization project - divisive academic initiative"),
    ("reconciliation", "Indigenous reconciliation - while important, often debated in scope/cost"),
    ("anti-racism", "Anti-racism training - controversial diversity programming"),
    ("equity training", "Equity training - divisive workplace programming"),
    ("community garden", "Community gardening - questionable use of federal funds for local projects"),
    ("food security", "Food security project - often overlaps with provincial responsibilities"),
];

/// Ordered rule list; the first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotableRules {
    rules: Vec<NotableRule>,
}

impl NotableRules {
    pub fn new(rules: Vec<NotableRule>) -> Self {
        Self { rules }
    }

    /// Keyword categories, then specific terms, then foreign recipients,
    /// then mega-grants.
    pub fn standard() -> Self {
        let categories: [(&[&str], &str); 6] = [
            (
                INTERNATIONAL_KEYWORDS,
                "International development project - spending Canadian tax dollars overseas",
            ),
            (
                GENDER_DIVERSITY_KEYWORDS,
                "Gender/diversity initiative - controversial social programming",
            ),
            (
                CLIMATE_KEYWORDS,
                "Climate change project - expensive environmental initiative",
            ),
            (
                ARTS_CULTURE_KEYWORDS,
                "Arts/culture funding - non-essential spending during economic challenges",
            ),
            (
                ODD_KEYWORDS,
                "Unusual/odd project - questionable relevance to Canadian priorities",
            ),
            (
                ACADEMIC_KEYWORDS,
                "Academic/research project - theoretical spending with unclear practical benefits",
            ),
        ];

        let mut rules: Vec<NotableRule> = categories
            .into_iter()
            .map(|(keywords, reason)| {
                NotableRule::new(RulePredicate::keywords(CATEGORY_FIELDS, keywords), reason)
            })
            .collect();

        rules.extend(SPECIFIC_TERMS.iter().map(|(term, reason)| {
            NotableRule::new(RulePredicate::keywords(TITLE_AND_DESCRIPTION, &[*term]), *reason)
        }));

        rules.push(NotableRule::new(
            RulePredicate::Any(vec![
                RulePredicate::keywords(
                    &[GrantField::RecipientLegalName],
                    &["vietnam", "international"],
                ),
                RulePredicate::keywords(
                    &[GrantField::RecipientCity],
                    &["hanoi", "ho chi minh"],
                ),
            ]),
            "Foreign recipient - Canadian tax dollars going to overseas organizations",
        ));

        rules.push(NotableRule::new(
            RulePredicate::MinValue(MEGA_GRANT_THRESHOLD),
            "Mega-grant over $10M - requires public scrutiny due to size",
        ));

        Self { rules }
    }

    pub fn rules(&self) -> &[NotableRule] {
        &self.rules
    }

    /// Reason of the first matching rule.
    pub fn classify(
        &self,
        grant: &Grant,
    ) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.predicate.matches(grant))
            .map(|rule| rule.reason.as_str())
    }
}

/// Flags every matching grant that is not already notable.
///
/// With `reset`, existing flags are cleared first. Returns the number of
/// grants flagged by this run.
pub async fn flag_notable_grants(
    repo: &dyn GrantRepository,
    rules: &NotableRules,
    reset: bool,
) -> Result<u64, RepositoryError> {
    if reset {
        let cleared = repo.reset_notable_flags().await?;
        info!(cleared, "reset notable flags");
    }

    let mut flagged = 0u64;
    for grant in repo.all_grants().await? {
        if grant.is_notable {
            continue;
        }
        if let Some(reason) = rules.classify(&grant) {
            debug!(grant_id = grant.id, reason, "flagging grant");
            repo.set_notable(grant.id, reason).await?;
            flagged += 1;
        }
    }

    info!(flagged, "notable flagging complete");
    Ok(flagged)
}
