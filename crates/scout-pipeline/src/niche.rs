//! Keyword-based niche classification over bio and caption text.
//!
//! Text is lowercased and split into `\w+` tokens. Each keyword (itself
//! tokenized, so `"personal trainer"` and `"self-care"` become phrases)
//! scores one point per occurrence. The highest-scoring label wins; ties go
//! to the label declared first in [`Niche`].

use std::sync::LazyLock;

use regex::Regex;
use scout_core::Niche;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid regex"));

const KEYWORDS: &[(Niche, &[&str])] = &[
    (
        Niche::Fitness,
        &[
            "fitness", "workout", "gym", "exercise", "training", "muscle", "strength", "cardio",
            "yoga", "pilates", "crossfit", "bodybuilding", "weightlifting", "nutrition",
            "protein", "supplements", "health", "wellness", "diet", "personal trainer", "coach",
            "athlete", "sports", "running", "cycling",
        ],
    ),
    (
        Niche::Fashion,
        &[
            "fashion", "style", "outfit", "clothing", "dress", "shoes", "accessories", "beauty",
            "makeup", "skincare", "hair", "styling", "trend", "designer", "brand", "shopping",
            "retail", "model", "photoshoot", "runway",
        ],
    ),
    (
        Niche::Tech,
        &[
            "tech", "technology", "programming", "coding", "software", "developer", "engineer",
            "ai", "artificial intelligence", "machine learning", "data", "startup",
            "entrepreneur", "innovation", "gadgets", "apps", "digital", "cybersecurity",
            "blockchain", "crypto", "fintech", "saas",
        ],
    ),
    (
        Niche::Gaming,
        &[
            "gaming", "gamer", "streaming", "twitch", "youtube", "esports", "tournament",
            "console", "pc", "playstation", "xbox", "nintendo", "mobile games", "strategy",
            "rpg", "fps", "mmo", "indie games", "game development",
        ],
    ),
    (
        Niche::Food,
        &[
            "food", "cooking", "recipe", "chef", "restaurant", "cuisine", "dining", "baking",
            "pastry", "kitchen", "ingredients", "healthy eating", "vegan", "vegetarian",
            "organic", "farm to table", "foodie", "culinary", "gastronomy",
        ],
    ),
    (
        Niche::Travel,
        &[
            "travel", "traveling", "tourism", "vacation", "adventure", "explore", "destination",
            "wanderlust", "backpacking", "solo travel", "luxury travel", "hotels", "airbnb",
            "flights", "passport", "visa", "culture", "photography",
        ],
    ),
    (
        Niche::Business,
        &[
            "business", "entrepreneur", "startup", "marketing", "sales", "finance",
            "investment", "consulting", "strategy", "leadership", "management", "networking",
            "conference", "speaker", "mentor", "coaching", "success",
        ],
    ),
    (
        Niche::Education,
        &[
            "education", "learning", "teaching", "teacher", "professor", "student",
            "university", "college", "course", "tutorial", "training", "skill", "knowledge",
            "research", "academic", "scholar", "degree", "certification",
        ],
    ),
    (
        Niche::Entertainment,
        &[
            "entertainment", "comedy", "actor", "actress", "performer", "show", "movie", "film",
            "tv", "television", "series", "drama", "music", "singer", "artist", "celebrity",
            "influencer", "content creator",
        ],
    ),
    (
        Niche::Lifestyle,
        &[
            "lifestyle", "life", "daily", "routine", "motivation", "inspiration", "mindfulness",
            "meditation", "self-care", "productivity", "organization", "minimalism",
            "sustainability", "eco-friendly", "home", "family", "relationships",
        ],
    ),
    (
        Niche::Beauty,
        &[
            "beauty", "makeup", "skincare", "cosmetics", "skincare routine", "tutorial",
            "beauty tips", "products", "reviews", "transformation", "glow up", "hair care",
            "nail art", "fashion", "style", "aesthetic",
        ],
    ),
    (
        Niche::Health,
        &[
            "health", "medical", "doctor", "nurse", "healthcare", "wellness", "mental health",
            "therapy", "counseling", "meditation", "mindfulness", "nutrition", "diet",
            "supplements", "vitamins", "wellness coach",
        ],
    ),
    (
        Niche::Finance,
        &[
            "finance", "money", "investment", "trading", "stocks", "crypto", "budgeting",
            "saving", "debt", "credit", "banking", "financial planning", "wealth", "retirement",
            "insurance", "tax", "economy",
        ],
    ),
    (
        Niche::Sports,
        &[
            "sports", "athlete", "team", "competition", "championship", "league", "football",
            "soccer", "basketball", "tennis", "golf", "swimming", "cycling", "running",
            "marathon", "olympics", "coach", "training",
        ],
    ),
    (
        Niche::Art,
        &[
            "art", "artist", "painting", "drawing", "sculpture", "gallery", "exhibition",
            "creative", "design", "illustration", "digital art", "photography", "visual",
            "aesthetic", "inspiration", "portfolio",
        ],
    ),
    (
        Niche::Music,
        &[
            "music", "musician", "singer", "songwriter", "producer", "dj", "concert", "album",
            "single", "recording", "studio", "instrument", "guitar", "piano", "drums", "band",
            "performance", "live music",
        ],
    ),
    (
        Niche::Parenting,
        &[
            "parenting", "mom", "dad", "mother", "father", "family", "kids", "children", "baby",
            "toddler", "parenting tips", "childcare", "education", "activities", "family life",
            "work-life balance",
        ],
    ),
    (
        Niche::Diy,
        &[
            "diy", "craft", "handmade", "tutorial", "project", "home improvement", "woodworking",
            "sewing", "knitting", "crochet", "pottery", "jewelry", "upcycling", "repair",
            "construction", "tools", "workshop",
        ],
    ),
    (
        Niche::Photography,
        &[
            "photography", "photographer", "photo", "camera", "lens", "shooting", "portrait",
            "landscape", "wedding", "event", "studio", "editing", "photoshop", "lightroom",
            "equipment", "technique", "composition",
        ],
    ),
];

/// Pure, deterministic text → [`Niche`] classifier.
#[derive(Debug, Clone)]
pub struct NicheClassifier {
    /// Tokenized keywords per label, in priority order.
    tables: Vec<(Niche, Vec<Vec<String>>)>,
}

impl Default for NicheClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NicheClassifier {
    #[must_use]
    pub fn new() -> Self {
        let mut tables: Vec<(Niche, Vec<Vec<String>>)> = KEYWORDS
            .iter()
            .map(|(niche, words)| (*niche, words.iter().map(|w| tokenize(w)).collect()))
            .collect();
        tables.sort_by_key(|(niche, _)| *niche);
        Self { tables }
    }

    /// Best label for `text`, or [`Niche::Unknown`] when nothing matches.
    #[must_use]
    pub fn classify(&self, text: &str) -> Niche {
        self.classify_with_confidence(text).0
    }

    /// Best label plus `score / token_count`, capped at 1.
    #[must_use]
    pub fn classify_with_confidence(&self, text: &str) -> (Niche, f64) {
        let tokens = tokenize(text);
        let mut best = (Niche::Unknown, 0_usize);
        for (niche, score) in self.scores(&tokens) {
            // Strict comparison keeps the earlier (higher-priority) label on ties.
            if score > best.1 {
                best = (niche, score);
            }
        }
        (best.0, confidence(best.1, tokens.len()))
    }

    /// Up to `n` matching labels, best first, ties in priority order.
    #[must_use]
    pub fn rank(&self, text: &str, n: usize) -> Vec<(Niche, f64)> {
        let tokens = tokenize(text);
        let mut scored: Vec<(Niche, usize)> = self
            .scores(&tokens)
            .into_iter()
            .filter(|(_, score)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        scored
            .into_iter()
            .take(n)
            .map(|(niche, score)| (niche, confidence(score, tokens.len())))
            .collect()
    }

    fn scores(&self, tokens: &[String]) -> Vec<(Niche, usize)> {
        self.tables
            .iter()
            .map(|(niche, keywords)| {
                let score = keywords.iter().map(|kw| occurrences(tokens, kw)).sum();
                (*niche, score)
            })
            .collect()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn occurrences(tokens: &[String], phrase: &[String]) -> usize {
    if phrase.is_empty() || phrase.len() > tokens.len() {
        return 0;
    }
    tokens.windows(phrase.len()).filter(|w| *w == phrase).count()
}

fn confidence(score: usize, token_count: usize) -> f64 {
    if score == 0 || token_count == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = score as f64 / token_count as f64;
    ratio.min(1.0)
}
