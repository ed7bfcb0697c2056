//! Synthetic fallback content.
//!
//! When a live source is unreachable (or a stuck context needs backfilling),
//! the pipeline substitutes generated reviews customized to the user's
//! registered website domain. The generator is deterministic in shape —
//! fixed rating distribution, fixed text pools, fixed taxonomy — but random
//! in the values it draws.

use chrono::{Duration, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::models::{NewReview, Sentiment, Source};

/// Curated per-company content used to template synthetic reviews.
#[derive(Debug, Clone)]
pub struct CompanyProfile {
    pub name: String,
    pub domain: String,
    pub vertical: String,
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub categories: Vec<String>,
}

const USERNAMES: [&str; 10] = [
    "John D.", "Sarah M.", "Mike R.", "Lisa K.", "David P.", "Emma W.", "Alex T.", "Maria S.",
    "Chris L.", "Anna B.",
];

/// Rating weights over 1..=5, skewed positive.
const RATING_WEIGHTS: [(i64, u32); 5] = [(1, 10), (2, 15), (3, 25), (4, 30), (5, 20)];

/// Derive a company profile from the registered website domain. Known
/// domains get curated content; anything else gets a generic template built
/// from the company name.
pub fn company_profile(website_url: Option<&str>, company_name: Option<&str>) -> CompanyProfile {
    let domain = domain_of(website_url.unwrap_or("example.com"));
    let label = domain.split('.').next().unwrap_or(&domain).to_lowercase();

    match label.as_str() {
        "uber" => curated(
            "Uber",
            &domain,
            "ride-sharing",
            &[
                "Great ride experience! Driver was professional and arrived on time.",
                "Convenient and reliable service. The app is easy to use.",
                "Excellent customer service when I had an issue with my ride.",
                "Fast pickup and clean vehicle. Highly recommend!",
                "The driver was very friendly and the ride was smooth.",
            ],
            &[
                "Driver was late and the car was dirty.",
                "App crashed during booking and I was charged twice.",
                "Customer service was unhelpful with my complaint.",
                "Long wait times during peak hours.",
                "Driver took a longer route and charged more.",
            ],
            &[
                "Driver Experience",
                "App Performance",
                "Pricing",
                "Customer Service",
                "Ride Quality",
            ],
        ),
        "netflix" => curated(
            "Netflix",
            &domain,
            "streaming",
            &[
                "Amazing content library! The recommendations are spot on.",
                "Great streaming quality and easy to use interface.",
                "Love the original content and binge-worthy shows.",
                "Excellent value for money with so much content.",
                "The app works perfectly on all my devices.",
            ],
            &[
                "Content keeps disappearing and new shows are limited.",
                "App crashes frequently on my smart TV.",
                "Customer service is hard to reach when needed.",
                "Price keeps increasing but content quality is declining.",
                "Streaming quality drops during peak hours.",
            ],
            &[
                "Content Quality",
                "Streaming Performance",
                "Pricing",
                "User Interface",
                "Customer Service",
            ],
        ),
        "amazon" => curated(
            "Amazon",
            &domain,
            "e-commerce",
            &[
                "Fast delivery and great product selection!",
                "Prime membership is totally worth it for the benefits.",
                "Easy returns process and excellent customer service.",
                "The app is user-friendly and secure for shopping.",
                "Great prices and reliable delivery service.",
            ],
            &[
                "Delivery was delayed and customer service was unhelpful.",
                "Product quality doesn't match the description.",
                "Returns process is complicated and takes too long.",
                "App is slow and crashes frequently.",
                "Prices keep changing and it's hard to track.",
            ],
            &[
                "Delivery Service",
                "Product Quality",
                "Customer Service",
                "App Performance",
                "Pricing",
            ],
        ),
        "spotify" => curated(
            "Spotify",
            &domain,
            "music streaming",
            &[
                "Amazing music discovery features and great playlists!",
                "Sound quality is excellent and the app is intuitive.",
                "Love the personalized recommendations and daily mixes.",
                "Great value for money with such a vast library.",
                "Works perfectly across all my devices.",
            ],
            &[
                "App crashes frequently and loses my playlists.",
                "Sound quality drops when using mobile data.",
                "Customer service is slow to respond to issues.",
                "Premium features are expensive for what you get.",
                "Interface is cluttered and hard to navigate.",
            ],
            &[
                "Music Quality",
                "App Performance",
                "User Interface",
                "Pricing",
                "Customer Service",
            ],
        ),
        _ => generic(&domain, company_name),
    }
}

fn curated(
    name: &str,
    domain: &str,
    vertical: &str,
    positive: &[&str],
    negative: &[&str],
    categories: &[&str],
) -> CompanyProfile {
    CompanyProfile {
        name: name.to_string(),
        domain: domain.to_string(),
        vertical: vertical.to_string(),
        positive: positive.iter().map(|s| s.to_string()).collect(),
        negative: negative.iter().map(|s| s.to_string()).collect(),
        categories: categories.iter().map(|s| s.to_string()).collect(),
    }
}

fn generic(domain: &str, company_name: Option<&str>) -> CompanyProfile {
    let name = company_name
        .map(|s| s.to_string())
        .unwrap_or_else(|| title_case(domain.split('.').next().unwrap_or("Example")));

    CompanyProfile {
        name: name.clone(),
        domain: domain.to_string(),
        vertical: "service".to_string(),
        positive: vec![
            format!("Great experience with {name}! The service was excellent."),
            format!("Very satisfied with {name}. Highly recommend!"),
            format!("Professional service and great customer support from {name}."),
            format!("Excellent quality and fast delivery from {name}."),
            format!("Love using {name}. The platform is user-friendly."),
        ],
        negative: vec![
            format!("Disappointed with {name}. Service was poor."),
            format!("Had issues with {name} and customer service was unhelpful."),
            format!("Not satisfied with the quality from {name}."),
            format!("App/website crashes frequently with {name}."),
            format!("Pricing is too high for what {name} offers."),
        ],
        categories: vec![
            "Service Quality".to_string(),
            "Customer Service".to_string(),
            "Performance".to_string(),
            "Pricing".to_string(),
            "User Experience".to_string(),
        ],
    }
}

/// Strip scheme, path, and a leading `www.` from a registered URL.
fn domain_of(url: &str) -> String {
    let without_scheme = url
        .trim()
        .strip_prefix("https://")
        .or_else(|| url.trim().strip_prefix("http://"))
        .unwrap_or(url.trim());
    let host = without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme);
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        "example.com".to_string()
    } else {
        host.to_lowercase()
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn weighted_rating<R: Rng>(rng: &mut R) -> i64 {
    let total: u32 = RATING_WEIGHTS.iter().map(|(_, w)| w).sum();
    let mut draw = rng.random_range(0..total);
    for (rating, weight) in RATING_WEIGHTS {
        if draw < weight {
            return rating;
        }
        draw -= weight;
    }
    5
}

/// Generate `count` synthetic reviews for one source. Each record carries a
/// rating-consistent sentiment and a category from the profile's taxonomy,
/// backdated by a uniform 0-180 days.
pub fn generate_reviews(profile: &CompanyProfile, source: &Source, count: usize) -> Vec<NewReview> {
    let mut rng = rand::rng();
    let titles = [
        format!("Great experience with {}", profile.name),
        "Could be better".to_string(),
        "Highly recommend".to_string(),
        "Disappointed".to_string(),
        "Excellent service".to_string(),
        "Needs improvement".to_string(),
        "Love it!".to_string(),
        "Mixed feelings".to_string(),
        format!("Best {} service", profile.vertical),
        "Not worth it".to_string(),
    ];

    (0..count)
        .map(|i| {
            let rating = weighted_rating(&mut rng);
            let sentiment = Sentiment::from_rating(rating);
            let body = match sentiment {
                Sentiment::Positive => profile
                    .positive
                    .choose(&mut rng)
                    .cloned()
                    .unwrap_or_default(),
                Sentiment::Negative => profile
                    .negative
                    .choose(&mut rng)
                    .cloned()
                    .unwrap_or_default(),
                Sentiment::Neutral => format!(
                    "Mixed experience with {}. Some good aspects but room for improvement.",
                    profile.name
                ),
            };
            let days_back = rng.random_range(0..=180);

            NewReview {
                review_id: format!("{}_sample_{}", source.as_str(), i),
                source: source.clone(),
                date: Utc::now() - Duration::days(days_back),
                rating,
                body,
                title: titles.choose(&mut rng).cloned(),
                username: USERNAMES
                    .choose(&mut rng)
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
                url: format!(
                    "https://{}/{}/review/{}",
                    profile.domain,
                    source.as_str(),
                    i
                ),
                language: "en".to_string(),
                sentiment: Some(sentiment),
                category: profile.categories.choose(&mut rng).cloned(),
            }
        })
        .collect()
}
