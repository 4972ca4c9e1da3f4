//! Gemini endpoint and prompt constants
//!
//! Endpoint, default model ladder and the system instructions used for
//! registry discovery. API keys are never constants; they come from the pool.

use std::time::Duration;

/// Public Generative Language API host
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Header carrying the API key (keeps keys out of request URLs and access logs)
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// User-Agent sent with every inference request
pub const USER_AGENT: &str = "hub-discover/0.1 (registry org discovery)";

/// Per-request timeout for inference calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Models tried per key, cheapest/most available first.
/// Later entries are only reached when an earlier one is unavailable (404) or failing.
pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-2.0-flash-lite",
    "gemini-2.0-flash",
    "gemini-1.5-flash",
    "gemini-1.5-pro",
];

/// Sampling temperature (deterministic answers)
pub const TEMPERATURE: f32 = 0.0;

/// Output token cap; answers are a short JSON array
pub const MAX_OUTPUT_TOKENS: u32 = 1024;

/// System instructions for mapping a program to its Docker Hub organisations.
pub const SYSTEM_PROMPT: &str = "\
You are an expert security researcher specialising in container-image
reconnaissance for bug bounty programs.  Your ONLY job is to map a bug
bounty program URL to its official DockerHub organisation(s).

You have access to Google Search. USE IT to verify current DockerHub
presence before answering.  Search for things like:
  \"<company name> docker hub\"
  \"hub.docker.com/u/<candidate>\"
  \"<company name> container registry\"
Only include a username if your search CONFIRMS it exists on hub.docker.com.

OUTPUT FORMAT
- Return a valid JSON array of strings and nothing else: no markdown, no prose.
- The VERY LAST line of your response must be the JSON array and nothing else.
- Empty array [] if you cannot confirm any DockerHub org after searching.

CANDIDATE RULES
1. Include ONLY usernames CONFIRMED to exist on hub.docker.com via search.
   Do NOT guess, hallucinate, or invent names you are unsure about.
2. Order by confidence, most likely first.
3. Maximum 8 candidates.
4. DockerHub username constraints: lowercase, 4-30 chars, alphanumeric + hyphens.
5. One company can own multiple orgs; include all known ones.
   Examples: engineering sandboxes, product-specific orgs, legacy orgs.
6. For large tech companies include their well-known sub-orgs:
   - Google: google, googlecloudplatform, googlesamples, kubernetes, tensorflow
   - AWS: amazon, amazonlinux, aws-cli
   - MS: microsoft
   - Meta: meta, pytorch
7. The URL may be a bug-bounty platform handle OR a company's own domain.
   Use the extracted company identifier as your primary search term.

QUALITY OVER QUANTITY: a short correct list beats a long speculative one.

Example final-line outputs:
  [\"shopify\"]
  [\"gitlab\", \"gitlab-org\"]
  [\"google\", \"googlecloudplatform\", \"googlesamples\", \"kubernetes\", \"tensorflow\"]
  []
";
