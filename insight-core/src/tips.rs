pub const ANALYSIS_TIPS: [&str; 10] = [
    "Did you know 38% of 1-star reviews mention pricing frustration?",
    "The top reason users abandon an app is poor onboarding experience.",
    "Apps that respond to negative reviews see a 0.7 star rating improvement on average.",
    "Feature requests in reviews indicate your most engaged users.",
    "80% of users read at least one review before downloading an app.",
    "The ideal app description length is between 250-300 words for maximum conversion.",
    "Apps with weekly updates have 30% higher user retention rates.",
    "UI/UX issues account for approximately 25% of all app complaints.",
    "Users are 8x more likely to download apps with 5-star ratings.",
    "On average, users decide whether to keep an app within the first 3 days.",
];

/// Cycles through [`ANALYSIS_TIPS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TipRotation {
    index: usize,
}

impl TipRotation {
    pub fn current(&self) -> &'static str {
        ANALYSIS_TIPS[self.index]
    }

    pub fn advance(&mut self) -> &'static str {
        self.index = (self.index + 1) % ANALYSIS_TIPS.len();
        self.current()
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }
}
