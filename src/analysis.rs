// 🤖 AI Analysis - occupancy/revenue report from a text-generation service
//
// Request: aggregate counts only (total slots, occupied, revenue, transactions).
// Reply:   efficiency score, peak-time prediction, pricing suggestion, recommendations.
//
// Any failure (no key, network, HTTP status, bad JSON) is swallowed by
// `analyze_or_fallback` and replaced with a fixed fallback report.
// No retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AnalysisError;
use crate::lot::ParkingLot;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

// ============================================================================
// REQUEST / RESULT
// ============================================================================

/// Aggregates sent to the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub total_slots: usize,
    pub occupied: usize,
    pub revenue: u64,
    pub transaction_count: usize,
}

impl AnalysisRequest {
    /// Snapshot the lot's current aggregates
    pub fn from_lot(lot: &ParkingLot) -> Self {
        let stats = lot.stats();
        AnalysisRequest {
            total_slots: stats.total_slots,
            occupied: stats.occupied,
            revenue: stats.revenue,
            transaction_count: lot.transactions().len(),
        }
    }

    fn prompt(&self) -> String {
        format!(
            "You are an intelligent parking-lot analysis system. Analyze the following data and return a JSON report.\n\
             \n\
             Current state:\n\
             - Total slots: {}\n\
             - Currently occupied: {}\n\
             - Revenue today: {} SDG\n\
             - Recorded transactions: {}\n\
             \n\
             Required:\n\
             1. Efficiency score (0 to 100).\n\
             2. Peak time prediction based on a typical pattern for this time of day.\n\
             3. Pricing suggestion (raise / lower / keep).\n\
             4. Three short recommendations to improve management.",
            self.total_slots, self.occupied, self.revenue, self.transaction_count
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub efficiency_score: f64,
    pub peak_time_prediction: String,
    pub pricing_suggestion: String,
    pub recommendations: Vec<String>,
}

impl AnalysisResult {
    /// Report shown when the service cannot be reached
    pub fn fallback() -> Self {
        AnalysisResult {
            efficiency_score: 75.0,
            peak_time_prediction: "Not available right now".to_string(),
            pricing_suggestion: "Keep the current price".to_string(),
            recommendations: vec![
                "Check the internet connection".to_string(),
                "Check the cameras".to_string(),
                "Refresh the data".to_string(),
            ],
        }
    }
}

// ============================================================================
// ANALYST
// ============================================================================

/// Anything that can turn lot aggregates into an analysis
#[async_trait]
pub trait Analyst: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError>;
}

/// Run the analyst; on any error log it and return the fallback
pub async fn analyze_or_fallback(analyst: &dyn Analyst, request: &AnalysisRequest) -> AnalysisResult {
    match analyst.analyze(request).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "analysis failed, using fallback");
            AnalysisResult::fallback()
        }
    }
}

// ============================================================================
// GEMINI
// ============================================================================

/// Google Gemini `generateContent` over REST
pub struct GeminiAnalyst {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiAnalyst {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_GEMINI_BASE_URL)
    }

    pub fn with_base_url(
        api_key: Option<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        GeminiAnalyst {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn request_body(request: &AnalysisRequest) -> serde_json::Value {
        json!({
            "contents": [
                { "parts": [ { "text": request.prompt() } ] }
            ],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "efficiencyScore": { "type": "NUMBER" },
                        "peakTimePrediction": { "type": "STRING" },
                        "pricingSuggestion": { "type": "STRING" },
                        "recommendations": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" }
                        }
                    }
                }
            }
        })
    }
}

/// Pull the generated JSON text out of a generateContent reply and parse it
pub fn parse_gemini_reply(reply: &serde_json::Value) -> Result<AnalysisResult, AnalysisError> {
    let text = reply["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or(AnalysisError::EmptyReply)?;
    Ok(serde_json::from_str(text)?)
}

#[async_trait]
impl Analyst for GeminiAnalyst {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let api_key = self.api_key.as_deref().ok_or(AnalysisError::MissingApiKey)?;

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&Self::request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Status(status.as_u16()));
        }

        let reply: serde_json::Value = response.json().await?;
        let result = parse_gemini_reply(&reply)?;

        tracing::info!(score = result.efficiency_score, model = %self.model, "analysis received");
        Ok(result)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::SlotRegistry;

    struct FixedAnalyst(AnalysisResult);

    #[async_trait]
    impl Analyst for FixedAnalyst {
        async fn analyze(&self, _: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
            Ok(self.0.clone())
        }
    }

    fn sample_request() -> AnalysisRequest {
        AnalysisRequest {
            total_slots: 24,
            occupied: 7,
            revenue: 1250,
            transaction_count: 9,
        }
    }

    #[test]
    fn test_request_from_lot() {
        let mut lot = ParkingLot::new(SlotRegistry::with_capacity(4), 10);
        lot.enter("P-1").unwrap();
        lot.enter("P-2").unwrap();

        let request = AnalysisRequest::from_lot(&lot);
        assert_eq!(request.total_slots, 4);
        assert_eq!(request.occupied, 2);
        assert_eq!(request.revenue, 0);
        assert_eq!(request.transaction_count, 2);
    }

    #[test]
    fn test_parse_gemini_reply() {
        let reply = json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "text": "{\"efficiencyScore\": 82, \"peakTimePrediction\": \"12:00-14:00\", \"pricingSuggestion\": \"Raise\", \"recommendations\": [\"a\", \"b\", \"c\"]}"
                    }]
                }
            }]
        });

        let result = parse_gemini_reply(&reply).unwrap();
        assert_eq!(result.efficiency_score, 82.0);
        assert_eq!(result.peak_time_prediction, "12:00-14:00");
        assert_eq!(result.recommendations.len(), 3);
    }

    #[test]
    fn test_parse_reply_without_text() {
        let reply = json!({ "candidates": [] });
        assert!(matches!(parse_gemini_reply(&reply), Err(AnalysisError::EmptyReply)));

        let garbage = json!({ "candidates": [{ "content": { "parts": [{ "text": "not json" }] } }] });
        assert!(matches!(parse_gemini_reply(&garbage), Err(AnalysisError::Parse(_))));
    }

    #[test]
    fn test_request_body_carries_schema_and_counts() {
        let body = GeminiAnalyst::request_body(&sample_request());

        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(
            body["generationConfig"]["responseSchema"]["properties"]["recommendations"]["type"],
            "ARRAY"
        );
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("Total slots: 24"));
        assert!(prompt.contains("Revenue today: 1250 SDG"));
    }

    #[tokio::test]
    async fn test_missing_key_falls_back() {
        let analyst = GeminiAnalyst::new(None, DEFAULT_GEMINI_MODEL);

        let err = analyst.analyze(&sample_request()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::MissingApiKey));

        let result = analyze_or_fallback(&analyst, &sample_request()).await;
        assert_eq!(result, AnalysisResult::fallback());
    }

    #[tokio::test]
    async fn test_unreachable_service_falls_back() {
        let analyst = GeminiAnalyst::with_base_url(
            Some("test-key".to_string()),
            DEFAULT_GEMINI_MODEL,
            "http://127.0.0.1:9",
        );

        let result = analyze_or_fallback(&analyst, &sample_request()).await;
        assert_eq!(result.efficiency_score, 75.0);
        assert_eq!(result.recommendations.len(), 3);
    }

    #[tokio::test]
    async fn test_successful_analyst_passes_through() {
        let expected = AnalysisResult {
            efficiency_score: 91.0,
            peak_time_prediction: "17:00".to_string(),
            pricing_suggestion: "Raise".to_string(),
            recommendations: vec!["Open floor 2".to_string()],
        };
        let analyst = FixedAnalyst(expected.clone());

        assert_eq!(analyze_or_fallback(&analyst, &sample_request()).await, expected);
    }
}
