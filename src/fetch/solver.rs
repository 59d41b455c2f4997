//! FlareSolverr client: delegates challenge-gated fetches to a sidecar that
//! runs a real browser and returns the rendered document.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::FetchError;

// The solver needs time to spin up a browser and wait out the challenge.
const SOLVER_TIMEOUT: Duration = Duration::from_secs(70);
const SOLVE_MAX_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Serialize)]
struct SolveRequest<'a> {
    cmd: &'static str,
    url: &'a str,
    #[serde(rename = "maxTimeout")]
    max_timeout: u64,
}

#[derive(Debug, Deserialize)]
struct SolveResponse {
    status: String,
    #[serde(default)]
    message: String,
    solution: Option<Solution>,
}

#[derive(Debug, Deserialize)]
struct Solution {
    status: u16,
    response: String,
}

pub struct SolverClient {
    client: Client,
    endpoint: String,
}

impl SolverClient {
    pub fn new(endpoint: &str) -> Self {
        let client = Client::builder()
            .timeout(SOLVER_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch `url` through the solver and return the rendered HTML body.
    pub async fn get_content(&self, url: &str) -> Result<String, FetchError> {
        let request = SolveRequest {
            cmd: "request.get",
            url,
            max_timeout: SOLVE_MAX_TIMEOUT_MS,
        };

        let response = self
            .client
            .post(format!("{}/v1", self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Solver {
                url: url.to_string(),
                message: format!("solver endpoint returned HTTP {status}"),
            });
        }

        let solved: SolveResponse =
            response
                .json()
                .await
                .map_err(|source| FetchError::Network {
                    url: url.to_string(),
                    source,
                })?;

        if solved.status != "ok" {
            return Err(FetchError::Solver {
                url: url.to_string(),
                message: solved.message,
            });
        }

        let solution = solved.solution.ok_or_else(|| FetchError::Solver {
            url: url.to_string(),
            message: "solver response carried no solution".to_string(),
        })?;

        let upstream = reqwest::StatusCode::from_u16(solution.status).unwrap_or_default();
        if !upstream.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: upstream,
            });
        }

        Ok(solution.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_trailing_slash_is_normalized() {
        let solver = SolverClient::new("http://localhost:8191/");
        assert_eq!(solver.endpoint, "http://localhost:8191");
    }

    #[test]
    fn solve_response_parses() {
        let raw = r#"{
            "status": "ok",
            "message": "",
            "solution": {"status": 200, "response": "<html></html>", "url": "https://x"}
        }"#;
        let parsed: SolveResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.status, "ok");
        assert_eq!(parsed.solution.unwrap().status, 200);
    }
}
