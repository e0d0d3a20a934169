//! HTTP client that settles x402 `402 Payment Required` challenges
//!
//! A request is sent once unpaid. On a 402 the client selects one of the
//! offered requirements, signs it, and retries exactly once with the
//! `X-PAYMENT` header.

use crate::error::{Error, Result};
use crate::x402::selector::RequirementSelector;
use crate::x402::signer::EvmSigner;
use crate::x402::types::{PaymentRequiredResponse, SettleResponse, X_PAYMENT, X_PAYMENT_RESPONSE};
use reqwest::StatusCode;
use serde::Serialize;

/// Response of a (possibly paid) request
#[derive(Debug)]
pub struct PaidResponse {
    pub status: StatusCode,
    pub body: String,
    /// Settlement details, when the server returned them
    pub settlement: Option<SettleResponse>,
}

impl PaidResponse {
    /// Transaction hash of the settled payment
    pub fn transaction(&self) -> Option<&str> {
        self.settlement
            .as_ref()
            .map(|s| s.transaction.as_str())
            .filter(|t| !t.is_empty())
    }
}

/// reqwest client with x402 payment handling
pub struct X402Client {
    http: reqwest::Client,
    signer: Option<EvmSigner>,
    selector: RequirementSelector,
}

impl X402Client {
    pub fn new(
        http: reqwest::Client,
        signer: Option<EvmSigner>,
        selector: RequirementSelector,
    ) -> Self {
        Self {
            http,
            signer,
            selector,
        }
    }

    /// POST `body` as JSON, paying if the server asks for it
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<PaidResponse> {
        let response = self.http.post(url).json(body).send().await?;

        if response.status() != StatusCode::PAYMENT_REQUIRED {
            return Self::finish(response, false).await;
        }

        let challenge: PaymentRequiredResponse =
            response.json().await.map_err(|e| Error::PaymentRequired {
                reason: format!("unreadable payment requirements: {}", e),
            })?;
        tracing::debug!(
            offers = challenge.accepts.len(),
            error = %challenge.error,
            "service requested payment"
        );

        let signer = self.signer.as_ref().ok_or_else(|| Error::PaymentRequired {
            reason: "service requires payment but no payment proof was supplied".to_string(),
        })?;

        let requirements = self.selector.select(&challenge.accepts)?;
        tracing::info!(
            payer = %signer.address(),
            network = %requirements.network,
            amount = %requirements.max_amount_required,
            pay_to = %requirements.pay_to,
            "signing x402 payment"
        );

        let payment = signer.authorize(
            requirements,
            challenge.x402_version,
            chrono::Utc::now().timestamp(),
        )?;

        let retry = self
            .http
            .post(url)
            .header(X_PAYMENT, payment.to_header()?)
            .header("Access-Control-Expose-Headers", X_PAYMENT_RESPONSE)
            .json(body)
            .send()
            .await?;

        if retry.status() == StatusCode::PAYMENT_REQUIRED {
            let reason = retry
                .json::<PaymentRequiredResponse>()
                .await
                .ok()
                .map(|c| c.error)
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "payment was not accepted".to_string());
            return Err(Error::PaymentRequired { reason });
        }

        Self::finish(retry, true).await
    }

    async fn finish(response: reqwest::Response, paid: bool) -> Result<PaidResponse> {
        let status = response.status();

        let settlement = match response.headers().get(X_PAYMENT_RESPONSE) {
            Some(value) => match value.to_str().map_err(|e| e.to_string()).and_then(|v| {
                SettleResponse::from_header(v).map_err(|e| e.to_string())
            }) {
                Ok(settle) => {
                    tracing::info!(
                        transaction = %settle.transaction,
                        network = %settle.network,
                        "payment settled"
                    );
                    Some(settle)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "undecodable payment response header");
                    None
                }
            },
            None => {
                if paid {
                    tracing::warn!("No payment response header found");
                }
                None
            }
        };

        let body = response.text().await?;
        tracing::debug!(status = %status, bytes = body.len(), "service response");

        Ok(PaidResponse {
            status,
            body,
            settlement,
        })
    }
}
