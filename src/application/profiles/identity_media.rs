//! Media validators of the identity profile.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::domain::journey::{MediaRef, StepDescriptor};
use crate::domain::tools::StructuredOutcome;
use crate::ports::{
    ExecutionContext, FetchedMedia, HandlerError, MediaFetcher, MediaHandler, MediaVerdict,
    VerificationService,
};

/// Downloads `media` and checks its content type against the step.
///
/// The content type reported by the channel wins over the one the host
/// returns.
async fn fetch_accepted(
    fetcher: &dyn MediaFetcher,
    step: &StepDescriptor,
    media: &MediaRef,
) -> Result<Option<FetchedMedia>, HandlerError> {
    let mut fetched = fetcher.fetch(&media.url).await?;
    if let Some(reported) = &media.content_type {
        fetched.content_type = reported.clone();
    }
    if step.accepts(&fetched.content_type) {
        Ok(Some(fetched))
    } else {
        tracing::info!(
            step = %step.function_id,
            content_type = %fetched.content_type,
            "Media type not accepted"
        );
        Ok(None)
    }
}

fn unsupported_type(step: &StepDescriptor) -> MediaVerdict {
    MediaVerdict::rejected(format!(
        "That file type is not supported. Please send {} as {}.",
        step.prompt_value,
        step.accepted_media_types.join(" or ")
    ))
}

/// Proof of address.
pub struct CheckAddress {
    service: Arc<dyn VerificationService>,
    fetcher: Arc<dyn MediaFetcher>,
}

impl CheckAddress {
    pub fn new(service: Arc<dyn VerificationService>, fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self { service, fetcher }
    }
}

#[async_trait]
impl MediaHandler for CheckAddress {
    async fn handle(
        &self,
        step: &StepDescriptor,
        context: &ExecutionContext,
    ) -> Result<MediaVerdict, HandlerError> {
        let Some(first) = step.images.first() else {
            return Ok(MediaVerdict::incomplete("Please send your proof of address."));
        };
        let report = context.require_report_id()?;
        let Some(document) = fetch_accepted(self.fetcher.as_ref(), step, first).await? else {
            return Ok(unsupported_type(step));
        };

        match self
            .service
            .extract_address(report, &document.bytes, &document.content_type)
            .await?
        {
            Some(extracted) => Ok(MediaVerdict::accepted(
                StructuredOutcome::success(format!(
                    "We registered your address: {}.",
                    extracted.address
                ))
                .with_data(json!({
                    "address": extracted.address,
                    "postal_code": extracted.postal_code,
                    "township": extracted.township,
                })),
            )),
            None => Ok(MediaVerdict::rejected(
                "We could not read an address on that document. Please send a clearer, recent \
proof of address.",
            )),
        }
    }
}

/// Selfie quality and liveness.
pub struct CheckFace {
    service: Arc<dyn VerificationService>,
    fetcher: Arc<dyn MediaFetcher>,
    quality_threshold: f64,
}

impl CheckFace {
    pub fn new(
        service: Arc<dyn VerificationService>,
        fetcher: Arc<dyn MediaFetcher>,
        quality_threshold: f64,
    ) -> Self {
        Self {
            service,
            fetcher,
            quality_threshold,
        }
    }
}

#[async_trait]
impl MediaHandler for CheckFace {
    async fn handle(
        &self,
        step: &StepDescriptor,
        context: &ExecutionContext,
    ) -> Result<MediaVerdict, HandlerError> {
        let Some(first) = step.images.first() else {
            return Ok(MediaVerdict::incomplete("Please send a selfie."));
        };
        let report = context.require_report_id()?;
        let Some(selfie) = fetch_accepted(self.fetcher.as_ref(), step, first).await? else {
            return Ok(unsupported_type(step));
        };

        let quality = self.service.face_quality(report, &selfie.bytes).await?;
        if !quality.detected {
            return Ok(MediaVerdict::rejected(
                "We could not find a face in the photo. Please take a selfie facing the camera.",
            ));
        }
        if quality.score <= self.quality_threshold {
            tracing::info!(report_id = %report, score = quality.score, "Selfie below quality threshold");
            return Ok(MediaVerdict::rejected(
                "The photo is not clear enough. Please take another selfie in good light.",
            ));
        }

        let liveness = self.service.face_liveness(report, &selfie.bytes).await?;
        if liveness.is_live {
            Ok(MediaVerdict::accepted(
                StructuredOutcome::success("Your selfie was validated.")
                    .with_data(json!({ "quality": quality.score, "liveness": liveness.score })),
            ))
        } else {
            Ok(MediaVerdict::rejected(
                "We could not confirm the photo was taken live. Please take a new selfie, not a \
photo of a photo.",
            ))
        }
    }
}

/// ID card, front and back.
pub struct CheckIdCard {
    service: Arc<dyn VerificationService>,
    fetcher: Arc<dyn MediaFetcher>,
}

impl CheckIdCard {
    pub fn new(service: Arc<dyn VerificationService>, fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self { service, fetcher }
    }
}

#[async_trait]
impl MediaHandler for CheckIdCard {
    async fn handle(
        &self,
        step: &StepDescriptor,
        context: &ExecutionContext,
    ) -> Result<MediaVerdict, HandlerError> {
        let (front, back) = match step.images.as_slice() {
            [] => return Ok(MediaVerdict::incomplete("Please send a photo of the front of your ID.")),
            [_] => return Ok(MediaVerdict::incomplete("Thanks. Now send a photo of the back of your ID.")),
            [front, back, ..] => (front, back),
        };
        let report = context.require_report_id()?;

        let Some(front) = fetch_accepted(self.fetcher.as_ref(), step, front).await? else {
            return Ok(unsupported_type(step));
        };
        let Some(back) = fetch_accepted(self.fetcher.as_ref(), step, back).await? else {
            return Ok(unsupported_type(step));
        };

        match self.service.extract_id(report, &front.bytes, &back.bytes).await? {
            Some(extracted) => Ok(MediaVerdict::accepted(
                StructuredOutcome::success(format!(
                    "Thanks {}, your ID was registered.",
                    extracted.full_name
                ))
                .with_data(json!({
                    "full_name": extracted.full_name,
                    "document_number": extracted.document_number,
                    "personal_number": extracted.personal_number,
                })),
            )),
            None => Ok(MediaVerdict::rejected(
                "We could not read your ID. Please send clear photos of the front and then the back.",
            )),
        }
    }
}
