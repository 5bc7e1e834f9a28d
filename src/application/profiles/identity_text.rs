//! Text tools of the identity profile.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::domain::tools::{StructuredOutcome, ValidatedCall};
use crate::ports::{
    ExecutionContext, HandlerError, ToolHandler, VerificationError, VerificationService,
};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-z0-9.\-+_]+@[a-z0-9.\-+_]+\.[a-z]+").expect("email pattern is valid")
});

static OTP_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9]{6}\b").expect("otp pattern is valid"));

fn value_of(call: &ValidatedCall) -> Result<&str, HandlerError> {
    call.str_arg("value")
        .ok_or_else(|| HandlerError::InvalidArgument("value".to_string()))
}

/// Saves the client's email on the case and sends the first code.
pub struct CheckEmail {
    service: Arc<dyn VerificationService>,
}

impl CheckEmail {
    pub fn new(service: Arc<dyn VerificationService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for CheckEmail {
    async fn invoke(
        &self,
        call: &ValidatedCall,
        context: &ExecutionContext,
    ) -> Result<StructuredOutcome, HandlerError> {
        let value = value_of(call)?.to_lowercase();
        let Some(email) = EMAIL.find(&value).map(|m| m.as_str().to_string()) else {
            return Ok(StructuredOutcome::failure(
                "That does not look like an email address. Please check it and send it again.",
            ));
        };
        let report = context.require_report_id()?;

        match self.service.save_email(report, &email).await {
            Ok(()) => {}
            Err(VerificationError::Rejected(reason)) => {
                tracing::info!(report_id = %report, reason = %reason, "Email rejected");
                return Ok(StructuredOutcome::failure(
                    "We could not register that email. Please send a different one.",
                ));
            }
            Err(err) => return Err(err.into()),
        }
        self.service.send_otp(report).await?;

        Ok(StructuredOutcome::completed(format!(
            "Thanks! We sent a verification code to {}.",
            email
        ))
        .with_data(json!({ "email": email })))
    }
}

/// Checks the one-time code the client received by email.
pub struct CheckOtp {
    service: Arc<dyn VerificationService>,
}

impl CheckOtp {
    pub fn new(service: Arc<dyn VerificationService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for CheckOtp {
    async fn invoke(
        &self,
        call: &ValidatedCall,
        context: &ExecutionContext,
    ) -> Result<StructuredOutcome, HandlerError> {
        let value = value_of(call)?;
        let Some(code) = OTP_CODE.find(value).map(|m| m.as_str()) else {
            return Ok(StructuredOutcome::failure("The code must have 6 digits."));
        };
        let report = context.require_report_id()?;

        if self.service.verify_otp(report, code).await? {
            Ok(StructuredOutcome::completed("Your code was verified."))
        } else {
            Ok(StructuredOutcome::failure(
                "The code is not correct. Check your email and try again, or ask me to resend it.",
            ))
        }
    }
}

/// Sends a new one-time code. Never completes the step.
pub struct ResendOtp {
    service: Arc<dyn VerificationService>,
}

impl ResendOtp {
    pub fn new(service: Arc<dyn VerificationService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for ResendOtp {
    async fn invoke(
        &self,
        _call: &ValidatedCall,
        context: &ExecutionContext,
    ) -> Result<StructuredOutcome, HandlerError> {
        let report = context.require_report_id()?;
        self.service.send_otp(report).await?;
        Ok(StructuredOutcome::success(
            "We sent you a new code. Please type it here.",
        ))
    }
}

/// Checks the requested amount against the configured maximum.
pub struct CheckAmount {
    max_amount: f64,
}

impl CheckAmount {
    pub fn new(max_amount: f64) -> Self {
        Self { max_amount }
    }
}

#[async_trait]
impl ToolHandler for CheckAmount {
    async fn invoke(
        &self,
        call: &ValidatedCall,
        _context: &ExecutionContext,
    ) -> Result<StructuredOutcome, HandlerError> {
        let cleaned: String = value_of(call)?
            .chars()
            .filter(|c| !matches!(c, '$' | ',' | ' '))
            .collect();

        let Some(amount) = cleaned.parse::<f64>().ok().filter(|a| a.is_finite() && *a > 0.0) else {
            return Ok(StructuredOutcome::failure("Please send the amount as a number."));
        };

        if amount > self.max_amount {
            return Ok(StructuredOutcome::failure(format!(
                "The maximum amount you can request is {}.",
                self.max_amount
            )));
        }

        Ok(StructuredOutcome::completed("Amount registered.").with_data(json!({ "amount": amount })))
    }
}

/// Accepts any name containing letters.
pub struct CheckName;

#[async_trait]
impl ToolHandler for CheckName {
    async fn invoke(
        &self,
        call: &ValidatedCall,
        _context: &ExecutionContext,
    ) -> Result<StructuredOutcome, HandlerError> {
        let name = value_of(call)?.trim();
        if name.chars().any(char::is_alphabetic) {
            Ok(StructuredOutcome::completed(format!("Thanks, {}.", name)))
        } else {
            Ok(StructuredOutcome::failure("Please send your full name."))
        }
    }
}

/// Accepts exactly eight digits.
pub struct CheckNumber;

#[async_trait]
impl ToolHandler for CheckNumber {
    async fn invoke(
        &self,
        call: &ValidatedCall,
        _context: &ExecutionContext,
    ) -> Result<StructuredOutcome, HandlerError> {
        let digits: String = value_of(call)?.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.len() == 8 && digits.chars().all(|c| c.is_ascii_digit()) {
            Ok(StructuredOutcome::completed("Number registered."))
        } else {
            Ok(StructuredOutcome::failure("The number must have 8 digits."))
        }
    }
}
