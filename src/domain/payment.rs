use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a payment, shared by donations, member applications and
/// member payment sessions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    #[serde(alias = "cancel")]
    Cancelled,
    PendingVerification,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::PendingVerification => "pending_verification",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Completed => "Completed",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Cancelled => "Cancelled",
            PaymentStatus::PendingVerification => "Pending Verification",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Cancelled
        )
    }

    /// Gateway callbacks may only move a payment out of `pending`.
    pub fn accepts_callback(&self) -> bool {
        matches!(self, PaymentStatus::Pending)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "cancelled" | "cancel" => Ok(PaymentStatus::Cancelled),
            "pending_verification" => Ok(PaymentStatus::PendingVerification),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

/// The three asynchronous notifications the gateway posts back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Success,
    Fail,
    Cancel,
}

impl CallbackOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackOutcome::Success => "success",
            CallbackOutcome::Fail => "fail",
            CallbackOutcome::Cancel => "cancel",
        }
    }
}

/// Which kind of payment a transaction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentFlow {
    Donation,
    Member,
}

impl PaymentFlow {
    /// Status a callback outcome drives a pending payment to. Donations fold
    /// cancellation into `failed`; member payments keep it distinct.
    pub fn target_status(&self, outcome: CallbackOutcome) -> PaymentStatus {
        match (self, outcome) {
            (_, CallbackOutcome::Success) => PaymentStatus::Completed,
            (_, CallbackOutcome::Fail) => PaymentStatus::Failed,
            (PaymentFlow::Donation, CallbackOutcome::Cancel) => PaymentStatus::Failed,
            (PaymentFlow::Member, CallbackOutcome::Cancel) => PaymentStatus::Cancelled,
        }
    }

    pub fn route_segment(&self) -> &'static str {
        match self {
            PaymentFlow::Donation => "donations",
            PaymentFlow::Member => "members",
        }
    }

    fn transaction_prefix(&self) -> &'static str {
        match self {
            PaymentFlow::Donation => "DON",
            PaymentFlow::Member => "MEM",
        }
    }

    pub fn generate_transaction_id(&self) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}-{}",
            self.transaction_prefix(),
            Utc::now().timestamp_millis(),
            &suffix[..12]
        )
    }
}

/// Result of checking a callback against the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Apply { from: PaymentStatus, to: PaymentStatus },
    /// Same terminal status delivered again; acknowledge without side effects.
    Duplicate(PaymentStatus),
    Reject { current: PaymentStatus, attempted: PaymentStatus },
}

pub fn plan_callback_transition(current: PaymentStatus, target: PaymentStatus) -> Transition {
    if current.accepts_callback() {
        Transition::Apply { from: current, to: target }
    } else if current == target {
        Transition::Duplicate(current)
    } else {
        Transition::Reject { current, attempted: target }
    }
}

/// Minor units per major unit (poisha per taka).
pub const MINOR_PER_MAJOR: i64 = 100;

/// `None` unless the amount is worth at least one minor unit.
pub fn to_minor_units(amount: f64) -> Option<i64> {
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }
    let minor = (amount * MINOR_PER_MAJOR as f64).round() as i64;
    (minor >= 1).then_some(minor)
}

pub fn to_major_units(amount_minor: i64) -> f64 {
    amount_minor as f64 / MINOR_PER_MAJOR as f64
}

/// Renders minor units as the decimal string the gateway expects, e.g. `500.00`.
pub fn format_major(amount_minor: i64) -> String {
    format!(
        "{}.{:02}",
        amount_minor / MINOR_PER_MAJOR,
        (amount_minor % MINOR_PER_MAJOR).abs()
    )
}

/// Parses a decimal amount string such as `"500"`, `"500.5"` or `"500.00"`.
pub fn parse_major(amount: &str) -> Option<i64> {
    let amount = amount.trim();
    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (amount, ""),
    };
    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole: i64 = whole.parse().ok()?;
    let mut cents = 0i64;
    for (i, c) in fraction.chars().take(2).enumerate() {
        let digit = c.to_digit(10)? as i64;
        cents += if i == 0 { digit * 10 } else { digit };
    }
    whole.checked_mul(MINOR_PER_MAJOR)?.checked_add(cents)
}
