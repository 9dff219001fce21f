//! OTP entry, verification and resend state machine.
//!
//! ```text
//!            start            begin_verify           succeed
//!   (idle) ────────► OtpSent ─────────────► Verifying ───────► Verified
//!                      ▲  ▲                    │
//!                      │  │ begin_verify       │ fail
//!               resend │  └──────────────── Failed
//!        (countdown=0) │                       │
//!                      └───────────────────────┘
//! ```
//!
//! "Idle" is simply the absence of an [`OtpFlow`]. The resend countdown is a
//! single deadline that `resend` replaces, and [`OtpInput`] holds the six
//! digit slots with the focus index the entry form should highlight.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::types::Email;

/// Number of digits in a one-time password.
pub const OTP_LENGTH: usize = 6;

/// Seconds the user has to wait before another code may be requested.
pub const RESEND_COOLDOWN_SECS: i64 = 30;

/// Errors from driving an [`OtpFlow`] or building an [`OtpCode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtpError {
    /// A verification request is already outstanding.
    #[error("verification already in progress")]
    VerificationInFlight,
    /// The flow already completed.
    #[error("this code has already been verified")]
    AlreadyVerified,
    /// The countdown has not reached zero.
    #[error("you can request a new code in {remaining}s")]
    ResendTooEarly {
        /// Seconds until resend unlocks.
        remaining: u32,
    },
    /// Not exactly six ASCII digits.
    #[error("enter the {OTP_LENGTH}-digit code")]
    InvalidCode,
}

// =============================================================================
// OtpCode
// =============================================================================

/// A complete six-digit code.
///
/// The backend compares codes numerically, so it serializes as a JSON number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Parse a code.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::InvalidCode`] unless `s` is exactly six ASCII digits.
    pub fn parse(s: &str) -> Result<Self, OtpError> {
        if s.len() == OTP_LENGTH && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_owned()))
        } else {
            Err(OtpError::InvalidCode)
        }
    }

    /// The code as typed.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value sent to the backend.
    #[must_use]
    pub fn as_number(&self) -> u32 {
        self.0
            .bytes()
            .fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
    }
}

impl Serialize for OtpCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.as_number())
    }
}

// =============================================================================
// OtpInput
// =============================================================================

/// The six single-digit entry slots.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OtpInput {
    digits: [Option<char>; OTP_LENGTH],
    focus: usize,
}

impl OtpInput {
    /// Empty slots, focus on the first one.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a change to slot `index`.
    ///
    /// Non-digit input is rejected and leaves everything untouched. The slot
    /// keeps the last typed character, an empty value clears it, and a
    /// non-empty edit advances focus to the next slot. Returns whether the
    /// edit was accepted.
    pub fn edit(&mut self, index: usize, value: &str) -> bool {
        if index >= OTP_LENGTH || !value.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        let Some(slot) = self.digits.get_mut(index) else {
            return false;
        };
        *slot = value.chars().last();
        if !value.is_empty() && index < OTP_LENGTH - 1 {
            self.focus = index + 1;
        }
        true
    }

    /// Handle backspace pressed while slot `index` has focus.
    ///
    /// A filled slot is cleared in place; an empty one moves focus back and
    /// clears the previous slot.
    pub fn backspace(&mut self, index: usize) {
        let Some(slot) = self.digits.get_mut(index) else {
            return;
        };
        if slot.is_some() {
            *slot = None;
            self.focus = index;
            return;
        }
        if index > 0 {
            self.focus = index - 1;
            if let Some(prev) = self.digits.get_mut(index - 1) {
                *prev = None;
            }
        }
    }

    /// Spread pasted text across the slots.
    ///
    /// Non-digits are stripped and only the first six digits are used. Text
    /// without any digit is ignored. Returns whether anything changed.
    pub fn paste(&mut self, text: &str) -> bool {
        let pasted: Vec<char> = text
            .chars()
            .filter(char::is_ascii_digit)
            .take(OTP_LENGTH)
            .collect();
        if pasted.is_empty() {
            return false;
        }

        self.digits = [None; OTP_LENGTH];
        for (slot, digit) in self.digits.iter_mut().zip(&pasted) {
            *slot = Some(*digit);
        }
        self.focus = pasted.len().min(OTP_LENGTH - 1);
        true
    }

    /// Empty every slot and focus the first.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Concatenation of the filled slots.
    #[must_use]
    pub fn value(&self) -> String {
        self.digits.iter().flatten().collect()
    }

    /// Whether all six slots hold a digit.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.digits.iter().all(Option::is_some)
    }

    /// The complete code, if every slot is filled.
    #[must_use]
    pub fn code(&self) -> Option<OtpCode> {
        if self.is_complete() {
            OtpCode::parse(&self.value()).ok()
        } else {
            None
        }
    }

    /// Slot contents for rendering (`""` for empty slots).
    #[must_use]
    pub fn slots(&self) -> Vec<String> {
        self.digits
            .iter()
            .map(|d| d.map(String::from).unwrap_or_default())
            .collect()
    }

    /// Index of the slot that should hold focus.
    #[must_use]
    pub const fn focus(&self) -> usize {
        self.focus
    }
}

// =============================================================================
// OtpFlow
// =============================================================================

/// Where the flow currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "message", rename_all = "snake_case")]
pub enum OtpPhase {
    /// A code was emailed and is awaiting entry.
    OtpSent,
    /// The code was submitted and the backend has not answered yet.
    Verifying,
    /// The backend accepted the code.
    Verified,
    /// The backend rejected the code; the user may retry on the same screen.
    Failed(String),
}

/// A login in progress for one email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpFlow {
    email: Email,
    phase: OtpPhase,
    resend_at: DateTime<Utc>,
    input: OtpInput,
}

impl OtpFlow {
    /// A code was just sent to `email`.
    #[must_use]
    pub fn start(email: Email, now: DateTime<Utc>) -> Self {
        Self {
            email,
            phase: OtpPhase::OtpSent,
            resend_at: now + Duration::seconds(RESEND_COOLDOWN_SECS),
            input: OtpInput::new(),
        }
    }

    /// The address the code was sent to.
    #[must_use]
    pub const fn email(&self) -> &Email {
        &self.email
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> &OtpPhase {
        &self.phase
    }

    /// The digit slots.
    #[must_use]
    pub const fn input(&self) -> &OtpInput {
        &self.input
    }

    /// Mutable access to the digit slots.
    pub const fn input_mut(&mut self) -> &mut OtpInput {
        &mut self.input
    }

    /// Error message from the last rejected attempt.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        match &self.phase {
            OtpPhase::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Whole seconds until resend unlocks (rounded up, zero once unlocked).
    #[must_use]
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> u32 {
        let millis = (self.resend_at - now).num_milliseconds();
        if millis <= 0 {
            return 0;
        }
        u32::try_from((millis + 999) / 1000).unwrap_or(u32::MAX)
    }

    /// Whether a new code may be requested right now.
    #[must_use]
    pub fn can_resend(&self, now: DateTime<Utc>) -> bool {
        matches!(self.phase, OtpPhase::OtpSent | OtpPhase::Failed(_))
            && self.seconds_remaining(now) == 0
    }

    /// Mark the submitted code as being verified.
    ///
    /// # Errors
    ///
    /// Fails while another verification is outstanding or after success.
    pub fn begin_verify(&mut self) -> Result<(), OtpError> {
        match self.phase {
            OtpPhase::OtpSent | OtpPhase::Failed(_) => {
                self.phase = OtpPhase::Verifying;
                Ok(())
            }
            OtpPhase::Verifying => Err(OtpError::VerificationInFlight),
            OtpPhase::Verified => Err(OtpError::AlreadyVerified),
        }
    }

    /// The backend accepted the code.
    pub fn succeed(&mut self) {
        self.phase = OtpPhase::Verified;
    }

    /// The backend rejected the code (or could not be reached).
    pub fn fail(&mut self, message: impl Into<String>) {
        self.phase = OtpPhase::Failed(message.into());
    }

    /// Request another code: restarts the countdown and clears the input.
    ///
    /// # Errors
    ///
    /// Fails while the countdown is running, during verification, or after
    /// success.
    pub fn resend(&mut self, now: DateTime<Utc>) -> Result<(), OtpError> {
        match self.phase {
            OtpPhase::Verifying => return Err(OtpError::VerificationInFlight),
            OtpPhase::Verified => return Err(OtpError::AlreadyVerified),
            OtpPhase::OtpSent | OtpPhase::Failed(_) => {}
        }
        let remaining = self.seconds_remaining(now);
        if remaining > 0 {
            return Err(OtpError::ResendTooEarly { remaining });
        }
        self.phase = OtpPhase::OtpSent;
        self.resend_at = now + Duration::seconds(RESEND_COOLDOWN_SECS);
        self.input.clear();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap()
    }

    fn flow() -> OtpFlow {
        OtpFlow::start(Email::parse("buyer@example.com").unwrap(), t0())
    }

    // -------------------------------------------------------------------------
    // OtpInput
    // -------------------------------------------------------------------------

    #[test]
    fn test_edit_accepts_digits_and_advances() {
        let mut input = OtpInput::new();
        assert!(input.edit(0, "4"));
        assert_eq!(input.focus(), 1);
        assert!(input.edit(1, "2"));
        assert_eq!(input.value(), "42");
    }

    #[test]
    fn test_edit_rejects_non_digits() {
        let mut input = OtpInput::new();
        input.edit(0, "1");
        assert!(!input.edit(1, "a"));
        assert!(!input.edit(1, "1a"));
        assert_eq!(input.value(), "1");
        assert_eq!(input.focus(), 1);
    }

    #[test]
    fn test_edit_keeps_last_character() {
        let mut input = OtpInput::new();
        input.edit(0, "1");
        assert!(input.edit(0, "19"));
        assert_eq!(input.slots()[0], "9");
    }

    #[test]
    fn test_edit_last_slot_keeps_focus() {
        let mut input = OtpInput::new();
        input.edit(5, "7");
        assert_eq!(input.focus(), 5);
    }

    #[test]
    fn test_empty_edit_clears_without_moving() {
        let mut input = OtpInput::new();
        input.edit(2, "3");
        assert!(input.edit(2, ""));
        assert_eq!(input.value(), "");
        assert_eq!(input.focus(), 3);
    }

    #[test]
    fn test_edit_out_of_range_is_ignored() {
        let mut input = OtpInput::new();
        assert!(!input.edit(6, "1"));
        assert_eq!(input, OtpInput::new());
    }

    #[test]
    fn test_backspace_clears_filled_slot() {
        let mut input = OtpInput::new();
        input.paste("123");
        input.backspace(2);
        assert_eq!(input.value(), "12");
        assert_eq!(input.focus(), 2);
    }

    #[test]
    fn test_backspace_on_empty_moves_back_and_clears() {
        let mut input = OtpInput::new();
        input.paste("12");
        input.backspace(2);
        assert_eq!(input.value(), "1");
        assert_eq!(input.focus(), 1);
    }

    #[test]
    fn test_backspace_on_first_empty_slot_is_noop() {
        let mut input = OtpInput::new();
        input.backspace(0);
        assert_eq!(input, OtpInput::new());
    }

    #[test]
    fn test_paste_fills_only_first_six() {
        let mut input = OtpInput::new();
        assert!(input.paste("12345678"));
        assert_eq!(input.value(), "123456");
        assert!(input.is_complete());
        assert_eq!(input.focus(), 5);
    }

    #[test]
    fn test_paste_strips_non_digits() {
        let mut input = OtpInput::new();
        assert!(input.paste("12-34 x"));
        assert_eq!(input.slots(), vec!["1", "2", "3", "4", "", ""]);
        assert_eq!(input.focus(), 4);
    }

    #[test]
    fn test_paste_replaces_existing_digits() {
        let mut input = OtpInput::new();
        input.paste("999999");
        input.paste("12");
        assert_eq!(input.value(), "12");
    }

    #[test]
    fn test_paste_without_digits_is_noop() {
        let mut input = OtpInput::new();
        input.edit(0, "5");
        assert!(!input.paste("abc"));
        assert_eq!(input.value(), "5");
    }

    #[test]
    fn test_code_requires_all_slots() {
        let mut input = OtpInput::new();
        input.paste("12345");
        assert!(input.code().is_none());
        input.edit(5, "6");
        assert_eq!(input.code().unwrap().as_str(), "123456");
    }

    // -------------------------------------------------------------------------
    // OtpCode
    // -------------------------------------------------------------------------

    #[test]
    fn test_code_serializes_as_number() {
        let code = OtpCode::parse("012345").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "12345");
        assert_eq!(code.as_number(), 12_345);
    }

    #[test]
    fn test_code_parse_rejects_bad_input() {
        assert_eq!(OtpCode::parse("12345"), Err(OtpError::InvalidCode));
        assert_eq!(OtpCode::parse("12345a"), Err(OtpError::InvalidCode));
        assert_eq!(OtpCode::parse("1234567"), Err(OtpError::InvalidCode));
    }

    // -------------------------------------------------------------------------
    // OtpFlow
    // -------------------------------------------------------------------------

    #[test]
    fn test_countdown_runs_thirty_seconds() {
        let flow = flow();
        assert_eq!(flow.seconds_remaining(t0()), 30);
        assert_eq!(flow.seconds_remaining(t0() + Duration::milliseconds(29_001)), 1);
        assert_eq!(flow.seconds_remaining(t0() + Duration::seconds(30)), 0);
        assert!(!flow.can_resend(t0() + Duration::seconds(29)));
        assert!(flow.can_resend(t0() + Duration::seconds(30)));
    }

    #[test]
    fn test_resend_before_zero_is_rejected() {
        let mut flow = flow();
        assert_eq!(
            flow.resend(t0() + Duration::seconds(10)),
            Err(OtpError::ResendTooEarly { remaining: 20 })
        );
    }

    #[test]
    fn test_resend_resets_timer_and_input() {
        let mut flow = flow();
        flow.input_mut().paste("123456");
        let later = t0() + Duration::seconds(31);

        flow.resend(later).unwrap();

        assert_eq!(flow.phase(), &OtpPhase::OtpSent);
        assert_eq!(flow.seconds_remaining(later), 30);
        assert_eq!(flow.input(), &OtpInput::new());
    }

    #[test]
    fn test_verify_success_path() {
        let mut flow = flow();
        flow.begin_verify().unwrap();
        assert_eq!(flow.phase(), &OtpPhase::Verifying);
        flow.succeed();
        assert_eq!(flow.phase(), &OtpPhase::Verified);
        assert_eq!(flow.begin_verify(), Err(OtpError::AlreadyVerified));
    }

    #[test]
    fn test_failed_verify_can_retry() {
        let mut flow = flow();
        flow.begin_verify().unwrap();
        flow.fail("Invalid OTP");
        assert_eq!(flow.last_error(), Some("Invalid OTP"));
        assert!(flow.begin_verify().is_ok());
    }

    #[test]
    fn test_single_outstanding_verification() {
        let mut flow = flow();
        flow.begin_verify().unwrap();
        assert_eq!(flow.begin_verify(), Err(OtpError::VerificationInFlight));
        assert_eq!(
            flow.resend(t0() + Duration::seconds(60)),
            Err(OtpError::VerificationInFlight)
        );
        assert!(!flow.can_resend(t0() + Duration::seconds(60)));
    }

    #[test]
    fn test_resend_allowed_after_failure() {
        let mut flow = flow();
        flow.begin_verify().unwrap();
        flow.fail("Invalid OTP");
        assert!(flow.resend(t0() + Duration::seconds(45)).is_ok());
        assert!(flow.last_error().is_none());
    }

    #[test]
    fn test_flow_survives_session_serialization() {
        let mut flow = flow();
        flow.input_mut().paste("42");
        flow.fail("Invalid OTP");
        let json = serde_json::to_string(&flow).unwrap();
        let restored: OtpFlow = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, flow);
    }
}
